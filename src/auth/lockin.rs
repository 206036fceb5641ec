use axum::{debug_handler, extract::{Path, Query, State}, response::{IntoResponse, Redirect}};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState, GetField,
    session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID},
    users::{self, ProviderProfile},
};

use super::{Clients, clients::ClientProvider, safe_return_url};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

const USER_AGENT: &str = concat!("moddocs/", env!("CARGO_PKG_VERSION"));

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state")?;
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match")?;
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier")?;
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(USER_AGENT)
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let profile = fetch_profile(&http_client, provider, access_token).await?;
    let user = users::upsert(&db_pool, profile).await?;

    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;
    let return_url = session.remove::<String>(RETURN_URL).await?;

    tracing::info!("welcome @{}", user.username);

    let return_url = return_url
        .as_deref()
        .and_then(safe_return_url)
        .unwrap_or("/mods");
    Ok(Redirect::to(return_url))
}

async fn fetch_profile(http_client: &reqwest::Client, provider: ClientProvider, access_token: &str) -> AppResult<ProviderProfile> {
    let body: Value = http_client
        .get(provider.userinfo_url())
        .bearer_auth(access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    match provider {
        ClientProvider::Google => profile_from_google(&body),
        ClientProvider::Github => {
            let email = match body.get("email").and_then(Value::as_str) {
                Some(email) if !email.is_empty() => email.to_owned(),
                _ => {
                    let emails: Value = http_client
                        .get("https://api.github.com/user/emails")
                        .bearer_auth(access_token)
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                    primary_github_email(&emails).ok_or("github account has no verified e-mail")?
                }
            };
            profile_from_github(&body, email)
        }
    }
}

fn profile_from_google(body: &Value) -> AppResult<ProviderProfile> {
    let email = body.get_str_field("email")?;
    Ok(ProviderProfile {
        provider: ClientProvider::Google.id().to_owned(),
        provider_id: body.get_str_field("id")?,
        name: body.get_str_field("name").unwrap_or_else(|_| email.clone()),
        login: None,
        avatar_url: body.get("picture").and_then(Value::as_str).map(str::to_owned),
        email,
    })
}

fn profile_from_github(body: &Value, email: String) -> AppResult<ProviderProfile> {
    let id = body
        .get_obj_field("id")?
        .as_i64()
        .ok_or(format!("expected numeric id in {body}"))?;
    let login = body.get_str_field("login")?;
    Ok(ProviderProfile {
        provider: ClientProvider::Github.id().to_owned(),
        provider_id: id.to_string(),
        name: body
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(login.as_str())
            .to_owned(),
        login: Some(login.clone()),
        avatar_url: body.get("avatar_url").and_then(Value::as_str).map(str::to_owned),
        email,
    })
}

fn primary_github_email(emails: &Value) -> Option<String> {
    let emails = emails.as_array()?;
    let verified = |entry: &&Value| entry.get("verified").and_then(Value::as_bool).unwrap_or(false);
    emails
        .iter()
        .filter(verified)
        .find(|entry| entry.get("primary").and_then(Value::as_bool).unwrap_or(false))
        .or_else(|| emails.iter().find(verified))
        .and_then(|entry| entry.get("email")?.as_str().map(str::to_owned))
}
