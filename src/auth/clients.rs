use std::{fmt, path::Path};

use anyhow::Context;
use oauth2::{AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl, basic::BasicClient};
use serde::Deserialize;
use serde_json::Value;

use crate::{AppError, AppResult, GetField};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    /// Stored in `users.provider`.
    pub fn id(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn auth_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://accounts.google.com/o/oauth2/auth",
            Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://oauth2.googleapis.com/token",
            Github => "https://github.com/login/oauth/access_token",
        }
    }

    pub fn scopes(&self) -> Vec<Scope> {
        use ClientProvider::*;
        let scopes: &[&str] = match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        };
        scopes.iter().map(|scope| Scope::new((*scope).to_owned())).collect()
    }

    pub fn userinfo_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            Github => "https://api.github.com/user",
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Default)]
pub struct Clients {
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    /// Reads `{"google": {client_id, client_secret}, "github": {...}}`; either key may be absent.
    pub fn from_json(json: &Value, app_url: &str) -> AppResult<Clients> {
        let client = |provider: ClientProvider| -> AppResult<Option<HappyClient>> {
            let Some(json) = json.get(provider.id()) else {
                return Ok(None);
            };
            let client_id = ClientId::new(json.get_str_field("client_id")?);
            let client_secret = ClientSecret::new(json.get_str_field("client_secret")?);

            let auth_url = AuthUrl::new(provider.auth_url().to_owned()).map_err(anyhow::Error::from)?;
            let token_url = TokenUrl::new(provider.token_url().to_owned()).map_err(anyhow::Error::from)?;
            let redirect_url = RedirectUrl::new(format!("{app_url}/lockin/{}", provider.id()))
                .map_err(anyhow::Error::from)?;

            Ok(Some(
                BasicClient::new(client_id)
                    .set_client_secret(client_secret)
                    .set_auth_uri(auth_url)
                    .set_token_uri(token_url)
                    .set_redirect_uri(redirect_url),
            ))
        };

        Ok(Clients {
            google_client: client(ClientProvider::Google)?,
            github_client: client(ClientProvider::Github)?,
        })
    }

    /// A missing file means no provider is configured; sign-in then fails per provider.
    pub fn load(path: &Path, app_url: &str) -> anyhow::Result<Clients> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, OAuth sign-in is disabled", path.display());
                return Ok(Clients::default());
            }
            Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
        };
        let json: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Clients::from_json(&json, app_url).map_err(|err| anyhow::anyhow!("{err}: {}", path.display()))
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }
        .ok_or_else(|| AppError::Unavailable(format!("OAuth provider {provider} keys not supplied")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn configured_providers_only() {
        let json = json!({ "github": { "client_id": "id", "client_secret": "secret" } });
        let clients = Clients::from_json(&json, "http://localhost:8080").unwrap();
        assert!(clients.get_client(ClientProvider::Github).is_ok());
        assert!(clients.get_client(ClientProvider::Google).is_err());
    }

    #[test]
    fn incomplete_keys_are_an_error() {
        let json = json!({ "google": { "client_id": "id" } });
        assert!(Clients::from_json(&json, "http://localhost:8080").is_err());
    }

    #[test]
    fn missing_file_disables_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let clients = Clients::load(&dir.path().join("nope.json"), "http://localhost:8080").unwrap();
        assert!(clients.get_client(ClientProvider::Google).is_err());
    }
}
