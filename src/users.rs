use std::collections::HashSet;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppResult, slug};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip)]
    pub provider: String,
    #[serde(skip)]
    pub provider_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn avatar(&self) -> String {
        match &self.avatar_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!(
                "https://ui-avatars.com/api/?name={}&background=random",
                urlencoding::encode(&self.name)
            ),
        }
    }
}

/// Compact user reference embedded in other payloads.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            avatar: user.avatar(),
        }
    }
}

/// Profile reported by an identity provider after sign-in.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    pub login: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<User>> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?)
}

/// Looks a user up by username or e-mail.
pub async fn find_by_login(db_pool: &SqlitePool, login: &str) -> AppResult<Option<User>> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE username=? OR email=? LIMIT 1")
        .bind(login)
        .bind(login)
        .fetch_optional(db_pool)
        .await?)
}

async fn unique_username(db_pool: &SqlitePool, base: &str) -> AppResult<String> {
    let taken: Vec<(String,)> =
        sqlx::query_as(r"SELECT username FROM users WHERE username=? OR username LIKE ? ESCAPE '\'")
            .bind(base)
            .bind(slug::suffix_pattern(base))
            .fetch_all(db_pool)
            .await?;
    let taken: HashSet<String> = taken.into_iter().map(|(username,)| username).collect();
    Ok(slug::unique(base, &taken))
}

/// Creates the user on first sign-in, refreshes name/e-mail/avatar afterwards.
pub async fn upsert(db_pool: &SqlitePool, profile: ProviderProfile) -> AppResult<User> {
    let existing: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE provider=? AND provider_id=?")
            .bind(&profile.provider)
            .bind(&profile.provider_id)
            .fetch_optional(db_pool)
            .await?;

    if let Some(user) = existing {
        sqlx::query("UPDATE users SET name=?, email=?, avatar_url=? WHERE id=?")
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.avatar_url)
            .bind(user.id)
            .execute(db_pool)
            .await?;
        return Ok(User {
            name: profile.name,
            email: profile.email,
            avatar_url: profile.avatar_url,
            ..user
        });
    }

    let seed = profile
        .login
        .clone()
        .or_else(|| profile.email.split('@').next().map(str::to_owned))
        .unwrap_or_default();
    let username = unique_username(db_pool, &slug::slugify(&seed, "user")).await?;

    let user = User {
        id: Uuid::now_v7(),
        provider: profile.provider,
        provider_id: profile.provider_id,
        name: profile.name,
        username,
        email: profile.email,
        avatar_url: profile.avatar_url,
        created_at: OffsetDateTime::now_utc(),
    };

    tracing::info!("adding @{} ({})", user.username, user.provider);
    sqlx::query("INSERT INTO users (id,provider,provider_id,name,username,email,avatar_url,created_at) VALUES (?,?,?,?,?,?,?,?)")
        .bind(user.id)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .execute(db_pool)
        .await?;

    Ok(user)
}
