use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Base URL objects are publicly reachable under; defaults to `{endpoint}/{bucket}`.
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub app_url: String,
    pub storage_root: PathBuf,
    pub max_upload_bytes: u64,
    pub session_ttl_minutes: i64,
    pub oauth_clients_path: PathBuf,
    pub smtp: Option<SmtpConfig>,
    pub s3: Option<S3Config>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:moddocs.db?mode=rwc".to_owned(),
            bind_addr: "0.0.0.0:8080".to_owned(),
            app_url: "http://localhost:8080".to_owned(),
            storage_root: PathBuf::from("storage"),
            max_upload_bytes: 10240 * 1024,
            session_ttl_minutes: 120,
            oauth_clients_path: PathBuf::from("client_secret.json"),
            smtp: None,
            s3: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, fallback: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(fallback),
    }
}

impl Config {
    /// Reads the process environment (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parsed("SMTP_PORT", 587)?,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: var("MAIL_FROM").unwrap_or_else(|| "moddocs <noreply@localhost>".to_owned()),
            }),
            None => None,
        };

        let s3 = match var("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                endpoint: var("S3_ENDPOINT"),
                region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_owned()),
                bucket,
                access_key: var("S3_ACCESS_KEY"),
                secret_key: var("S3_SECRET_KEY"),
                public_url: var("S3_PUBLIC_URL"),
            }),
            None => None,
        };

        let max_upload_kb: u64 = parsed("MAX_UPLOAD_KB", defaults.max_upload_bytes / 1024)?;

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            app_url: var("APP_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.app_url),
            storage_root: var("STORAGE_ROOT").map(PathBuf::from).unwrap_or(defaults.storage_root),
            max_upload_bytes: max_upload_kb * 1024,
            session_ttl_minutes: parsed("SESSION_TTL_MINUTES", defaults.session_ttl_minutes)?,
            oauth_clients_path: var("OAUTH_CLIENTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.oauth_clients_path),
            smtp,
            s3,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.app_url, path)
    }
}
