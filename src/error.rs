use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("sign-in required")]
    Unauthenticated { return_url: Option<String> },
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("{0}")]
    Gone(String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

/// Field-level validation messages, serialized as `{field: [messages]}`.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated { return_url } => {
                let target = match return_url {
                    Some(url) => format!("/login?return_url={}", urlencoding::encode(&url)),
                    None => "/login".to_owned(),
                };
                Redirect::to(&target).into_response()
            }
            AppError::Forbidden => error_body(StatusCode::FORBIDDEN, "This action is unauthorized."),
            AppError::NotFound(what) => {
                tracing::debug!("{what} not found");
                error_body(StatusCode::NOT_FOUND, &format!("{what} not found"))
            }
            AppError::Validation(errors) => {
                let message = errors
                    .0
                    .values()
                    .flatten()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| "The given data was invalid.".to_owned());
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": message, "errors": errors })),
                )
                    .into_response()
            }
            AppError::Gone(message) => error_body(StatusCode::GONE, &message),
            AppError::Unavailable(message) => {
                tracing::warn!("{message}");
                error_body(StatusCode::SERVICE_UNAVAILABLE, &message)
            }
            AppError::Internal(err) => {
                tracing::error!("{err:#}\n{}", err.backtrace());
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": message, "status": status.as_u16() })),
    )
        .into_response()
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Internal(anyhow::Error::msg(err.to_owned()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("record"),
            err => Self::Internal(anyhow::Error::from(err)),
        }
    }
}

/// A body that is not valid multipart is the uploader's fault.
impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::field("file", err.body_text())
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(std::io::Error);

impl<E: core::error::Error + Send + Sync + 'static, R: oauth2::ErrorResponse + Send + Sync + 'static> From<oauth2::RequestTokenError<E, R>> for AppError {
    fn from(err: oauth2::RequestTokenError<E, R>) -> Self {
        Self::Internal(anyhow::Error::from(err))
    }
}
