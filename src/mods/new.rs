use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppError, AppResult, error::FieldErrors, files::Disks, session};

use super::{NewWorkspace, StorageDriver, Visibility, WorkspaceChanges};

/// Body of both the create and the settings form.
#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceForm {
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    visibility: String,
    #[serde(default)]
    storage_driver: String,
}

impl WorkspaceForm {
    pub(crate) fn validate(self, disks: &Disks) -> AppResult<WorkspaceChanges> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            errors.add("name", "The name field is required.");
        } else if name.chars().count() > 255 {
            errors.add("name", "The name may not be greater than 255 characters.");
        }

        let visibility = Visibility::parse(&self.visibility);
        if visibility.is_none() {
            errors.add("visibility", "The selected visibility is invalid.");
        }

        let storage_driver = StorageDriver::parse(&self.storage_driver);
        match storage_driver {
            None => errors.add("storage_driver", "The selected storage driver is invalid."),
            Some(driver) if !disks.supports(driver) => {
                errors.add("storage_driver", "The selected storage driver is not configured.")
            }
            Some(_) => {}
        }

        errors.into_result()?;
        let (Some(visibility), Some(storage_driver)) = (visibility, storage_driver) else {
            return Err(AppError::field("visibility", "The selected visibility is invalid."));
        };

        Ok(WorkspaceChanges {
            name,
            description: self.description.filter(|description| !description.trim().is_empty()),
            visibility,
            storage_driver,
        })
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_mod(
    State(db_pool): State<SqlitePool>,
    State(disks): State<Disks>,
    session: Session,
    Json(form): Json<WorkspaceForm>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = session::require_user(&session, &db_pool, "/mods").await?;
    let form = form.validate(&disks)?;

    let workspace = super::create(&db_pool, NewWorkspace {
        name: form.name,
        description: form.description,
        owner_id: user.id,
        visibility: form.visibility,
        storage_driver: form.storage_driver,
    })
    .await?;

    tracing::info!("@{} created mod {}", user.username, workspace.slug);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Mod created successfully!", "mod": workspace })),
    ))
}
