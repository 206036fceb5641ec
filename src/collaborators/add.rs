use std::sync::Arc;

use axum::{Json, debug_handler, extract::{Path, State}};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    AppError, AppResult, Config,
    access::{self, Access, Permission, Role},
    error::FieldErrors,
    invitations::{self, Invitation},
    mail::{InvitationMail, Mailer},
    mods, session, users,
};

#[derive(Debug, Deserialize)]
pub(crate) struct AddCollaboratorForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    role: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn add_collaborator(
    Path(slug): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Arc<dyn Mailer>>,
    session: Session,
    Json(form): Json<AddCollaboratorForm>,
) -> AppResult<Json<Value>> {
    let user = session::require_user(&session, &db_pool, &format!("/mods/{slug}/collaborators")).await?;
    let workspace = mods::get_by_slug(&db_pool, &slug).await?;
    let access = Access::resolve(&db_pool, &workspace, Some(&user)).await?;
    access.ensure(Permission::ManageCollaborators)?;

    let mut errors = FieldErrors::default();
    let login = form.username.trim();
    if login.is_empty() {
        errors.add("username", "The username field is required.");
    }
    let role = access::parse_member_role(&form.role);
    if role.is_none() {
        errors.add("role", "The selected role is invalid.");
    }
    errors.into_result()?;
    let Some(role) = role else {
        return Err(AppError::field("role", "The selected role is invalid."));
    };

    if role == Role::Admin && access.role != Some(Role::Owner) {
        return Err(AppError::Forbidden);
    }

    let Some(collaborator) = users::find_by_login(&db_pool, login).await? else {
        return Err(AppError::field("username", "User not found."));
    };
    if collaborator.id == workspace.owner_id {
        return Err(AppError::field("username", "Owner cannot be added as collaborator."));
    }
    if access::membership_role(&db_pool, workspace.id, collaborator.id).await?.is_some() {
        return Err(AppError::field("username", "User is already a collaborator."));
    }

    let now = OffsetDateTime::now_utc();
    if let Some(existing) = invitations::find_for(&db_pool, workspace.id, collaborator.id).await? {
        if existing.status(now) == invitations::InvitationStatus::Pending {
            return Err(AppError::field("username", "User already has a pending invitation."));
        }
    }

    let invitation = Invitation::new(workspace.id, collaborator.id, user.id, role, now);
    let mut tx = db_pool.begin().await?;
    crate::collaborators::upsert_member(&mut tx, workspace.id, collaborator.id, role, Some(user.id), now).await?;
    invitations::insert(&mut tx, &invitation).await?;
    tx.commit().await?;

    tracing::info!("@{} added @{} to {} as {role}", user.username, collaborator.username, workspace.slug);

    let mail = InvitationMail {
        to_name: collaborator.name.clone(),
        to_email: collaborator.email.clone(),
        inviter_name: user.name.clone(),
        mod_name: workspace.name.clone(),
        role: role.to_string(),
        invite_url: config.url(&format!("/invitations/{}", invitation.token)),
    };

    let (message, mailed) = match mailer.send_invitation(&mail).await {
        Ok(()) => (format!("Invitation sent to {}!", collaborator.name), true),
        Err(err) => {
            tracing::warn!("invitation mail to {} failed: {err:#}", collaborator.email);
            ("Collaborator added successfully! (Email notification failed to send)".to_owned(), false)
        }
    };

    Ok(Json(json!({
        "message": message,
        "email_sent": mailed,
        "collaborator": users::UserSummary::from(&collaborator),
        "role": role,
        "invitation": invitation,
    })))
}
