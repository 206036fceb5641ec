use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{AppError, AppResult, access::Role};

pub const TOKEN_LEN: usize = 64;
pub const LIFETIME: Duration = Duration::days(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub mod_id: Uuid,
    pub user_id: Uuid,
    pub invited_by: Uuid,
    pub role: Role,
    #[serde(skip)]
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What accepting an invitation at a given instant amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Grant,
    AlreadyAccepted,
}

impl Invitation {
    pub fn new(mod_id: Uuid, user_id: Uuid, invited_by: Uuid, role: Role, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            mod_id,
            user_id,
            invited_by,
            role,
            token: generate_token(),
            expires_at: now + LIFETIME,
            accepted_at: None,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    pub fn status(&self, now: OffsetDateTime) -> InvitationStatus {
        if self.is_accepted() {
            InvitationStatus::Accepted
        } else if self.is_expired(now) {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }

    /// Accepted is terminal, so a repeat accept succeeds without doing anything.
    pub fn acceptance(&self, now: OffsetDateTime) -> AppResult<Acceptance> {
        match self.status(now) {
            InvitationStatus::Accepted => Ok(Acceptance::AlreadyAccepted),
            InvitationStatus::Expired => Err(AppError::Gone("This invitation has expired.".to_owned())),
            InvitationStatus::Pending => Ok(Acceptance::Grant),
        }
    }
}

pub fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LEN)
}

pub async fn find_by_token(db_pool: &SqlitePool, token: &str) -> AppResult<Option<Invitation>> {
    Ok(sqlx::query_as::<_, Invitation>("SELECT * FROM mod_invitations WHERE token=?")
        .bind(token)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn find_for(db_pool: &SqlitePool, mod_id: Uuid, user_id: Uuid) -> AppResult<Option<Invitation>> {
    Ok(sqlx::query_as::<_, Invitation>("SELECT * FROM mod_invitations WHERE mod_id=? AND user_id=?")
        .bind(mod_id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?)
}

/// Replaces any earlier invitation of the same user to the same workspace.
pub async fn insert(conn: &mut SqliteConnection, invitation: &Invitation) -> AppResult<()> {
    sqlx::query("DELETE FROM mod_invitations WHERE mod_id=? AND user_id=?")
        .bind(invitation.mod_id)
        .bind(invitation.user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO mod_invitations (id,mod_id,user_id,invited_by,role,token,expires_at,accepted_at,created_at) VALUES (?,?,?,?,?,?,?,?,?)")
        .bind(invitation.id)
        .bind(invitation.mod_id)
        .bind(invitation.user_id)
        .bind(invitation.invited_by)
        .bind(invitation.role)
        .bind(&invitation.token)
        .bind(invitation.expires_at)
        .bind(invitation.accepted_at)
        .bind(invitation.created_at)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn delete_for<'e>(executor: impl sqlx::SqliteExecutor<'e>, mod_id: Uuid, user_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM mod_invitations WHERE mod_id=? AND user_id=?")
        .bind(mod_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Grants (or refreshes) the membership and stamps the acceptance time.
pub async fn accept(db_pool: &SqlitePool, invitation: Invitation, now: OffsetDateTime) -> AppResult<(Acceptance, Invitation)> {
    let acceptance = invitation.acceptance(now)?;
    if acceptance == Acceptance::AlreadyAccepted {
        return Ok((acceptance, invitation));
    }

    let mut tx = db_pool.begin().await?;
    crate::collaborators::upsert_member(&mut tx, invitation.mod_id, invitation.user_id, invitation.role, Some(invitation.invited_by), now).await?;
    sqlx::query("UPDATE mod_invitations SET accepted_at=? WHERE id=?")
        .bind(now)
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((acceptance, Invitation { accepted_at: Some(now), ..invitation }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(now: OffsetDateTime) -> Invitation {
        Invitation::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Role::Editor, now)
    }

    #[test]
    fn tokens_are_long_and_random() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn expires_after_seven_days() {
        let now = OffsetDateTime::now_utc();
        let invite = invitation(now);
        assert_eq!(invite.status(now), InvitationStatus::Pending);
        assert_eq!(invite.status(now + Duration::days(7)), InvitationStatus::Pending);
        assert_eq!(invite.status(now + Duration::days(7) + Duration::seconds(1)), InvitationStatus::Expired);
    }

    #[test]
    fn expired_invitations_cannot_be_accepted() {
        let now = OffsetDateTime::now_utc();
        let invite = invitation(now - Duration::days(8));
        assert!(matches!(invite.acceptance(now), Err(AppError::Gone(_))));
    }

    #[test]
    fn accepted_is_terminal() {
        let now = OffsetDateTime::now_utc();
        let invite = Invitation {
            accepted_at: Some(now),
            ..invitation(now - Duration::days(30))
        };
        assert_eq!(invite.status(now), InvitationStatus::Accepted);
        assert_eq!(invite.acceptance(now).ok(), Some(Acceptance::AlreadyAccepted));
    }
}
