mod add;
mod list;
mod remove;
mod role;

use axum::{Router, routing::{get, delete}};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppResult, AppState, access::Role, users::UserSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{slug}/collaborators", get(list::collaborators).post(add::add_collaborator))
        .route("/{slug}/collaborators/{user_id}", delete(remove::remove_collaborator).patch(role::update_role))
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    #[serde(flatten)]
    pub user: UserSummary,
    pub role: Role,
    pub invited_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    role: Role,
    invited_by: Option<Uuid>,
    created_at: OffsetDateTime,
}

pub async fn members(db_pool: &SqlitePool, mod_id: Uuid) -> AppResult<Vec<Member>> {
    let rows: Vec<MemberRow> =
        sqlx::query_as("SELECT user_id,role,invited_by,created_at FROM mod_users WHERE mod_id=? ORDER BY created_at")
            .bind(mod_id)
            .fetch_all(db_pool)
            .await?;

    let mut members = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(user) = crate::users::find(db_pool, row.user_id).await? else {
            continue;
        };
        members.push(Member {
            user: UserSummary::from(&user),
            role: row.role,
            invited_by: row.invited_by,
            joined_at: row.created_at,
        });
    }
    Ok(members)
}

/// Inserts the membership, or refreshes its role when it already exists.
pub(crate) async fn upsert_member(
    conn: &mut SqliteConnection,
    mod_id: Uuid,
    user_id: Uuid,
    role: Role,
    invited_by: Option<Uuid>,
    now: OffsetDateTime,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO mod_users (mod_id,user_id,role,invited_by,created_at,updated_at) VALUES (?,?,?,?,?,?) \
         ON CONFLICT (mod_id,user_id) DO UPDATE SET role=excluded.role, updated_at=excluded.updated_at",
    )
    .bind(mod_id)
    .bind(user_id)
    .bind(role)
    .bind(invited_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
