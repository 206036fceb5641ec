use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult, slug};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Unlisted,
}

impl Visibility {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "unlisted" => Some(Self::Unlisted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StorageDriver {
    Local,
    S3,
}

impl StorageDriver {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "local" => Some(Self::Local),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

/// A documentation space ("mod").
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub visibility: Visibility,
    pub storage_driver: StorageDriver,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    pub deleted_at: Option<OffsetDateTime>,
}

pub struct NewWorkspace {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub visibility: Visibility,
    pub storage_driver: StorageDriver,
}

pub struct WorkspaceChanges {
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub storage_driver: StorageDriver,
}

pub async fn find_by_slug(db_pool: &SqlitePool, slug: &str) -> AppResult<Option<Workspace>> {
    Ok(sqlx::query_as::<_, Workspace>("SELECT * FROM mods WHERE slug=? AND deleted_at IS NULL")
        .bind(slug)
        .fetch_optional(db_pool)
        .await?)
}

/// Same as [`find_by_slug`], answering 404 for unknown or deleted workspaces.
pub async fn get_by_slug(db_pool: &SqlitePool, slug: &str) -> AppResult<Workspace> {
    find_by_slug(db_pool, slug).await?.ok_or(AppError::NotFound("mod"))
}

pub async fn find<'e>(executor: impl SqliteExecutor<'e>, id: Uuid) -> AppResult<Option<Workspace>> {
    Ok(sqlx::query_as::<_, Workspace>("SELECT * FROM mods WHERE id=? AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

/// Soft-deleted workspaces keep their slug reserved.
pub async fn unique_slug(db_pool: &SqlitePool, name: &str) -> AppResult<String> {
    let base = slug::slugify(name, "mod");
    let taken: Vec<(String,)> = sqlx::query_as(r"SELECT slug FROM mods WHERE slug=? OR slug LIKE ? ESCAPE '\'")
        .bind(&base)
        .bind(slug::suffix_pattern(&base))
        .fetch_all(db_pool)
        .await?;
    let taken: HashSet<String> = taken.into_iter().map(|(slug,)| slug).collect();
    Ok(slug::unique(&base, &taken))
}

pub async fn create(db_pool: &SqlitePool, new: NewWorkspace) -> AppResult<Workspace> {
    let now = OffsetDateTime::now_utc();
    let workspace = Workspace {
        id: Uuid::now_v7(),
        slug: unique_slug(db_pool, &new.name).await?,
        name: new.name,
        description: new.description,
        owner_id: new.owner_id,
        visibility: new.visibility,
        storage_driver: new.storage_driver,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query("INSERT INTO mods (id,name,slug,description,owner_id,visibility,storage_driver,created_at,updated_at) VALUES (?,?,?,?,?,?,?,?,?)")
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.slug)
        .bind(&workspace.description)
        .bind(workspace.owner_id)
        .bind(workspace.visibility)
        .bind(workspace.storage_driver)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(db_pool)
        .await?;

    Ok(workspace)
}

/// Applies settings changes. The slug stays what it was.
pub async fn update(db_pool: &SqlitePool, workspace: Workspace, changes: WorkspaceChanges) -> AppResult<Workspace> {
    let updated = Workspace {
        name: changes.name,
        description: changes.description,
        visibility: changes.visibility,
        storage_driver: changes.storage_driver,
        updated_at: OffsetDateTime::now_utc(),
        ..workspace
    };

    sqlx::query("UPDATE mods SET name=?, description=?, visibility=?, storage_driver=?, updated_at=? WHERE id=?")
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.visibility)
        .bind(updated.storage_driver)
        .bind(updated.updated_at)
        .bind(updated.id)
        .execute(db_pool)
        .await?;

    Ok(updated)
}

pub async fn soft_delete(db_pool: &SqlitePool, id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE mods SET deleted_at=? WHERE id=?")
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn page_count(db_pool: &SqlitePool, id: Uuid) -> AppResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages WHERE mod_id=? AND deleted_at IS NULL")
        .bind(id)
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn collaborator_count(db_pool: &SqlitePool, id: Uuid) -> AppResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mod_users WHERE mod_id=?")
        .bind(id)
        .fetch_one(db_pool)
        .await?;
    Ok(count)
}

pub async fn owned_by(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Workspace>> {
    Ok(sqlx::query_as::<_, Workspace>("SELECT * FROM mods WHERE owner_id=? AND deleted_at IS NULL ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(db_pool)
        .await?)
}

pub async fn collaborating(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Workspace>> {
    Ok(sqlx::query_as::<_, Workspace>(
        "SELECT mods.* FROM mods JOIN mod_users ON mod_users.mod_id = mods.id \
         WHERE mod_users.user_id=? AND mods.deleted_at IS NULL ORDER BY mods.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?)
}
