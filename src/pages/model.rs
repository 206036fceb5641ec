use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult, slug};

use super::tree::PageIndex;

/// Page slugs that would collide with the static `/pages/...` routes.
pub const RESERVED_SLUGS: [&str; 2] = ["search", "reorder"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Page {
    pub id: Uuid,
    pub mod_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub order_index: i64,
    pub is_index: bool,
    pub published: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Page {
    /// First 200 characters of the markdown source.
    pub fn excerpt(&self) -> String {
        self.content.chars().take(200).collect()
    }
}

pub struct NewPage {
    pub mod_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub is_index: bool,
    pub published: bool,
    pub author: Uuid,
}

pub struct PageChanges {
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub is_index: bool,
    pub published: bool,
    pub editor: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderEntry {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub order_index: i64,
}

pub async fn all_in<'e>(executor: impl SqliteExecutor<'e>, mod_id: Uuid) -> AppResult<Vec<Page>> {
    Ok(sqlx::query_as::<_, Page>(
        "SELECT * FROM pages WHERE mod_id=? AND deleted_at IS NULL ORDER BY parent_id, order_index",
    )
    .bind(mod_id)
    .fetch_all(executor)
    .await?)
}

pub async fn find_by_slug(db_pool: &SqlitePool, mod_id: Uuid, slug: &str) -> AppResult<Option<Page>> {
    Ok(sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE mod_id=? AND slug=? AND deleted_at IS NULL")
        .bind(mod_id)
        .bind(slug)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn get_by_slug(db_pool: &SqlitePool, mod_id: Uuid, slug: &str) -> AppResult<Page> {
    find_by_slug(db_pool, mod_id, slug).await?.ok_or(AppError::NotFound("page"))
}

pub async fn find<'e>(executor: impl SqliteExecutor<'e>, id: Uuid) -> AppResult<Option<Page>> {
    Ok(sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id=? AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

/// Resolves `parent_id` to a page of `mod_id`, answering 422 for anything else.
pub async fn ensure_parent<'e>(executor: impl SqliteExecutor<'e>, mod_id: Uuid, parent_id: Uuid) -> AppResult<Page> {
    match find(executor, parent_id).await? {
        Some(parent) if parent.mod_id == mod_id => Ok(parent),
        _ => Err(AppError::field("parent_id", "Parent page must belong to the same mod.")),
    }
}

/// Slugs are unique per workspace, counting soft-deleted pages (the unique index does).
async fn unique_slug(conn: &mut SqliteConnection, mod_id: Uuid, title: &str, except: Option<Uuid>) -> AppResult<String> {
    let base = slug::slugify(title, "page");
    let taken: Vec<(String,)> = sqlx::query_as(
        r"SELECT slug FROM pages WHERE mod_id=? AND id IS NOT ? AND (slug=? OR slug LIKE ? ESCAPE '\')",
    )
    .bind(mod_id)
    .bind(except)
    .bind(&base)
    .bind(slug::suffix_pattern(&base))
    .fetch_all(&mut *conn)
    .await?;
    let taken: HashSet<String> = taken
        .into_iter()
        .map(|(slug,)| slug)
        .chain(RESERVED_SLUGS.iter().map(|reserved| (*reserved).to_owned()))
        .collect();
    Ok(slug::unique(&base, &taken))
}

async fn clear_index(conn: &mut SqliteConnection, mod_id: Uuid, except: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE pages SET is_index=FALSE WHERE mod_id=? AND id<>? AND is_index")
        .bind(mod_id)
        .bind(except)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn create(db_pool: &SqlitePool, new: NewPage) -> AppResult<Page> {
    let mut tx = db_pool.begin().await?;

    if let Some(parent_id) = new.parent_id {
        ensure_parent(&mut *tx, new.mod_id, parent_id).await?;
    }

    let now = OffsetDateTime::now_utc();
    let page = Page {
        id: Uuid::now_v7(),
        mod_id: new.mod_id,
        parent_id: new.parent_id,
        slug: unique_slug(&mut tx, new.mod_id, &new.title, None).await?,
        title: new.title,
        content: new.content,
        order_index: 0,
        is_index: new.is_index,
        published: new.published,
        created_by: new.author,
        updated_by: Some(new.author),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    if page.is_index {
        clear_index(&mut tx, page.mod_id, page.id).await?;
    }

    sqlx::query("INSERT INTO pages (id,mod_id,parent_id,title,slug,content,order_index,is_index,published,created_by,updated_by,created_at,updated_at) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)")
        .bind(page.id)
        .bind(page.mod_id)
        .bind(page.parent_id)
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.content)
        .bind(page.order_index)
        .bind(page.is_index)
        .bind(page.published)
        .bind(page.created_by)
        .bind(page.updated_by)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(page)
}

pub async fn update(db_pool: &SqlitePool, page: Page, changes: PageChanges) -> AppResult<Page> {
    let mut tx = db_pool.begin().await?;

    if let Some(parent_id) = changes.parent_id {
        ensure_parent(&mut *tx, page.mod_id, parent_id).await?;
        let siblings = all_in(&mut *tx, page.mod_id).await?;
        if PageIndex::new(&siblings).is_self_or_descendant(page.id, parent_id) {
            return Err(AppError::field("parent_id", "Invalid parent page."));
        }
    }

    let slug = if page.slug.is_empty() {
        unique_slug(&mut tx, page.mod_id, &changes.title, Some(page.id)).await?
    } else {
        page.slug.clone()
    };

    let updated = Page {
        parent_id: changes.parent_id,
        title: changes.title,
        slug,
        content: changes.content,
        is_index: changes.is_index,
        published: changes.published,
        updated_by: Some(changes.editor),
        updated_at: OffsetDateTime::now_utc(),
        ..page
    };

    if updated.is_index {
        clear_index(&mut tx, updated.mod_id, updated.id).await?;
    }

    sqlx::query("UPDATE pages SET parent_id=?, title=?, slug=?, content=?, is_index=?, published=?, updated_by=?, updated_at=? WHERE id=?")
        .bind(updated.parent_id)
        .bind(&updated.title)
        .bind(&updated.slug)
        .bind(&updated.content)
        .bind(updated.is_index)
        .bind(updated.published)
        .bind(updated.updated_by)
        .bind(updated.updated_at)
        .bind(updated.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(updated)
}

pub async fn save_content(db_pool: &SqlitePool, page_id: Uuid, content: &str, editor: Uuid) -> AppResult<OffsetDateTime> {
    let now = OffsetDateTime::now_utc();
    sqlx::query("UPDATE pages SET content=?, updated_by=?, updated_at=? WHERE id=?")
        .bind(content)
        .bind(editor)
        .bind(now)
        .bind(page_id)
        .execute(db_pool)
        .await?;
    Ok(now)
}

/// Soft-deletes `page` with everything below it and detaches their files.
pub async fn delete_subtree(db_pool: &SqlitePool, page: &Page) -> AppResult<usize> {
    let mut tx = db_pool.begin().await?;
    let pages = all_in(&mut *tx, page.mod_id).await?;
    let doomed = PageIndex::new(&pages).subtree(page.id);
    let now = OffsetDateTime::now_utc();

    for id in &doomed {
        sqlx::query("UPDATE pages SET deleted_at=?, is_index=FALSE WHERE id=?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE files SET page_id=NULL WHERE page_id=?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(doomed.len())
}

/// Applies a drag-and-drop reorder. Entries naming pages of other workspaces are skipped;
/// an entry whose parent is foreign, itself, or one of its descendants rejects the batch.
pub async fn reorder(db_pool: &SqlitePool, mod_id: Uuid, entries: &[OrderEntry], editor: Uuid) -> AppResult<usize> {
    let mut tx = db_pool.begin().await?;
    let mut pages = all_in(&mut *tx, mod_id).await?;

    let mut applicable = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(position) = pages.iter().position(|page| page.id == entry.id) else {
            tracing::debug!("reorder skips page {} outside mod {mod_id}", entry.id);
            continue;
        };
        if let Some(parent_id) = entry.parent_id {
            if !pages.iter().any(|page| page.id == parent_id) {
                return Err(AppError::field("pages", "Parent page must belong to the same mod."));
            }
        }
        applicable.push((position, entry));
    }

    // Validate against the tree as it will look once every move is applied.
    for (position, entry) in &applicable {
        pages[*position].parent_id = entry.parent_id;
    }
    let index = PageIndex::new(&pages);
    for (_, entry) in &applicable {
        if let Some(parent_id) = entry.parent_id {
            if index.is_self_or_descendant(entry.id, parent_id) {
                return Err(AppError::field("pages", "A page cannot be moved beneath itself."));
            }
        }
    }

    let now = OffsetDateTime::now_utc();
    for (_, entry) in &applicable {
        sqlx::query("UPDATE pages SET parent_id=?, order_index=?, updated_by=?, updated_at=? WHERE id=? AND mod_id=?")
            .bind(entry.parent_id)
            .bind(entry.order_index)
            .bind(editor)
            .bind(now)
            .bind(entry.id)
            .bind(mod_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(applicable.len())
}

/// Published pages whose title or content contains `query`, at most 20.
pub async fn search(db_pool: &SqlitePool, mod_id: Uuid, query: &str) -> AppResult<Vec<Page>> {
    let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let pattern = format!("%{}%", escaped.to_lowercase());
    Ok(sqlx::query_as::<_, Page>(
        r"SELECT * FROM pages WHERE mod_id=? AND published AND deleted_at IS NULL
          AND (lower(title) LIKE ? ESCAPE '\' OR lower(content) LIKE ? ESCAPE '\')
          ORDER BY updated_at DESC LIMIT 20",
    )
    .bind(mod_id)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(db_pool)
    .await?)
}
