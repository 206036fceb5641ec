use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;
    migrate(&db_pool).await?;
    Ok(db_pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY,
        provider TEXT NOT NULL,
        provider_id TEXT NOT NULL,
        name TEXT NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL,
        avatar_url TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (provider, provider_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mods (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        owner_id BLOB NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        visibility TEXT NOT NULL DEFAULT 'private',
        storage_driver TEXT NOT NULL DEFAULT 'local',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS mods_owner_id ON mods (owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS mod_users (
        mod_id BLOB NOT NULL REFERENCES mods (id) ON DELETE CASCADE,
        user_id BLOB NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        invited_by BLOB REFERENCES users (id),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (mod_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mod_invitations (
        id BLOB PRIMARY KEY,
        mod_id BLOB NOT NULL REFERENCES mods (id) ON DELETE CASCADE,
        user_id BLOB NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        invited_by BLOB NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        token TEXT NOT NULL UNIQUE,
        expires_at TEXT NOT NULL,
        accepted_at TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (mod_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pages (
        id BLOB PRIMARY KEY,
        mod_id BLOB NOT NULL REFERENCES mods (id) ON DELETE CASCADE,
        parent_id BLOB REFERENCES pages (id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        order_index INTEGER NOT NULL DEFAULT 0,
        is_index BOOLEAN NOT NULL DEFAULT FALSE,
        published BOOLEAN NOT NULL DEFAULT TRUE,
        created_by BLOB NOT NULL REFERENCES users (id),
        updated_by BLOB REFERENCES users (id),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        UNIQUE (mod_id, slug)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS pages_parent_id ON pages (parent_id)",
    r#"
    CREATE TABLE IF NOT EXISTS files (
        id BLOB PRIMARY KEY,
        mod_id BLOB NOT NULL REFERENCES mods (id) ON DELETE CASCADE,
        page_id BLOB REFERENCES pages (id) ON DELETE SET NULL,
        original_name TEXT NOT NULL,
        filename TEXT NOT NULL,
        path TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        storage_driver TEXT NOT NULL,
        url TEXT,
        uploaded_by BLOB NOT NULL REFERENCES users (id),
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS files_mod_id ON files (mod_id)",
    "CREATE INDEX IF NOT EXISTS files_page_id ON files (page_id)",
];

pub async fn migrate(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    Ok(())
}
