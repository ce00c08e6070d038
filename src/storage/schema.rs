use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::categories::seed_categories;
use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the trend store. Cheap to clone (shares the pool).
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database lock, `DatabaseError::Migration` if the schema cannot be
    /// brought up to date, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Create the file owner-only before SQLite does, so it never exists
        // with umask permissions.
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() && db_path.parent().is_some_and(|p| p.exists()) {
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // SQLite reports any real problem at connect time.
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(DatabaseError::from_migration)?;
        tracing::debug!(path = %path, "Database ready");
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// Every statement is idempotent (`IF NOT EXISTS`), so re-running on an
    /// existing database only refreshes the category registry.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                keywords TEXT NOT NULL DEFAULT '[]',
                relevance_score INTEGER NOT NULL
                    CHECK (relevance_score BETWEEN 0 AND 99),
                search_volume TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                source TEXT NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trends_category ON trends(category)")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trends_relevance ON trends(relevance_score)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trends_created_at ON trends(created_at)")
            .execute(&mut *tx)
            .await?;

        // Covers the recent-by-category read: WHERE category = ? ORDER BY created_at DESC
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trends_category_created ON trends(category, created_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // created_at is set once at insert
        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS trends_created_at_immutable
            BEFORE UPDATE OF created_at ON trends
            WHEN new.created_at IS NOT old.created_at
            BEGIN
                SELECT RAISE(ABORT, 'trends.created_at is immutable');
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // A bookmark names either a stored trend or a client key, never both.
        // No FK: the stored trend may be gone by the time it is exported.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS saved_trends (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                trend_id INTEGER,
                client_key TEXT,
                saved_at INTEGER NOT NULL,
                notes TEXT,
                CHECK ((trend_id IS NULL) <> (client_key IS NULL))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_saved_trends_user ON saved_trends(user_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_saved_trends_trend ON saved_trends(trend_id)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_saved_trends_client_key ON saved_trends(client_key)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                description TEXT NOT NULL,
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                provider_id INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        seed_categories(&mut tx).await?;

        tx.commit().await?;

        Ok(())
    }
}
