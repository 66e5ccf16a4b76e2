use crate::journal::error::{JournalError, JournalResult};
use crate::journal::types::{JournalEntry, JournalStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

/// SQLite-backed record of failed sessions, used to resume across runs
pub struct UploadJournal {
    pool: SqlitePool,
}

impl UploadJournal {
    /// Open (or create) the journal database at `path`
    pub async fn open(path: &Path) -> JournalResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::init(pool).await
    }

    /// Journal with in-memory database (for testing)
    pub async fn new_in_memory() -> JournalResult<Self> {
        // Every connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> JournalResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uploads (
                session_id TEXT PRIMARY KEY,
                source_path TEXT NOT NULL,
                server_dir TEXT NOT NULL,
                staging_token TEXT NOT NULL,
                chunk_size INTEGER NOT NULL,
                times TEXT NOT NULL,
                remaining TEXT,
                last_stage TEXT,
                last_error TEXT,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_uploads_updated ON uploads(updated_at)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Save or replace the entry for a failed session
    pub async fn record_failure(&self, entry: &JournalEntry) -> JournalResult<()> {
        let created_at = match self.load(&entry.session_id).await? {
            Some(existing) => existing.created_at,
            None => entry.created_at,
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO uploads
            (session_id, source_path, server_dir, staging_token, chunk_size, times,
             remaining, last_stage, last_error, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.session_id)
        .bind(entry.source_path.to_string_lossy().into_owned())
        .bind(&entry.server_dir)
        .bind(&entry.staging_token)
        .bind(entry.chunk_size as i64)
        .bind(serde_json::to_string(&entry.times)?)
        .bind(entry.remaining.as_ref().map(serde_json::to_string).transpose()?)
        .bind(entry.last_stage.as_ref().map(serde_json::to_string).transpose()?)
        .bind(entry.last_error.clone())
        .bind(serde_json::to_string(&entry.status)?)
        .bind(created_at)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a journaled session as done; nothing is left to resume
    pub async fn mark_completed(&self, session_id: &str) -> JournalResult<()> {
        let result = sqlx::query(
            "UPDATE uploads SET status = ?, remaining = NULL, last_error = NULL, updated_at = ? WHERE session_id = ?",
        )
        .bind(serde_json::to_string(&JournalStatus::Completed)?)
        .bind(chrono::Utc::now().timestamp())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(JournalError::NotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Load entry by session ID
    pub async fn load(&self, session_id: &str) -> JournalResult<Option<JournalEntry>> {
        let row = sqlx::query("SELECT * FROM uploads WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    /// All entries, most recently updated first
    pub async fn list(&self) -> JournalResult<Vec<JournalEntry>> {
        let rows = sqlx::query("SELECT * FROM uploads ORDER BY updated_at DESC, session_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn delete(&self, session_id: &str) -> JournalResult<bool> {
        let result = sqlx::query("DELETE FROM uploads WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Close database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn entry_from_row(row: &SqliteRow) -> JournalResult<JournalEntry> {
    let remaining: Option<String> = row.try_get("remaining")?;
    let last_stage: Option<String> = row.try_get("last_stage")?;

    Ok(JournalEntry {
        session_id: row.try_get("session_id")?,
        source_path: PathBuf::from(row.try_get::<String, _>("source_path")?),
        server_dir: row.try_get("server_dir")?,
        staging_token: row.try_get("staging_token")?,
        chunk_size: row.try_get::<i64, _>("chunk_size")? as u64,
        times: serde_json::from_str(&row.try_get::<String, _>("times")?)?,
        remaining: remaining.as_deref().map(serde_json::from_str).transpose()?,
        last_stage: last_stage.as_deref().map(serde_json::from_str).transpose()?,
        last_error: row.try_get("last_error")?,
        status: serde_json::from_str(&row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
