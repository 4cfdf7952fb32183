use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::NewEntrant;

/// Fixed key for the per-device "already submitted" flag.
pub const SUBMISSION_MARKER_FLAG: &str = "entry_submitted";

/// Durable per-device state: the submission marker and the pending-entry
/// queue (an append-only outbox with per-record sync status).
///
/// A single process and single terminal are assumed; concurrent writers
/// are last-write-wins on the flag table.
#[derive(Clone)]
pub struct DeviceStore {
    pool: Pool<Sqlite>,
}

/// A queued entry that has not been confirmed persisted remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub queue_id: i64,
    pub entry: NewEntrant,
    pub queued_at: DateTime<Utc>,
}

/// A queued entry the reconciler gave up on, with the recorded reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub queue_id: i64,
    pub email: String,
    pub sync_error: String,
}

impl DeviceStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS device_flags (
                name       TEXT PRIMARY KEY,
                value      INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure device_flags table exists")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_entries (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                email      TEXT NOT NULL,
                phone      TEXT NOT NULL,
                company    TEXT NOT NULL,
                created_at TEXT NOT NULL,
                queued_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                synced_at  TEXT,
                sync_error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure pending_entries table exists")?;

        Ok(())
    }

    /// True once this device has recorded a submission. The application
    /// never clears the flag; only external/manual intervention does.
    pub async fn submission_marker(&self) -> Result<bool> {
        let row = sqlx::query("SELECT value FROM device_flags WHERE name = ?")
            .bind(SUBMISSION_MARKER_FLAG)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0) != 0).unwrap_or(false))
    }

    /// Sets the submission marker. Callers must only do this after the
    /// entry is durably recorded (remote-confirmed or locally queued).
    pub async fn set_submission_marker(&self) -> Result<()> {
        sqlx::query(
            "INSERT INTO device_flags (name, value, updated_at) VALUES (?, 1, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET value = 1, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(SUBMISSION_MARKER_FLAG)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends an entry to the queue and sets the submission marker in a
    /// single transaction: the entry is either fully queued and marked, or
    /// not recorded at all.
    pub async fn enqueue_entry_and_mark_submitted(&self, entry: &NewEntrant) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            "INSERT INTO pending_entries (name, email, phone, company, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&entry.name)
        .bind(&entry.email)
        .bind(&entry.phone)
        .bind(&entry.company)
        .bind(entry.created_at)
        .fetch_one(&mut *tx)
        .await?;
        let queue_id = rec.get::<i64, _>(0);

        sqlx::query(
            "INSERT INTO device_flags (name, value, updated_at) VALUES (?, 1, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET value = 1, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(SUBMISSION_MARKER_FLAG)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(queue_id)
    }

    /// Queued entries still awaiting a successful remote insert, oldest
    /// first. Records with a recorded sync failure are excluded; they stay
    /// in the table for inspection but are never retried.
    pub async fn pending_entries(&self) -> Result<Vec<PendingEntry>> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone, company, created_at, queued_at
             FROM pending_entries
             WHERE synced_at IS NULL AND sync_error IS NULL
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PendingEntry {
                queue_id: r.get::<i64, _>(0),
                entry: NewEntrant {
                    name: r.get::<String, _>(1),
                    email: r.get::<String, _>(2),
                    phone: r.get::<String, _>(3),
                    company: r.get::<String, _>(4),
                    created_at: r.get::<DateTime<Utc>, _>(5),
                },
                queued_at: r.get::<DateTime<Utc>, _>(6),
            })
            .collect())
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_entries WHERE synced_at IS NULL AND sync_error IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn mark_synced(&self, queue_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE pending_entries SET synced_at = CURRENT_TIMESTAMP, sync_error = NULL
             WHERE id = ?",
        )
        .bind(queue_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_sync_failed(&self, queue_id: i64, reason: &str) -> Result<()> {
        sqlx::query("UPDATE pending_entries SET sync_error = ? WHERE id = ? AND synced_at IS NULL")
            .bind(reason)
            .bind(queue_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Entries the reconciler permanently gave up on (e.g. duplicate email).
    pub async fn failed_entries(&self) -> Result<Vec<FailedEntry>> {
        let rows = sqlx::query(
            "SELECT id, email, sync_error FROM pending_entries
             WHERE sync_error IS NOT NULL
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| FailedEntry {
                queue_id: r.get::<i64, _>(0),
                email: r.get::<String, _>(1),
                sync_error: r.get::<String, _>(2),
            })
            .collect())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
