//! SQLite-backed idempotency ledger.
//!
//! Every inbound request id that has been answered (or deliberately ignored) is stored
//! once in `processed_requests`. The table only grows.

use finder_core::{CoreError, DatabaseError, RequestLedger};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};


const CREATE_PROCESSED_REQUESTS: &str =
    "CREATE TABLE IF NOT EXISTS processed_requests (id TEXT PRIMARY KEY NOT NULL)";

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the ledger file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // A single connection serializes every ledger access.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("{}: {}", path.display(), e),
            })?;

        info!("Opened request ledger at {}", path.display());
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(CREATE_PROCESSED_REQUESTS)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: format!("processed_requests: {}", e),
            })?;
        Ok(())
    }

    /// Number of requests recorded so far.
    pub async fn count(&self) -> Result<i64, CoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM processed_requests")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.try_get::<i64, _>("total").map_err(DatabaseError::from)?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RequestLedger for Database {
    async fn has_processed(&self, request_id: &str) -> Result<bool, CoreError> {
        let row = sqlx::query("SELECT id FROM processed_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sql_error)?;
        Ok(row.is_some())
    }

    async fn mark_processed(&self, request_id: &str) -> Result<(), CoreError> {
        sqlx::query("INSERT INTO processed_requests (id) VALUES (?)")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(map_sql_error)?;
        debug!("Recorded request {} as processed", request_id);
        Ok(())
    }
}

fn map_sql_error(error: sqlx::Error) -> DatabaseError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            return DatabaseError::ConstraintViolation {
                constraint: "processed_requests.id".to_string(),
            };
        }
        // SQLITE_BUSY / SQLITE_LOCKED
        if matches!(db_error.code().as_deref(), Some("5") | Some("6")) {
            return DatabaseError::DatabaseLocked;
        }
    }
    DatabaseError::Sql(error)
}
