//! SQLite session store.
//!
//! One table holds every turn:
//!
//! ```sql
//! turns(session_id TEXT, seq INTEGER, role TEXT, content TEXT, created_at TEXT)
//! ```
//!
//! `seq` numbers turns within a session from 0. Each insert computes the next
//! `seq` inside the same statement, and an exchange's two inserts share one
//! transaction, so concurrent writers never interleave half an exchange.

use async_trait::async_trait;
use chrono::Utc;
use edupolicy_core::error::StoreError;
use edupolicy_core::session::{SessionStore, Turn, TurnRole};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const INSERT_TURN: &str = r#"
    INSERT INTO turns (session_id, seq, role, content, created_at)
    SELECT ?1, COALESCE(MAX(seq), -1) + 1, ?2, ?3, ?4
    FROM turns WHERE session_id = ?1
"#;

/// A durable SQLite conversation store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at a `sqlite:` URL or plain file path.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite session store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                session_id  TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (session_id, seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns table: {e}")))?;

        debug!("SQLite session migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, StoreError> {
        let role: String = row
            .try_get("role")
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        Ok(Turn {
            role: TurnRole::from_str(&role)?,
            content,
        })
    }

    async fn insert_turn<'e, E>(executor: E, session_id: &str, turn: &Turn) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(INSERT_TURN)
            .bind(session_id)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(Utc::now().to_rfc3339())
            .execute(executor)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("insert turn: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query("SELECT role, content FROM turns WHERE session_id = ? ORDER BY seq")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    async fn append(&self, session_id: &str, turn: Turn) -> Result<(), StoreError> {
        Self::insert_turn(&self.pool, session_id, &turn).await
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin transaction: {e}")))?;

        Self::insert_turn(&mut *tx, session_id, &user).await?;
        Self::insert_turn(&mut *tx, session_id, &assistant).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit exchange: {e}")))?;
        Ok(())
    }

    async fn reset(&self, session_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM turns WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("reset: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn session_ids(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT session_id FROM turns ORDER BY session_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("session ids: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("session_id")
                    .map_err(|e| StoreError::QueryFailed(format!("session_id column: {e}")))
            })
            .collect()
    }
}
