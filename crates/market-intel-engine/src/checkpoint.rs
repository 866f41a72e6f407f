//! Checkpoint persistence: an in-memory store for tests and a sqlite-backed
//! store for real deployments, both implementing `CheckpointStore`. Grounded
//! in the teacher's `confidence-calibrator::history::CalibrationHistoryStore`
//! query shape (`INSERT ... RETURNING`, `?`-bound parameters, a small
//! internal row type with string-encoded timestamps), generalized from a
//! flat prediction table to one `(thread_id, node)`-keyed checkpoint row per
//! graph state snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use market_intel_core::{CheckpointRecord, CheckpointStore, EngineError, GraphState};
use sqlx::{FromRow, SqlitePool};

const SCHEMA_VERSION: u32 = 1;

/// Test-and-demo checkpoint store: keeps every checkpoint for a thread in
/// insertion order, in memory, for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    records: DashMap<String, Vec<CheckpointRecord>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, thread_id: &str, node: &str, state: &GraphState) -> Result<(), EngineError> {
        let record = CheckpointRecord {
            thread_id: thread_id.to_string(),
            node: node.to_string(),
            timestamp: Utc::now(),
            schema_version: SCHEMA_VERSION,
            state: state.clone(),
        };
        self.records.entry(thread_id.to_string()).or_default().push(record);
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<CheckpointRecord>, EngineError> {
        Ok(self.records.get(thread_id).and_then(|v| v.last().cloned()))
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>, EngineError> {
        Ok(self.records.get(thread_id).map(|v| v.clone()).unwrap_or_default())
    }
}

#[derive(Debug, FromRow)]
struct CheckpointRow {
    thread_id: String,
    node: String,
    timestamp: String,
    schema_version: i64,
    state_json: String,
}

impl CheckpointRow {
    fn into_record(self) -> Result<CheckpointRecord, EngineError> {
        let state: GraphState = serde_json::from_str(&self.state_json)
            .map_err(|e| EngineError::CheckpointError(e.to_string()))?;
        let timestamp: DateTime<Utc> = self
            .timestamp
            .parse()
            .map_err(|_| EngineError::CheckpointError("checkpoint timestamp is not valid RFC3339".to_string()))?;
        Ok(CheckpointRecord {
            thread_id: self.thread_id,
            node: self.node,
            timestamp,
            schema_version: self.schema_version as u32,
            state,
        })
    }
}

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| EngineError::CheckpointError(e.to_string()))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                node TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                state_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::CheckpointError(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_checkpoints_thread_id ON checkpoints (thread_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::CheckpointError(e.to_string()))?;

        Ok(())
    }

    pub fn arc(self) -> Arc<dyn CheckpointStore> {
        Arc::new(self)
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn put(&self, thread_id: &str, node: &str, state: &GraphState) -> Result<(), EngineError> {
        let state_json = serde_json::to_string(state).map_err(|e| EngineError::CheckpointError(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, node, timestamp, schema_version, state_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(thread_id)
        .bind(node)
        .bind(Utc::now().to_rfc3339())
        .bind(SCHEMA_VERSION as i64)
        .bind(state_json)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::CheckpointError(e.to_string()))?;

        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<CheckpointRecord>, EngineError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            r#"
            SELECT thread_id, node, timestamp, schema_version, state_json
            FROM checkpoints
            WHERE thread_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::CheckpointError(e.to_string()))?;

        row.map(CheckpointRow::into_record).transpose()
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>, EngineError> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(
            r#"
            SELECT thread_id, node, timestamp, schema_version, state_json
            FROM checkpoints
            WHERE thread_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::CheckpointError(e.to_string()))?;

        rows.into_iter().map(CheckpointRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_intel_core::GraphState;

    #[tokio::test]
    async fn in_memory_store_returns_latest_of_several_puts() {
        let store = InMemoryCheckpointStore::new();
        store.put("t1", "ingestion", &GraphState::new("c1")).await.unwrap();
        store.put("t1", "agent_selection", &GraphState::new("c1")).await.unwrap();

        let latest = store.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.node, "agent_selection");
        assert_eq!(store.history("t1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn in_memory_store_unknown_thread_is_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.latest("nope").await.unwrap().is_none());
    }
}
