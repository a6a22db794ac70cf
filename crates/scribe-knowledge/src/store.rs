//! SQLite-backed vector store.
//!
//! The connection is opened lazily on first use and reused for the life of
//! the store. Concurrent first callers wait on the same initialization.
//! Every access goes through one connection mutex, and no await point is
//! crossed while it is held, so an abandoned future never leaves a
//! half-committed batch behind.
//!
//! Layout: one row per record, embedding stored as little-endian `f32` bytes
//! next to its declared dimension, metadata as a JSON object.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::VectorStore;
use scribe_core::types::{Metadata, Record};
use tokio::sync::OnceCell;

/// Durable vector store over a single SQLite database.
pub struct SqliteVectorStore {
    /// `None` keeps the database in memory.
    path: Option<PathBuf>,
    conn: OnceCell<Mutex<Connection>>,
}

impl SqliteVectorStore {
    /// Store backed by the file at `path`. Nothing is opened until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: OnceCell::new(),
        }
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: OnceCell::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the underlying connection has been opened yet.
    pub fn is_initialized(&self) -> bool {
        self.conn.initialized()
    }

    async fn handle(&self) -> Result<&Mutex<Connection>> {
        self.conn
            .get_or_try_init(|| async { self.open().map(Mutex::new) })
            .await
    }

    fn open(&self) -> Result<Connection> {
        let conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ScribeError::StoreUnavailable(format!(
                            "cannot create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
                let conn = Connection::open(path).map_err(store_err)?;
                // WAL keeps readers unblocked during a write batch
                conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
                conn
            }
            None => Connection::open_in_memory().map_err(store_err)?,
        };
        migrate(&conn)?;

        match &self.path {
            Some(path) => tracing::info!("🗄️ Vector store opened at {}", path.display()),
            None => tracing::debug!("🗄️ In-memory vector store opened"),
        }
        Ok(conn)
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        let handle = self.handle().await?;
        handle
            .lock()
            .map_err(|e| ScribeError::StoreUnavailable(format!("Lock: {e}")))
    }
}

fn store_err(e: rusqlite::Error) -> ScribeError {
    ScribeError::StoreUnavailable(e.to_string())
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS vectors (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dimension INTEGER NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_vectors_created_at ON vectors(created_at);",
    )
    .map_err(|e| ScribeError::StoreUnavailable(format!("Migration: {e}")))
}

fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
    conn.query_row("SELECT dimension FROM vectors LIMIT 1", [], |row| row.get::<_, i64>(0))
        .optional()
        .map(|d| d.map(|d| d as usize))
        .map_err(store_err)
}

/// Reject the whole call if any record breaks the store contract.
pub(crate) fn validate_records(records: &[Record], existing: Option<usize>) -> Result<usize> {
    let expected = existing
        .or_else(|| records.first().map(Record::dimension))
        .unwrap_or_default();
    for record in records {
        if record.text.trim().is_empty() {
            return Err(ScribeError::InvalidRecord {
                id: record.id.clone(),
                reason: "text is empty".into(),
            });
        }
        if record.embedding.is_empty() {
            return Err(ScribeError::InvalidRecord {
                id: record.id.clone(),
                reason: "embedding is empty".into(),
            });
        }
        if record.dimension() != expected {
            return Err(ScribeError::DimensionMismatch {
                expected,
                actual: record.dimension(),
            });
        }
    }
    Ok(expected)
}

/// Stored RFC 3339 timestamp; an unparsable value keeps the row and falls
/// back to now.
fn parse_created_at(id: &str, raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(d) => d.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!("⚠️ '{id}': bad created_at '{raw}' ({e}), using now");
            Utc::now()
        }
    }
}

/// Little-endian `f32` bytes.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; embedding.len() * 4];
    LittleEndian::write_f32_into(embedding, &mut bytes);
    bytes
}

/// Inverse of [`encode_embedding`]; `None` if the blob does not hold exactly
/// `dimension` floats.
pub fn decode_embedding(bytes: &[u8], dimension: usize) -> Option<Vec<f32>> {
    if bytes.len() != dimension * 4 {
        return None;
    }
    let mut embedding = vec![0f32; dimension];
    LittleEndian::read_f32_into(bytes, &mut embedding);
    Some(embedding)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock().await?;
        let dimension = validate_records(&records, stored_dimension(&conn)?)?;

        let tx = conn.transaction().map_err(store_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO vectors (id, text, embedding, dimension, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(store_err)?;
            for record in &records {
                stmt.execute(params![
                    record.id,
                    record.text,
                    encode_embedding(&record.embedding),
                    dimension as i64,
                    serde_json::Value::Object(record.metadata.clone()).to_string(),
                    record.created_at.to_rfc3339(),
                ])
                .map_err(store_err)?;
            }
        }
        tx.commit().map_err(store_err)?;

        tracing::debug!("💾 Upserted {} records (dim {dimension})", records.len());
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Record>> {
        let conn = self.lock().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, text, embedding, dimension, metadata, created_at
                 FROM vectors ORDER BY rowid",
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(store_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, text, blob, dimension, metadata, created_at) = match row {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping unreadable vector row: {e}");
                    continue;
                }
            };
            let Some(embedding) = decode_embedding(&blob, dimension.max(0) as usize) else {
                tracing::warn!(
                    "⚠️ Skipping '{id}': {} byte embedding does not match dimension {dimension}",
                    blob.len()
                );
                continue;
            };
            let metadata: Metadata = match serde_json::from_str(&metadata) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping '{id}': bad metadata: {e}");
                    continue;
                }
            };
            let created_at = parse_created_at(&id, &created_at);
            records.push(Record {
                id,
                text,
                embedding,
                metadata,
                created_at,
            });
        }
        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock().await?;
        conn.query_row("SELECT COUNT(*) FROM vectors", [], |r| r.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(store_err)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock().await?;
        let removed = conn.execute("DELETE FROM vectors", []).map_err(store_err)?;
        tracing::info!("🗑️ Cleared {removed} records from vector store");
        Ok(())
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        let conn = self.lock().await?;
        stored_dimension(&conn)
    }
}
