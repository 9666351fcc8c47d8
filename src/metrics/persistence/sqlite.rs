use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::KvStore;
use crate::error::MonitorResult;
use crate::utils::current_time_ms;

pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         ",
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metrics_kv (
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Single-file KV backend for running the monitor without writing to Redis.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn open(path: &Path) -> MonitorResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create metrics data directory at {:?}: {}", parent, e);
            }
        }
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        tracing::info!("Metrics SQLite store opened at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> MonitorResult<Option<Bytes>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT value FROM metrics_kv WHERE key = ?1")?;
        let value: Option<Vec<u8>> = stmt
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> MonitorResult<()> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO metrics_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )?;
        stmt.execute(params![key, value.as_ref(), current_time_ms() as i64])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overwrites_and_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("metrics.db");

        {
            let kv = SqliteKv::open(&path).unwrap();
            assert!(kv.get("a").await.unwrap().is_none());
            kv.set("a", Bytes::from("v1")).await.unwrap();
            kv.set("a", Bytes::from("v2")).await.unwrap();
        }

        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get("a").await.unwrap(), Some(Bytes::from("v2")));
    }
}
