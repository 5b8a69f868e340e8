//! Helpers shared by the integration tests.
#![allow(dead_code)]

use rusqlite::Connection;
use simpledb::core::error::DriverResult;
use simpledb::{DbConfig, Driver, DriverError, Row, SqlValue};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Driver whose connections are plain numbered handles.
#[derive(Debug, Default)]
pub struct TrackingDriver {
    next_id: AtomicUsize,
    pub fail_statements: AtomicBool,
}

#[derive(Debug)]
pub struct TrackedConn {
    pub id: usize,
    pub auto_commit: bool,
}

impl Driver for TrackingDriver {
    type Conn = TrackedConn;

    fn open(&self, _config: &DbConfig) -> DriverResult<TrackedConn> {
        Ok(TrackedConn {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            auto_commit: true,
        })
    }

    fn execute_update(
        &self,
        _conn: &mut TrackedConn,
        _sql: &str,
        _params: &[SqlValue],
    ) -> DriverResult<usize> {
        if self.fail_statements.load(Ordering::SeqCst) {
            return Err(DriverError::Other("statement rejected".to_string()));
        }
        Ok(1)
    }

    fn query(
        &self,
        conn: &mut TrackedConn,
        _sql: &str,
        _params: &[SqlValue],
    ) -> DriverResult<Vec<Row>> {
        Ok(vec![Row::new(
            vec!["conn_id".to_string()],
            vec![SqlValue::Integer(conn.id as i64)],
        )])
    }

    fn last_insert_id(&self, _conn: &TrackedConn) -> i64 {
        0
    }

    fn set_auto_commit(&self, conn: &mut TrackedConn, enabled: bool) -> DriverResult<()> {
        conn.auto_commit = enabled;
        Ok(())
    }

    fn commit(&self, conn: &mut TrackedConn) -> DriverResult<()> {
        if conn.auto_commit {
            return Err(DriverError::Other("no transaction is active".to_string()));
        }
        Ok(())
    }

    fn rollback(&self, conn: &mut TrackedConn) -> DriverResult<()> {
        if conn.auto_commit {
            return Err(DriverError::Other("no transaction is active".to_string()));
        }
        Ok(())
    }

    fn reset(&self, conn: &mut TrackedConn) -> DriverResult<()> {
        conn.auto_commit = true;
        Ok(())
    }
}

pub fn tracking_config(pool_size: usize, timeout: Duration) -> DbConfig {
    DbConfig::new("tracking").pool_size(pool_size).acquire_timeout(timeout)
}

/// SQLite file with an `article` table in a temporary directory.
pub struct ArticleDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ArticleDb {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("articles.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE article (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    body TEXT,
                    is_blind INTEGER NOT NULL DEFAULT 0
                );",
            )
            .unwrap();
        ArticleDb { _dir: dir, path }
    }

    pub fn config(&self, pool_size: usize) -> DbConfig {
        DbConfig::new(self.path.to_string_lossy()).pool_size(pool_size)
    }

    pub fn count(&self) -> i64 {
        Connection::open(&self.path)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM article", [], |row| row.get(0))
            .unwrap()
    }
}
