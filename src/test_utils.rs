/// # Test Utilities Module
///
/// Fixtures shared by the unit tests:
/// - `ScriptedDriver`, an in-memory driver whose failures can be switched on
/// - `TempDatabase`, a SQLite file in a temporary directory
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use crate::config::DbConfig;
use crate::core::db::{Driver, Row, SqlValue};
use crate::core::error::{DriverError, DriverResult};

/// Pool configuration for the scripted driver with a short acquire timeout.
pub fn fake_config(pool_size: usize) -> DbConfig {
    DbConfig::new("scripted")
        .pool_size(pool_size)
        .acquire_timeout(Duration::from_millis(200))
}

#[derive(Debug)]
pub struct FakeConn {
    pub id: usize,
    pub auto_commit: bool,
    pub executed: Vec<String>,
}

/// Driver double that records calls and fails on demand.
#[derive(Debug)]
pub struct ScriptedDriver {
    opened: AtomicUsize,
    open_limit: AtomicUsize,
    resets: AtomicUsize,
    fail_execute: AtomicBool,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_reset: AtomicBool,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        ScriptedDriver {
            opened: AtomicUsize::new(0),
            open_limit: AtomicUsize::new(usize::MAX),
            resets: AtomicUsize::new(0),
            fail_execute: AtomicBool::new(false),
            fail_begin: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_rollback: AtomicBool::new(false),
            fail_reset: AtomicBool::new(false),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Lets `n` connections open successfully, then fails every later open.
    pub fn fail_open_after(&self, n: usize) {
        self.open_limit.store(n, Ordering::SeqCst);
    }

    pub fn fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }

    pub fn fail_begin(&self, fail: bool) {
        self.fail_begin.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.fail_rollback.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reset(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> DriverResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DriverError::Other(format!("scripted {} failure", what)))
        } else {
            Ok(())
        }
    }
}

impl Driver for ScriptedDriver {
    type Conn = FakeConn;

    fn open(&self, _config: &DbConfig) -> DriverResult<FakeConn> {
        let id = self.opened.fetch_add(1, Ordering::SeqCst);
        if id >= self.open_limit.load(Ordering::SeqCst) {
            return Err(DriverError::Other("scripted open failure".to_string()));
        }
        Ok(FakeConn {
            id,
            auto_commit: true,
            executed: Vec::new(),
        })
    }

    fn execute_update(
        &self,
        conn: &mut FakeConn,
        sql: &str,
        _params: &[SqlValue],
    ) -> DriverResult<usize> {
        Self::check(&self.fail_execute, "execute")?;
        conn.executed.push(sql.to_string());
        Ok(1)
    }

    /// Every query answers with the id of the connection that ran it.
    fn query(
        &self,
        conn: &mut FakeConn,
        sql: &str,
        _params: &[SqlValue],
    ) -> DriverResult<Vec<Row>> {
        Self::check(&self.fail_execute, "query")?;
        conn.executed.push(sql.to_string());
        Ok(vec![Row::new(
            vec!["conn_id".to_string()],
            vec![SqlValue::Integer(conn.id as i64)],
        )])
    }

    fn last_insert_id(&self, conn: &FakeConn) -> i64 {
        conn.executed.len() as i64
    }

    fn set_auto_commit(&self, conn: &mut FakeConn, enabled: bool) -> DriverResult<()> {
        if !enabled {
            Self::check(&self.fail_begin, "begin")?;
        }
        conn.auto_commit = enabled;
        Ok(())
    }

    fn commit(&self, conn: &mut FakeConn) -> DriverResult<()> {
        Self::check(&self.fail_commit, "commit")?;
        if conn.auto_commit {
            return Err(DriverError::Other("no transaction is active".to_string()));
        }
        Ok(())
    }

    fn rollback(&self, conn: &mut FakeConn) -> DriverResult<()> {
        Self::check(&self.fail_rollback, "rollback")?;
        if conn.auto_commit {
            return Err(DriverError::Other("no transaction is active".to_string()));
        }
        Ok(())
    }

    fn reset(&self, conn: &mut FakeConn) -> DriverResult<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reset, "reset")?;
        conn.auto_commit = true;
        Ok(())
    }
}

/// SQLite database file living in a temporary directory.
pub struct TempDatabase {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TempDatabase {
    /// Creates the database and runs `schema` against it.
    pub fn with_schema(schema: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("simpledb_test.db");
        let conn = Connection::open(&path).expect("open temp database");
        conn.execute_batch(schema).expect("apply schema");
        TempDatabase { _dir: dir, path }
    }

    pub fn articles() -> Self {
        Self::with_schema(
            "CREATE TABLE article (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT,
                is_blind INTEGER NOT NULL DEFAULT 0
            );",
        )
    }

    pub fn config(&self, pool_size: usize) -> DbConfig {
        DbConfig::new(self.path.to_string_lossy())
            .pool_size(pool_size)
            .acquire_timeout(Duration::from_millis(500))
    }

    /// Counts rows through a connection outside the pool.
    pub fn count(&self, table: &str) -> i64 {
        let conn = Connection::open(&self.path).expect("open temp database");
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .expect("count rows")
    }
}
