/// SQLite Driver Module
///
/// `Driver` implementation backed by `rusqlite`. Auto-commit follows the
/// JDBC model: turning it off opens a transaction, turning it back on
/// commits whatever is still open.
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::time::Duration;
use tracing::debug;

use super::driver::{Driver, Row, SqlValue};
use crate::config::DbConfig;
use crate::core::error::DriverResult;

/// How long a connection waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        SqliteDriver
    }
}

impl Driver for SqliteDriver {
    type Conn = Connection;

    fn open(&self, config: &DbConfig) -> DriverResult<Connection> {
        debug!(
            "Opening SQLite connection to {} (endpoint {} unused)",
            config.database, config.endpoint
        );
        let conn = Connection::open(&config.database)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        // In-memory databases report "memory" here; nothing to enforce.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);
        Ok(conn)
    }

    fn execute_update(
        &self,
        conn: &mut Connection,
        sql: &str,
        params: &[SqlValue],
    ) -> DriverResult<usize> {
        let mut stmt = conn.prepare(sql)?;
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        Ok(changed)
    }

    fn query(
        &self,
        conn: &mut Connection,
        sql: &str,
        params: &[SqlValue],
    ) -> DriverResult<Vec<Row>> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(SqlValue::from(row.get_ref(i)?));
            }
            result.push(Row::new(columns.clone(), values));
        }
        Ok(result)
    }

    fn last_insert_id(&self, conn: &Connection) -> i64 {
        conn.last_insert_rowid()
    }

    fn set_auto_commit(&self, conn: &mut Connection, enabled: bool) -> DriverResult<()> {
        match (enabled, conn.is_autocommit()) {
            (false, true) => conn.execute_batch("BEGIN")?,
            (true, false) => conn.execute_batch("COMMIT")?,
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, conn: &mut Connection) -> DriverResult<()> {
        conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self, conn: &mut Connection) -> DriverResult<()> {
        conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn reset(&self, conn: &mut Connection) -> DriverResult<()> {
        if !conn.is_autocommit() {
            debug!("Rolling back transaction left open on released connection");
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => ValueRef::Null,
            SqlValue::Integer(i) => ValueRef::Integer(*i),
            SqlValue::Real(f) => ValueRef::Real(*f),
            SqlValue::Text(s) => ValueRef::Text(s.as_bytes()),
            SqlValue::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}
