/// Driver Module
///
/// The boundary between the connection manager and the database transport.
/// Everything the pool and sessions do to a connection goes through the
/// `Driver` trait, so the manager itself never depends on a specific backend.
use serde::Serialize;

use crate::config::DbConfig;
use crate::core::error::DriverResult;

/// A value bound to a statement parameter or read back from a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) => Some(*v as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// SQLite and MySQL store booleans as integers; any non-zero is true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Integer(v) => Some(*v != 0),
            SqlValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v.into())
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(v.into())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Blob(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One row of a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Row { columns, values }
    }

    /// Looks a value up by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_index(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    /// Converts the row into a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .cloned()
            .zip(self.values.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// A database transport.
///
/// Implementations own connection establishment, statement preparation,
/// parameter binding and execution, and transaction control on a single
/// connection. Every method may fail with a driver-level error, which the
/// session layer wraps into its own taxonomy.
pub trait Driver: Send + Sync + 'static {
    /// Live session handle to the database.
    type Conn: Send + 'static;

    /// Opens a new connection using the endpoint, credentials and database
    /// name from `config`.
    fn open(&self, config: &DbConfig) -> DriverResult<Self::Conn>;

    /// Prepares `sql`, binds `params` positionally and executes it,
    /// returning the number of affected rows.
    fn execute_update(
        &self,
        conn: &mut Self::Conn,
        sql: &str,
        params: &[SqlValue],
    ) -> DriverResult<usize>;

    /// Prepares `sql`, binds `params` positionally and collects every row.
    fn query(&self, conn: &mut Self::Conn, sql: &str, params: &[SqlValue])
        -> DriverResult<Vec<Row>>;

    /// Row id generated by the most recent successful insert on `conn`.
    fn last_insert_id(&self, conn: &Self::Conn) -> i64;

    fn set_auto_commit(&self, conn: &mut Self::Conn, enabled: bool) -> DriverResult<()>;

    fn commit(&self, conn: &mut Self::Conn) -> DriverResult<()>;

    fn rollback(&self, conn: &mut Self::Conn) -> DriverResult<()>;

    /// Brings a connection back to a clean auto-commit state before it is
    /// returned to the pool.
    fn reset(&self, _conn: &mut Self::Conn) -> DriverResult<()> {
        Ok(())
    }
}
