/// Statement Builder Module
///
/// `Sql` composes a statement from text fragments and positional
/// parameters, then executes it on the session that created it. Execution
/// follows the same release policy as `Session::run`.
use super::driver::{Driver, Row, SqlValue};
use super::session::Session;
use super::sqlite::SqliteDriver;
use crate::core::error::{DriverError, DriverResult};
use crate::core::Result;

pub struct Sql<'s, D: Driver = SqliteDriver> {
    session: &'s mut Session<D>,
    fragments: Vec<String>,
    params: Vec<SqlValue>,
}

impl<'s, D: Driver> Sql<'s, D> {
    pub(crate) fn new(session: &'s mut Session<D>) -> Self {
        Sql {
            session,
            fragments: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Appends a fragment of statement text.
    pub fn append(mut self, fragment: &str) -> Self {
        self.push_fragment(fragment);
        self
    }

    /// Appends a fragment together with the values for its `?` placeholders.
    pub fn append_with<I, V>(mut self, fragment: &str, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.push_fragment(fragment);
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// Appends a fragment whose single `?` stands for a list, e.g.
    /// `"WHERE id IN (?)"`. The placeholder is expanded to one `?` per value;
    /// an empty list becomes `NULL` so the predicate matches nothing.
    pub fn append_in<I, V>(mut self, fragment: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        let placeholders = if values.is_empty() {
            "NULL".to_string()
        } else {
            vec!["?"; values.len()].join(", ")
        };
        self.push_fragment(&fragment.replacen('?', &placeholders, 1));
        self.params.extend(values);
        self
    }

    /// The composed statement text.
    pub fn sql(&self) -> String {
        self.fragments.join(" ")
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Executes the statement and returns the number of affected rows.
    pub fn execute(self) -> Result<usize> {
        self.run_with(|driver, conn, sql, params| driver.execute_update(conn, sql, params))
    }

    /// Executes an insert and returns the id of the inserted row.
    pub fn insert(self) -> Result<i64> {
        self.run_with(|driver, conn, sql, params| {
            driver.execute_update(conn, sql, params)?;
            Ok(driver.last_insert_id(conn))
        })
    }

    pub fn update(self) -> Result<usize> {
        self.execute()
    }

    pub fn delete(self) -> Result<usize> {
        self.execute()
    }

    pub fn select_rows(self) -> Result<Vec<Row>> {
        self.run_with(|driver, conn, sql, params| driver.query(conn, sql, params))
    }

    pub fn select_row(self) -> Result<Option<Row>> {
        Ok(self.select_rows()?.into_iter().next())
    }

    /// First column of the first row as an integer.
    pub fn select_long(self) -> Result<Option<i64>> {
        Ok(self.select_first()?.and_then(|v| v.as_i64()))
    }

    pub fn select_string(self) -> Result<Option<String>> {
        Ok(self.select_first()?.and_then(|v| match v {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s),
            SqlValue::Integer(i) => Some(i.to_string()),
            SqlValue::Real(f) => Some(f.to_string()),
            SqlValue::Blob(b) => Some(String::from_utf8_lossy(&b).to_string()),
        }))
    }

    pub fn select_bool(self) -> Result<Option<bool>> {
        Ok(self.select_first()?.and_then(|v| v.as_bool()))
    }

    fn select_first(self) -> Result<Option<SqlValue>> {
        Ok(self
            .select_rows()?
            .into_iter()
            .next()
            .and_then(|row| row.values.into_iter().next()))
    }

    fn push_fragment(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            self.fragments.push(fragment.to_string());
        }
    }

    fn run_with<T, F>(self, op: F) -> Result<T>
    where
        F: FnOnce(&D, &mut D::Conn, &str, &[SqlValue]) -> DriverResult<T>,
    {
        let sql = self.sql();
        let params = self.params;
        self.session.execute_with(&sql, &params, |driver, conn| {
            if sql.is_empty() {
                return Err(DriverError::Other("cannot execute an empty statement".to_string()));
            }
            op(driver, conn, &sql, &params)
        })
    }
}
