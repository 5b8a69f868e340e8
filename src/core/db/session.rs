/// Session Management Module
///
/// `SimpleDb` is the shared handle around a connection pool. Every calling
/// context works through its own `Session`, which holds at most one
/// connection at a time and carries the statement and transaction API.
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::driver::{Driver, SqlValue};
use super::pool::Pool;
use super::sql::Sql;
use super::sqlite::SqliteDriver;
use crate::config::DbConfig;
use crate::core::error::DriverResult;
use crate::core::{DbError, Result};

/// Identity of one calling context, used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        ContextId(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a session stands with respect to its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection held
    #[default]
    Unbound,
    /// Holding a connection in auto-commit mode
    AutoCommit,
    /// Holding a connection with a transaction open
    InTransaction,
}

/// Shared entry point: owns the pool and hands out sessions.
///
/// Cloning is cheap; clones share the same pool.
pub struct SimpleDb<D: Driver = SqliteDriver> {
    pool: Arc<Pool<D>>,
    config: Arc<DbConfig>,
}

impl SimpleDb<SqliteDriver> {
    /// Opens a pool of SQLite connections described by `config`.
    pub fn open(config: DbConfig) -> Result<Self> {
        Self::with_driver(SqliteDriver::new(), config)
    }
}

impl<D: Driver> SimpleDb<D> {
    pub fn with_driver(driver: D, config: DbConfig) -> Result<Self> {
        let pool = Pool::connect(driver, &config)?;
        if config.dev_mode {
            info!("Development mode on: statements will be logged");
        }
        Ok(SimpleDb {
            pool: Arc::new(pool),
            config: Arc::new(config),
        })
    }

    /// Starts a new, unbound session for the calling context.
    pub fn session(&self) -> Session<D> {
        Session {
            pool: Arc::clone(&self.pool),
            dev_mode: self.config.dev_mode,
            context: ContextId::new(),
            conn: None,
            in_transaction: false,
        }
    }

    pub fn pool(&self) -> &Pool<D> {
        &self.pool
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

impl<D: Driver> Clone for SimpleDb<D> {
    fn clone(&self) -> Self {
        SimpleDb {
            pool: Arc::clone(&self.pool),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Driver> fmt::Debug for SimpleDb<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleDb")
            .field("database", &self.config.database)
            .field("pool", &self.pool)
            .finish()
    }
}

/// One calling context's view of the pool.
///
/// A session lazily binds a connection on first use and keeps it until the
/// unit of work ends: right after a statement outside a transaction, or on
/// `commit`, `rollback` or `close_connection`. Dropping a session that still
/// holds a connection returns it to the pool.
pub struct Session<D: Driver = SqliteDriver> {
    pool: Arc<Pool<D>>,
    dev_mode: bool,
    context: ContextId,
    conn: Option<D::Conn>,
    in_transaction: bool,
}

impl<D: Driver> Session<D> {
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    pub fn state(&self) -> SessionState {
        match (&self.conn, self.in_transaction) {
            (None, _) => SessionState::Unbound,
            (Some(_), false) => SessionState::AutoCommit,
            (Some(_), true) => SessionState::InTransaction,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.conn.is_some()
    }

    /// Executes a statement with positional parameters and returns the
    /// number of affected rows.
    ///
    /// Outside a transaction the connection goes back to the pool when the
    /// statement finishes, whether or not it succeeded. Inside a transaction
    /// it stays bound until `commit` or `rollback`.
    ///
    /// # Errors
    ///
    /// `PoolExhausted` if no connection could be bound,
    /// `StatementExecutionFailed` if the driver rejected the statement.
    pub fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.execute_with(sql, params, |driver, conn| {
            driver.execute_update(conn, sql, params)
        })
    }

    /// Binds a connection and returns a statement builder that executes on
    /// it. The connection is not released until the built statement runs or
    /// the session is closed.
    pub fn gen_sql(&mut self) -> Result<Sql<'_, D>> {
        let conn = self.checkout()?;
        self.conn = Some(conn);
        Ok(Sql::new(self))
    }

    /// Turns auto-commit off on the bound connection, binding one first if
    /// needed.
    ///
    /// If the driver refuses, the connection stays bound and the session
    /// remains in auto-commit mode; call `close_connection` to give it back.
    pub fn start_transaction(&mut self) -> Result<()> {
        let mut conn = self.checkout()?;
        let result = self.pool.driver().set_auto_commit(&mut conn, false);
        self.conn = Some(conn);

        match result {
            Ok(()) => {
                self.in_transaction = true;
                debug!("Context {} started a transaction", self.context);
                Ok(())
            }
            Err(source) => {
                warn!(
                    "Context {} failed to start a transaction: {}",
                    self.context, source
                );
                Err(DbError::TransactionStartFailed { source })
            }
        }
    }

    /// Commits and releases the bound connection. The connection is released
    /// even when the commit fails.
    pub fn commit(&mut self) -> Result<()> {
        let mut conn = self.take_bound()?;
        let driver = self.pool.driver();
        let result = driver
            .commit(&mut conn)
            .and_then(|()| driver.set_auto_commit(&mut conn, true));
        self.release(conn);

        match result {
            Ok(()) => {
                debug!("Context {} committed", self.context);
                Ok(())
            }
            Err(source) => {
                warn!("Context {} failed to commit: {}", self.context, source);
                Err(DbError::CommitFailed { source })
            }
        }
    }

    /// Rolls back and releases the bound connection. The connection is
    /// released even when the rollback fails.
    pub fn rollback(&mut self) -> Result<()> {
        let mut conn = self.take_bound()?;
        let driver = self.pool.driver();
        let result = driver
            .rollback(&mut conn)
            .and_then(|()| driver.set_auto_commit(&mut conn, true));
        self.release(conn);

        match result {
            Ok(()) => {
                debug!("Context {} rolled back", self.context);
                Ok(())
            }
            Err(source) => {
                warn!("Context {} failed to roll back: {}", self.context, source);
                Err(DbError::RollbackFailed { source })
            }
        }
    }

    /// Releases the bound connection without committing or rolling back.
    pub fn close_connection(&mut self) -> Result<()> {
        let conn = self.take_bound()?;
        if self.in_transaction {
            warn!(
                "Context {} closed its connection with a transaction open",
                self.context
            );
        }
        self.release(conn);
        Ok(())
    }

    /// Runs `op` against the bound connection, then applies the statement
    /// release policy and wraps any driver failure.
    pub(crate) fn execute_with<T, F>(&mut self, sql: &str, params: &[SqlValue], op: F) -> Result<T>
    where
        F: FnOnce(&D, &mut D::Conn) -> DriverResult<T>,
    {
        let mut conn = self.checkout()?;
        if self.dev_mode {
            info!("[{}] {} {:?}", self.context, sql, params);
        } else {
            debug!("[{}] {}", self.context, sql);
        }

        let result = op(self.pool.driver(), &mut conn);

        if self.in_transaction {
            self.conn = Some(conn);
        } else {
            self.release(conn);
        }

        result.map_err(|source| DbError::StatementExecutionFailed {
            sql: sql.to_string(),
            source,
        })
    }

    /// Takes the bound connection out of the slot, acquiring one from the
    /// pool if the session is unbound.
    fn checkout(&mut self) -> Result<D::Conn> {
        match self.conn.take() {
            Some(conn) => Ok(conn),
            None => {
                let conn = self.pool.acquire()?;
                debug!("Context {} bound a connection", self.context);
                Ok(conn)
            }
        }
    }

    fn take_bound(&mut self) -> Result<D::Conn> {
        self.conn.take().ok_or(DbError::NoActiveSession {
            context: self.context,
        })
    }

    fn release(&mut self, conn: D::Conn) {
        self.in_transaction = false;
        self.pool.release(conn);
        debug!("Context {} released its connection", self.context);
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!(
                "Session {} dropped while holding a connection; returning it to the pool",
                self.context
            );
            self.pool.release(conn);
        }
    }
}

impl<D: Driver> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("state", &self.state())
            .finish()
    }
}

/// Runs a statement on a session with a variable number of parameters.
///
/// ```no_run
/// # use simpledb::{run, DbConfig, SimpleDb};
/// let db = SimpleDb::open(DbConfig::new("app.db")).unwrap();
/// let mut session = db.session();
/// run!(session, "INSERT INTO article (title, is_blind) VALUES (?, ?)", "hello", false).unwrap();
/// ```
#[macro_export]
macro_rules! run {
    ($session:expr, $sql:expr $(, $param:expr)* $(,)?) => {
        $session.run($sql, &[$($crate::SqlValue::from($param)),*])
    };
}
