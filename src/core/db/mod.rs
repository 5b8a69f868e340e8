/// Database Module
///
/// The connection manager, organized leaves-first:
/// - **Driver** (`driver.rs`): the transport seam and the value/row types
/// - **SQLite** (`sqlite.rs`): the bundled `rusqlite` driver
/// - **Pool** (`pool.rs`): bounded checkout and return of connections
/// - **Session** (`session.rs`): per-context connection affinity and transactions
/// - **Sql** (`sql.rs`): the statement builder returned by `Session::gen_sql`
///
/// All fallible operations return the crate-wide `DbError`.
pub mod driver;
pub mod pool;
pub mod session;
pub mod sql;
pub mod sqlite;

pub use driver::{Driver, Row, SqlValue};
pub use pool::Pool;
pub use session::{ContextId, Session, SessionState, SimpleDb};
pub use sql::Sql;
pub use sqlite::SqliteDriver;
