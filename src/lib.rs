//! A minimal database-connection manager.
//!
//! `SimpleDb` keeps a fixed pool of live connections. Each calling context
//! works through its own `Session`, which binds one connection on first use
//! and runs statements and transactions on it.

// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::DbConfig;
pub use crate::core::db::{
    ContextId, Driver, Pool, Row, Session, SessionState, SimpleDb, Sql, SqlValue, SqliteDriver,
};
pub use crate::core::{DbError, DriverError, Result};
