/// Core Module for SimpleDb
///
/// Connection pooling, sessions and the error taxonomy they share.
pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, DriverError, Result};
