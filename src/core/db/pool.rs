/// Connection Pool Module
///
/// A fixed-size pool of pre-opened connections. Checkout blocks until a
/// connection is released or the configured acquire timeout elapses;
/// returning a connection never blocks beyond the pool mutex.
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::driver::Driver;
use crate::config::DbConfig;
use crate::core::{DbError, Result};

pub struct Pool<D: Driver> {
    driver: D,
    /// Connections currently available for checkout
    idle: Mutex<Vec<D::Conn>>,
    /// Signalled once per released connection
    available: Condvar,
    size: usize,
    acquire_timeout: Duration,
}

impl<D: Driver> Pool<D> {
    /// Opens `config.pool_size` connections up front.
    ///
    /// # Errors
    ///
    /// `DbError::Config` if the configuration is invalid, `DbError::Connect`
    /// on the first connection the driver fails to open.
    pub fn connect(driver: D, config: &DbConfig) -> Result<Self> {
        config.validate()?;

        let mut idle = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            idle.push(driver.open(config).map_err(DbError::Connect)?);
        }

        info!(
            "Connection pool ready: {} connections to {}",
            config.pool_size, config.database
        );

        Ok(Pool {
            driver,
            idle: Mutex::new(idle),
            available: Condvar::new(),
            size: config.pool_size,
            acquire_timeout: config.acquire_timeout_duration(),
        })
    }

    /// Checks out a connection, waiting up to the acquire timeout.
    ///
    /// The check-and-remove happens under the pool mutex, so no two callers
    /// can ever be handed the same connection. Waiters are not served in
    /// arrival order.
    pub fn acquire(&self) -> Result<D::Conn> {
        let start = Instant::now();
        let deadline = start + self.acquire_timeout;
        let mut idle = self.idle.lock();
        let mut waited = false;

        loop {
            if let Some(conn) = idle.pop() {
                debug!("Acquired connection ({} idle left)", idle.len());
                return Ok(conn);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = now - start;
                error!("Connection pool exhausted after waiting {:?}", waited);
                return Err(DbError::PoolExhausted { waited });
            }

            if !waited {
                warn!("No idle connection among {}; waiting", self.size);
                waited = true;
            }
            self.available.wait_until(&mut idle, deadline);
        }
    }

    /// Returns a connection to the pool and wakes one waiter.
    ///
    /// The driver gets a chance to reset connection state first. A failed
    /// reset is logged and the connection is returned anyway.
    pub fn release(&self, mut conn: D::Conn) {
        if let Err(e) = self.driver.reset(&mut conn) {
            warn!("Failed to reset connection on release: {}", e);
        }

        let mut idle = self.idle.lock();
        idle.push(conn);
        debug!("Released connection ({} idle)", idle.len());
        drop(idle);
        self.available.notify_one();
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Number of connections currently available for checkout.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Total number of connections owned by the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}

impl<D: Driver> fmt::Debug for Pool<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("size", &self.size)
            .field("idle", &self.idle_count())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}
