use std::future::Future;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{is_broken_connection, Error};

/// A single shared Postgres connection, guarded by a timed acquisition.
///
/// Modeled as a pool capped at one connection: `acquire_timeout` gives us
/// "never block indefinitely, surface `Timeout` on expiry" for free from
/// sqlx's own pool accounting, which is the same contract the original
/// service got from a hand-rolled `std::timed_mutex` around one `pqxx`
/// connection.
#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let opts: PgConnectOptions = config
            .database_url
            .parse()
            .map_err(|_| Error::ConnectionUnavailable)?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(opts)
            .await
            .map_err(|err| Error::from(&err))?;

        Ok(Self { pool })
    }

    /// Wraps an already-connected pool. Used by integration tests that
    /// obtain a pool from `#[sqlx::test]` rather than a `Config`.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `op` against the pool; if it fails with a broken-connection
    /// signal, retries exactly once. Any other error (including a second
    /// broken-connection failure) is returned as-is.
    pub async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, sqlx::Error>
    where
        F: FnMut(PgPool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match op(self.pool.clone()).await {
            Err(err) if is_broken_connection(&err) => {
                tracing::warn!(error = %err, "storage connection broken, retrying once");
                op(self.pool.clone()).await
            }
            other => other,
        }
    }
}
