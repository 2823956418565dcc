#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("timed out acquiring the storage connection")]
    Timeout,
    #[error("storage is not initialized or is unreachable")]
    ConnectionUnavailable,
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<&sqlx::Error> for Error {
    fn from(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Error::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Error::ConnectionUnavailable,
            _ => Error::Sql(sqlx::Error::Protocol(err.to_string())),
        }
    }
}

/// Classifies a raw `sqlx::Error` the way callers of [`crate::Storage::with_retry`]
/// need to: "broken connection, retry once" vs. "genuine failure, surface it".
pub(crate) fn is_broken_connection(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolClosed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timed_out_maps_to_timeout() {
        assert!(matches!(Error::from(&sqlx::Error::PoolTimedOut), Error::Timeout));
    }

    #[test]
    fn pool_closed_maps_to_connection_unavailable() {
        assert!(matches!(
            Error::from(&sqlx::Error::PoolClosed),
            Error::ConnectionUnavailable
        ));
    }

    #[test]
    fn broken_connection_signals_are_retried() {
        assert!(is_broken_connection(&sqlx::Error::PoolClosed));
        assert!(!is_broken_connection(&sqlx::Error::PoolTimedOut));
        assert!(!is_broken_connection(&sqlx::Error::RowNotFound));
    }
}
