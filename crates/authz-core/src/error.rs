/// Error kinds raised by the core stores and evaluators.
///
/// Components never log or swallow these; the RPC shell is the only layer
/// that translates a kind into a wire status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("revision mismatch")]
    RevisionMismatch,
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid parent id")]
    InvalidParentId,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid list args")]
    InvalidListArgs,
    #[error("invalid strategy")]
    InvalidStrategy,
    #[error("timed out acquiring storage connection")]
    Timeout,
    #[error("storage is not initialized or is unreachable")]
    ConnectionUnavailable,
}

impl From<authz_storage::Error> for Error {
    fn from(err: authz_storage::Error) -> Self {
        match err {
            authz_storage::Error::Timeout => Error::Timeout,
            authz_storage::Error::ConnectionUnavailable => Error::ConnectionUnavailable,
            authz_storage::Error::Sql(err) => from_sql(&err),
        }
    }
}

/// Maps a raw `sqlx::Error` surfaced from a store operation onto a core
/// kind. Foreign-key and check-constraint violations carry store-specific
/// meaning, so each call site that can hit one passes its own mapping in
/// via [`map_constraint_violation`] rather than relying on this default.
fn from_sql(err: &sqlx::Error) -> Error {
    match err {
        sqlx::Error::PoolTimedOut => Error::Timeout,
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Error::ConnectionUnavailable,
        _ => Error::InvalidData(err.to_string()),
    }
}

/// Classifies a database error from a `store()` upsert: foreign-key and
/// check-constraint violations get the caller-supplied kind, everything
/// else falls back to the generic SQL mapping.
pub(crate) fn map_constraint_violation(
    err: sqlx::Error,
    on_fkey: Error,
    on_check: Error,
) -> Error {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            // foreign_key_violation
            Some("23503") => return on_fkey,
            // check_violation
            Some("23514") => return on_check,
            _ => {}
        }
    }
    from_sql(&err)
}

/// True for a unique-violation on the tuple composite-key index (SQLSTATE
/// `23505`), which the store maps to `AlreadyExists` rather than a raw SQL
/// error.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}
