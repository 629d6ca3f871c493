use rusqlite::ffi;
use thiserror::Error;

/// Errors raised by the data-access layer.
#[derive(Error, Debug)]
pub enum DbError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// No row for the given key
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The write would break a uniqueness or state rule
    #[error("{0}")]
    Conflict(String),

    /// Catch-all for store failures
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    pub(crate) fn user_not_found(username: &str) -> Self {
        DbError::NotFound {
            entity: "User",
            key: username.to_string(),
        }
    }

    pub(crate) fn message_not_found(id: i64) -> Self {
        DbError::NotFound {
            entity: "Message",
            key: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Other(err.into())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error().map(|e| e.extended_code),
        Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error().map(|e| e.extended_code),
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
    )
}
