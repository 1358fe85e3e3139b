//! Engine error types for the safe `SQLite` wrapper.

use std::fmt;

use super::ffi;

/// Result code returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbErrorCode(pub i32);

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned by engine operations (open, directive execution, queries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// `SQLite` result code.
    pub code: DbErrorCode,
    /// Human-readable error message (from `sqlite3_errmsg` when available).
    pub message: String,
}

impl DbError {
    /// Creates a new engine error.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: DbErrorCode(code),
            message: message.into(),
        }
    }

    /// Returns `true` for `SQLITE_NOTADB`, which sqlite3mc reports when the
    /// first page cannot be decrypted with the applied key and cipher
    /// parameters.
    #[must_use]
    pub const fn is_not_a_database(&self) -> bool {
        // Mask off extended result code bits.
        self.code.0 & 0xff == ffi::SQLITE_NOTADB
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sqlite error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for DbError {}

/// Result type for engine operations.
pub type DbResult<T> = Result<T, DbError>;
