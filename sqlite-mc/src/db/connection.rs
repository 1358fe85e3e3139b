//! Safe wrapper around a `SQLite` database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::path::Path;

use super::error::{DbError, DbResult};
use super::ffi::{self, RawDb};
use super::statement::{Statement, StepResult};

/// A connection to an engine database file.
///
/// Closed when dropped. `Send` but not `Sync`: a connection has a single
/// logical owner at a time, and must not be bootstrapped or rekeyed from two
/// threads at once. Independent connections to the same file are fine.
pub struct Connection {
    db: RawDb,
}

impl Connection {
    /// Opens (or creates) a database at `path`.
    ///
    /// The returned connection is not yet keyed: for an encrypted file, no
    /// page can be read until the bootstrap sequence has applied the cipher
    /// configuration and key.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not valid UTF-8 or the engine cannot
    /// open the file.
    pub fn open(path: &Path, read_only: bool) -> DbResult<Self> {
        let path_str = path.to_str().ok_or_else(|| {
            DbError::new(
                ffi::SQLITE_CANTOPEN,
                format!("path is not valid UTF-8: {}", path.display()),
            )
        })?;
        let flags = if read_only {
            ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX
        } else {
            ffi::SQLITE_OPEN_READWRITE
                | ffi::SQLITE_OPEN_CREATE
                | ffi::SQLITE_OPEN_FULLMUTEX
        };
        let db = RawDb::open(path_str, flags)?;
        Ok(Self { db })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot allocate the database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(Path::new(":memory:"), false)
    }

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    ///
    /// # Errors
    ///
    /// Returns the engine error of the first failing statement.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.db.exec(sql)
    }

    /// Like [`execute_batch`](Self::execute_batch) but zeroizes the internal
    /// C string buffer after execution. Use for SQL containing key material
    /// (`PRAGMA key`, `PRAGMA rekey`, ...).
    ///
    /// # Errors
    ///
    /// Returns the engine error of the first failing statement.
    pub fn execute_batch_zeroized(&self, sql: &str) -> DbResult<()> {
        self.db.exec_zeroized(sql)
    }

    /// Prepares a single SQL statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement does not compile.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'_>> {
        let raw_stmt = self.db.prepare(sql)?;
        Ok(Statement::new(raw_stmt))
    }

    /// Prepares and executes a statement, mapping exactly one result row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or returns no row.
    pub fn query_row<T>(
        &self,
        sql: &str,
        mapper: impl FnOnce(&Statement<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        let stmt = self.prepare(sql)?;
        match stmt.step()? {
            StepResult::Row => mapper(&stmt),
            StepResult::Done => {
                Err(DbError::new(ffi::SQLITE_DONE, "query returned no rows"))
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
