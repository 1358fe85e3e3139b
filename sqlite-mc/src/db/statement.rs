//! Safe wrapper around a `SQLite` prepared statement.
//!
//! No `unsafe` code here; see [`ffi::RawStmt`].

use super::error::DbResult;
use super::ffi::{self, RawStmt};

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available.
    Row,
    /// The statement has finished executing.
    Done,
}

/// A prepared statement, tied to the connection that created it.
///
/// Finalized when dropped.
pub struct Statement<'conn> {
    raw: RawStmt<'conn>,
}

impl<'conn> Statement<'conn> {
    pub(super) const fn new(raw: RawStmt<'conn>) -> Self {
        Self { raw }
    }

    /// Executes a single step.
    ///
    /// # Errors
    ///
    /// Returns the engine error for anything other than a row or completion.
    pub fn step(&self) -> DbResult<StepResult> {
        if self.raw.step()? == ffi::SQLITE_ROW {
            Ok(StepResult::Row)
        } else {
            Ok(StepResult::Done)
        }
    }

    /// Reads column `idx` of the current row as `i64`.
    #[must_use]
    pub fn column_i64(&self, idx: i32) -> i64 {
        self.raw.column_i64(idx)
    }

    /// Reads column `idx` of the current row as text. Empty for NULL.
    #[must_use]
    pub fn column_text(&self, idx: i32) -> String {
        self.raw.column_text(idx)
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement").finish_non_exhaustive()
    }
}
