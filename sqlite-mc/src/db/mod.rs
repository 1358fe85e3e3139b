//! Minimal safe `SQLite` wrapper over the sqlite3mc engine.
//!
//! This is the storage-engine collaborator: open a file, execute directive
//! text, read a row, close on drop. The raw symbols come from the sqlite3mc
//! static library compiled from the downloaded amalgamation by `build.rs`.
//!
//! Everything above this module (cipher registry, builder, bootstrap) uses
//! only the safe types defined here. The `ffi` module is the **only** file
//! that contains `unsafe` code or C types.

mod ffi;

mod connection;
pub mod error;
mod statement;

pub use connection::Connection;
pub use error::{DbError, DbErrorCode, DbResult};
pub use statement::{Statement, StepResult};
