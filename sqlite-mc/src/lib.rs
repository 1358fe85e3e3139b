//! Configuration builder and ordered connection bootstrap for `SQLite3`
//! Multiple Ciphers (`sqlite3mc`) encrypted databases.
//!
//! The engine encrypts every page of a database file with one of several
//! cipher suites. Which suite, which legacy format and which key are not
//! stored anywhere usable before the file is decrypted, so the caller has to
//! supply them, in the right order, before the first page is read. This
//! crate covers that part:
//!
//! * [`cipher`] -- the closed set of cipher suites and the legal parameter
//!   ranges of each.
//! * [`ConfigBuilder`] -- validated, cipher-aware configuration, producing an
//!   immutable [`McConfig`]. [`config::presets`] has the tuples of known
//!   on-disk formats (sqleet, `SQLCipher` 1 to 4, System.Data.SQLite, ...).
//! * [`KeyMaterial`] -- passphrases, hex keys and raw 32/48 byte keys,
//!   normalized into the directive the engine expects.
//! * [`bootstrap()`](bootstrap::bootstrap) -- applies a configuration to a
//!   live connection, then [`ProvisionalConnection::verify`] proves the key
//!   with a read. [`EncryptedConnection::rekey`] changes the key.
//! * [`ConnectionConfig`] -- the property-bag form used by hosts that pass
//!   configuration around as string maps.
//!
//! ```no_run
//! use sqlite_mc::config::presets;
//!
//! # fn main() -> sqlite_mc::Result<()> {
//! let config = presets::sqlcipher_v4().with_key("correct horse")?.build();
//! let conn = sqlite_mc::open_verified("vault.db".as_ref(), &config)?;
//! conn.execute_batch("CREATE TABLE IF NOT EXISTS t (x INTEGER);")?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cipher;
pub mod config;
pub mod db;
mod error;
pub mod key;
pub mod pragma;
pub mod properties;

pub use bootstrap::{
    bootstrap, open, open_plain, open_verified, Directive, DirectiveSink, EncryptedConnection,
    ProvisionalConnection,
};
pub use cipher::{CipherAlgorithm, HmacAlgorithm, HmacPgno, KdfAlgorithm};
pub use config::{ConfigBuilder, McConfig, PlainConfig};
pub use error::{Error, Result};
pub use key::{HexKeyMode, KeyMaterial};
pub use pragma::Pragma;
pub use properties::{ConnectionConfig, Properties};
