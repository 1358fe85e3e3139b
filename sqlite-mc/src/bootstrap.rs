//! Ordered connection bootstrap, verification and rekey.
//!
//! # Bootstrap flow
//!
//! 1. **Open** -- the engine opens (or creates) the file. Nothing can be read
//!    yet: the pages are opaque until the connection is keyed.
//!
//! 2. **Configure** -- every cipher parameter present in the [`McConfig`] is
//!    applied in the fixed order of
//!    [`CIPHER_PRAGMA_ORDER`](crate::pragma::CIPHER_PRAGMA_ORDER), either as
//!    `PRAGMA <name> = <value>` or through `sqlite3mc_config()`. The engine
//!    reads these values when the key arrives, so all of them go first.
//!
//! 3. **Key** -- the key directive is applied (`PRAGMA key` or
//!    `PRAGMA hexkey`). The engine accepts any key here; a wrong key is only
//!    noticed when a page is read.
//!
//! 4. **Passthrough** -- general pragmas such as `journal_mode` are applied.
//!
//! The result is a [`ProvisionalConnection`]. [`ProvisionalConnection::verify`]
//! reads `sqlite_master`, which forces page 1 to be decrypted; only then is
//! the connection an [`EncryptedConnection`].
//!
//! Key material is never logged: directives carrying a key are flagged
//! secret, executed through the zeroizing path and redacted in `Debug`.

use std::ops::Deref;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cipher::CipherAlgorithm;
use crate::config::{McConfig, PlainConfig};
use crate::db::{Connection, DbResult, StepResult};
use crate::error::{Error, Result};
use crate::key::KeyMaterial;

const VERIFY_SQL: &str = "SELECT count(*) FROM sqlite_master;";

/// One SQL statement of the bootstrap sequence.
pub struct Directive {
    name: String,
    sql: Zeroizing<String>,
    secret: bool,
}

impl Directive {
    pub(crate) fn public(name: &str, sql: String) -> Self {
        Self {
            name: name.to_string(),
            sql: Zeroizing::new(sql),
            secret: false,
        }
    }

    pub(crate) fn secret(name: &str, sql: Zeroizing<String>) -> Self {
        Self {
            name: name.to_string(),
            sql,
            secret: true,
        }
    }

    /// Parameter the directive sets.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL text. Contains key material when [`is_secret`](Self::is_secret).
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns `true` if the SQL carries key material.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        self.secret
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sql: &str = if self.secret { "[REDACTED]" } else { &self.sql };
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("sql", &sql)
            .field("secret", &self.secret)
            .finish()
    }
}

/// Executes bootstrap directives.
///
/// Implemented by [`Connection`]; tests substitute a recorder.
pub trait DirectiveSink {
    /// Executes one directive.
    ///
    /// # Errors
    ///
    /// Returns the engine error of the directive.
    fn apply(&mut self, directive: &Directive) -> DbResult<()>;
}

impl DirectiveSink for Connection {
    fn apply(&mut self, directive: &Directive) -> DbResult<()> {
        if directive.is_secret() {
            self.execute_batch_zeroized(directive.sql())
        } else {
            self.execute_batch(directive.sql())
        }
    }
}

/// Applies every directive of `config` to `sink`, in order, stopping at the
/// first failure.
///
/// # Errors
///
/// Returns [`Error::Engine`] with the failing directive's engine error.
pub fn apply_directives<S: DirectiveSink>(sink: &mut S, config: &McConfig) -> Result<()> {
    let indirect = config.uses_sql_interface();
    for directive in config.directives() {
        tracing::debug!(pragma = directive.name(), indirect, "applying directive");
        sink.apply(&directive).map_err(|e| {
            tracing::error!(pragma = directive.name(), code = e.code.0, "directive failed");
            Error::Engine(e)
        })?;
    }
    Ok(())
}

/// A keyed connection whose key has not been checked against the file yet.
#[derive(Debug)]
pub struct ProvisionalConnection {
    conn: Connection,
    fingerprint: [u8; 32],
    parameters: [u8; 32],
}

impl ProvisionalConnection {
    /// Reads `sqlite_master` to prove the key and cipher parameters match
    /// the file.
    ///
    /// # Errors
    ///
    /// * [`Error::AuthenticationFailed`] if the engine reports the file is not
    ///   a database under this configuration.
    /// * [`Error::Engine`] for any other engine failure.
    pub fn verify(self) -> Result<EncryptedConnection> {
        match count_schema_entries(&self.conn) {
            Ok(entries) => {
                tracing::info!(entries, "encryption key verified");
                Ok(EncryptedConnection {
                    conn: self.conn,
                    fingerprint: self.fingerprint,
                    parameters: self.parameters,
                })
            }
            Err(e) if e.is_not_a_database() => {
                tracing::warn!(code = e.code.0, "encryption key verification failed");
                Err(Error::AuthenticationFailed(e))
            }
            Err(e) => Err(Error::Engine(e)),
        }
    }

    /// The underlying connection, without verification.
    #[must_use]
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

/// Applies `config` to an open connection.
///
/// # Errors
///
/// * [`Error::InvalidKeyEncoding`] if `config` carries no key; an encrypted
///   open never silently falls back to plaintext.
/// * [`Error::Engine`] if a directive fails. The connection is dropped.
pub fn bootstrap(mut conn: Connection, config: &McConfig) -> Result<ProvisionalConnection> {
    let key = config
        .key()
        .ok_or_else(|| Error::InvalidKeyEncoding("no key material configured".into()))?;
    apply_directives(&mut conn, config)?;
    tracing::info!(
        cipher = config.cipher().map(CipherAlgorithm::name),
        indirect = config.uses_sql_interface(),
        "bootstrap directives applied"
    );
    Ok(ProvisionalConnection {
        conn,
        fingerprint: key.fingerprint(),
        parameters: config.parameter_fingerprint(),
    })
}

/// Opens `path` and bootstraps it with `config`.
///
/// # Errors
///
/// See [`bootstrap`]; also fails if the file cannot be opened.
pub fn open(path: &Path, config: &McConfig) -> Result<ProvisionalConnection> {
    let conn = Connection::open(path, false)?;
    bootstrap(conn, config)
}

/// Opens, bootstraps and verifies `path`.
///
/// # Errors
///
/// See [`open`] and [`ProvisionalConnection::verify`].
pub fn open_verified(path: &Path, config: &McConfig) -> Result<EncryptedConnection> {
    open(path, config)?.verify()
}

/// Opens an unencrypted database and applies general pragmas.
///
/// # Errors
///
/// Returns [`Error::Engine`] if the file cannot be opened or a pragma fails.
pub fn open_plain(path: &Path, config: &PlainConfig) -> Result<Connection> {
    let mut conn = Connection::open(path, false)?;
    for directive in config.directives() {
        tracing::debug!(pragma = directive.name(), "applying directive");
        conn.apply(&directive)?;
    }
    Ok(conn)
}

/// A connection whose key has been confirmed against the file.
///
/// Dereferences to [`Connection`] for queries.
#[derive(Debug)]
pub struct EncryptedConnection {
    conn: Connection,
    fingerprint: [u8; 32],
    parameters: [u8; 32],
}

impl EncryptedConnection {
    /// Checks that `config` carries the key and cipher parameters this
    /// connection is keyed with.
    ///
    /// A match is a no-op: nothing is sent to the engine. A different key is
    /// refused; changing the key is an explicit [`rekey`](Self::rekey). The
    /// page format cannot change on an open connection at all.
    ///
    /// # Errors
    ///
    /// * [`Error::RekeyRequired`] if the key differs.
    /// * [`Error::ConfigurationMismatch`] if the cipher parameters differ.
    /// * [`Error::InvalidKeyEncoding`] if `config` has no key.
    pub fn reassert(&self, config: &McConfig) -> Result<()> {
        let key = config
            .key()
            .ok_or_else(|| Error::InvalidKeyEncoding("no key material configured".into()))?;
        if key.fingerprint() != self.fingerprint {
            return Err(Error::RekeyRequired);
        }
        if config.parameter_fingerprint() != self.parameters {
            tracing::warn!("reassert with different cipher parameters refused");
            return Err(Error::ConfigurationMismatch);
        }
        tracing::debug!("key and cipher parameters already in force");
        Ok(())
    }

    /// Re-encrypts the database under `key` and checks it can still be read.
    ///
    /// The configuration used to open the connection is not modified; use
    /// [`McConfig::with_rekeyed`] for the next open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RekeyFailure`] if the engine rejects the rekey (for
    /// example in WAL journal mode) or the database cannot be read afterwards.
    pub fn rekey(&mut self, key: &KeyMaterial) -> Result<()> {
        let sql = key.rekey_sql();
        self.conn
            .execute_batch_zeroized(&sql)
            .map_err(Error::RekeyFailure)?;
        count_schema_entries(&self.conn).map_err(Error::RekeyFailure)?;
        self.fingerprint = key.fingerprint();
        tracing::info!("database rekeyed");
        Ok(())
    }

    /// Runs `PRAGMA integrity_check` and returns the reported problems.
    /// An empty list means the database is healthy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if the check cannot run.
    pub fn integrity_check(&self) -> Result<Vec<String>> {
        let stmt = self.conn.prepare("PRAGMA integrity_check;")?;
        let mut problems = Vec::new();
        while stmt.step()? == StepResult::Row {
            let line = stmt.column_text(0);
            if line.trim() != "ok" {
                problems.push(line);
            }
        }
        Ok(problems)
    }

    /// The underlying connection.
    #[must_use]
    pub fn into_inner(self) -> Connection {
        self.conn
    }
}

impl Deref for EncryptedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

fn count_schema_entries(conn: &Connection) -> DbResult<i64> {
    conn.query_row(VERIFY_SQL, |stmt| Ok(stmt.column_i64(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{presets, ConfigBuilder};
    use crate::db::DbError;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<(String, bool)>,
        fail_on: Option<&'static str>,
    }

    impl DirectiveSink for Recorder {
        fn apply(&mut self, directive: &Directive) -> DbResult<()> {
            if self.fail_on == Some(directive.name()) {
                return Err(DbError::new(1, "rejected"));
            }
            self.applied
                .push((directive.name().to_string(), directive.is_secret()));
            Ok(())
        }
    }

    #[test]
    fn test_sink_sees_parameters_then_key_then_passthrough() {
        let config = presets::sqlcipher_v4()
            .with_key("pw")
            .unwrap()
            .with_pragma("busy_timeout", "5000")
            .unwrap()
            .build();
        let mut recorder = Recorder::default();
        apply_directives(&mut recorder, &config).unwrap();
        let names: Vec<_> = recorder.applied.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "cipher",
                "legacy",
                "legacy_page_size",
                "kdf_iter",
                "fast_kdf_iter",
                "hmac_use",
                "hmac_pgno",
                "hmac_salt_mask",
                "kdf_algorithm",
                "hmac_algorithm",
                "plaintext_header_size",
                "key",
                "busy_timeout",
            ]
        );
        let secrets: Vec<_> = recorder.applied.iter().filter(|(_, s)| *s).collect();
        assert_eq!(secrets.len(), 1);
    }

    #[test]
    fn test_failure_stops_sequence_before_key() {
        let config = presets::chacha20_default().with_key("pw").unwrap().build();
        let mut recorder = Recorder {
            fail_on: Some("kdf_iter"),
            ..Recorder::default()
        };
        let err = apply_directives(&mut recorder, &config).expect_err("fails");
        assert!(matches!(err, Error::Engine(_)));
        assert!(recorder.applied.iter().all(|(name, _)| name != "key"));
    }

    #[test]
    fn test_bootstrap_requires_key() {
        let conn = Connection::open_in_memory().unwrap();
        let config = presets::chacha20_default().build();
        assert!(matches!(
            bootstrap(conn, &config),
            Err(Error::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_reassert_same_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new().with_key("pw").unwrap().build();
        let encrypted = open_verified(&dir.path().join("a.db"), &config).unwrap();
        encrypted.reassert(&config).unwrap();
        encrypted.reassert(&config).unwrap();

        let other = config.with_rekeyed(KeyMaterial::passphrase("other").unwrap());
        assert!(matches!(encrypted.reassert(&other), Err(Error::RekeyRequired)));
    }

    #[test]
    fn test_reassert_refuses_other_cipher_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let config = presets::chacha20_default().with_key("pw").unwrap().build();
        let encrypted = open_verified(&dir.path().join("c.db"), &config).unwrap();

        let same_key_other_format = presets::chacha20_sqlleet().with_key("pw").unwrap().build();
        assert!(matches!(
            encrypted.reassert(&same_key_other_format),
            Err(Error::ConfigurationMismatch)
        ));

        let other_delivery = presets::chacha20_default()
            .with_key("pw")
            .unwrap()
            .use_sql_interface(true)
            .build();
        encrypted.reassert(&other_delivery).unwrap();

        let conn = encrypted.into_inner();
        conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
    }

    #[test]
    fn test_integrity_check_on_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new().with_key("pw").unwrap().build();
        let encrypted = open_verified(&dir.path().join("b.db"), &config).unwrap();
        encrypted
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        assert!(encrypted.integrity_check().unwrap().is_empty());
    }

    #[test]
    fn test_secret_directive_debug_is_redacted() {
        let directive = Directive::secret("key", Zeroizing::new("PRAGMA key = 'x';".into()));
        assert!(!format!("{directive:?}").contains("PRAGMA key"));
        let directive = Directive::public("legacy", "PRAGMA legacy = 1;".into());
        assert!(format!("{directive:?}").contains("PRAGMA legacy = 1;"));
    }
}
