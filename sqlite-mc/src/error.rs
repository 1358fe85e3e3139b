//! Error types for configuration, key normalization, bootstrap and rekey.

use thiserror::Error;

use crate::db::DbError;

/// Result type for sqlite-mc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a configuration or driving the engine.
///
/// Validation errors (`InvalidParameter`, `UnsupportedParameter`,
/// `MisalignedParameter`, `InvalidKeyLength`, `InvalidKeyEncoding`) are raised
/// at the setter call and are never retried. Engine-side failures are
/// surfaced unchanged; there is never a silent fallback to an unencrypted
/// open.
#[derive(Debug, Error)]
pub enum Error {
    /// The cipher name is not one of the registered cipher suites.
    #[error("unknown cipher: {0}")]
    UnknownCipher(String),

    /// A parameter value lies outside the range legal for the selected cipher.
    #[error("invalid value {value} for {parameter} with cipher {cipher}: expected {min}..={max}")]
    InvalidParameter {
        /// Canonical parameter name.
        parameter: &'static str,
        /// Rejected value.
        value: i64,
        /// Cipher whose rules were applied (`generic` when none is selected).
        cipher: &'static str,
        /// Smallest legal value.
        min: i64,
        /// Largest legal value.
        max: i64,
    },

    /// The legacy page size is in range but is neither zero nor a power of two.
    #[error("invalid value {value} for {parameter}: must be 0 or a power of two")]
    NotPowerOfTwo {
        /// Canonical parameter name.
        parameter: &'static str,
        /// Rejected value.
        value: i64,
    },

    /// The value is in range but not a multiple of the required alignment.
    #[error("invalid value {value} for {parameter}: must be a multiple of {multiple}")]
    MisalignedParameter {
        /// Canonical parameter name.
        parameter: &'static str,
        /// Rejected value.
        value: i64,
        /// Required alignment.
        multiple: i64,
    },

    /// The parameter cannot be tuned for the selected cipher.
    #[error("{parameter} is not supported by cipher {cipher}")]
    UnsupportedParameter {
        /// Canonical parameter name.
        parameter: &'static str,
        /// Selected cipher.
        cipher: &'static str,
    },

    /// Raw key material has the wrong number of bytes.
    #[error("raw key must be exactly {expected} bytes long (provided: {actual})")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Provided length in bytes.
        actual: usize,
    },

    /// Key material is not in an acceptable encoding.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The operating system random source failed while generating a key.
    #[error("random source failed: {0}")]
    Randomness(String),

    /// A property bag entry could not be interpreted.
    #[error("invalid property {name}: {reason}")]
    InvalidProperty {
        /// Property name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The key or cipher parameters do not match the file's encryption state.
    ///
    /// Only detected on first page access, never by the bootstrap itself.
    #[error("authentication failed (wrong key or cipher parameters): {0}")]
    AuthenticationFailed(DbError),

    /// A bootstrap was re-run on a confirmed connection with a different key.
    #[error("connection is keyed with different key material; use rekey instead")]
    RekeyRequired,

    /// A bootstrap was re-run on a confirmed connection with the same key
    /// but a different cipher or cipher parameters.
    #[error("connection is keyed under different cipher parameters")]
    ConfigurationMismatch,

    /// The rekey directive failed. The pre-rekey key is still in force unless
    /// re-verification shows otherwise.
    #[error("rekey failed: {0}")]
    RekeyFailure(DbError),

    /// Directive application or file I/O failed for reasons unrelated to the key.
    #[error(transparent)]
    Engine(#[from] DbError),
}
