//! Cipher suite registry.
//!
//! The set of cipher suites is closed: each suite has its own table of
//! tunable parameters and legal ranges ([`CipherCapabilities`]), and adding a
//! suite means adding a variant together with its table.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::pragma::Pragma;

/// A cipher suite supported by the engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum CipherAlgorithm {
    /// SQLCipher-compatible AES-256-CBC with HMAC (all historical versions).
    #[strum(serialize = "sqlcipher")]
    #[serde(rename = "sqlcipher")]
    SqlCipher,
    /// Legacy RC4 stream cipher (System.Data.SQLite compatible).
    #[strum(serialize = "rc4")]
    #[serde(rename = "rc4")]
    Rc4,
    /// ChaCha20-Poly1305 (sqleet compatible). The engine default.
    #[strum(serialize = "chacha20")]
    #[serde(rename = "chacha20")]
    Chacha20,
    /// wxSQLite3 AES-128-CBC.
    #[strum(serialize = "aes128cbc")]
    #[serde(rename = "aes128cbc")]
    Aes128Cbc,
    /// wxSQLite3 AES-256-CBC.
    #[strum(serialize = "aes256cbc")]
    #[serde(rename = "aes256cbc")]
    Aes256Cbc,
}

impl CipherAlgorithm {
    /// The cipher the engine uses when none is selected. Matches the
    /// `CODEC_TYPE` the amalgamation is compiled with.
    pub const ENGINE_DEFAULT: Self = Self::Chacha20;

    /// Looks a cipher up by its canonical engine name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCipher`] for names outside the registry.
    pub fn resolve(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| Error::UnknownCipher(name.to_string()))
    }

    /// Canonical engine-facing name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Parameter legality table of this cipher.
    #[must_use]
    pub const fn capabilities(self) -> &'static CipherCapabilities {
        match self {
            Self::SqlCipher => &SQLCIPHER,
            Self::Rc4 => &RC4,
            Self::Chacha20 => &CHACHA20,
            Self::Aes128Cbc => &AES128CBC,
            Self::Aes256Cbc => &AES256CBC,
        }
    }
}

/// KDF hash algorithm; the engine takes the ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA1.
    Sha1 = 0,
    /// PBKDF2-HMAC-SHA256.
    Sha256 = 1,
    /// PBKDF2-HMAC-SHA512.
    Sha512 = 2,
}

/// HMAC hash algorithm; the engine takes the ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HmacAlgorithm {
    /// HMAC-SHA1.
    Sha1 = 0,
    /// HMAC-SHA256.
    Sha256 = 1,
    /// HMAC-SHA512.
    Sha512 = 2,
}

/// Byte order of the page number included in the page HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HmacPgno {
    /// Native byte order of the host.
    Native = 0,
    /// Little endian.
    LittleEndian = 1,
    /// Big endian.
    BigEndian = 2,
}

impl KdfAlgorithm {
    /// Value written to the engine.
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        self as i64
    }
}

impl HmacAlgorithm {
    /// Value written to the engine.
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        self as i64
    }
}

impl HmacPgno {
    /// Value written to the engine.
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        self as i64
    }
}

/// How a raw (pre-derived) key is written into the key directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKeyFormat {
    /// `raw:<hex>` (sqleet / `ChaCha20` scheme).
    RawPrefix,
    /// `x'<hex>'` (`SQLCipher` scheme).
    HexLiteral,
}

impl RawKeyFormat {
    /// Wraps an already validated lowercase hex string.
    #[must_use]
    pub fn wrap(self, hex: &str) -> String {
        match self {
            Self::RawPrefix => format!("raw:{hex}"),
            Self::HexLiteral => format!("x'{hex}'"),
        }
    }

    /// The hex string inside a directive produced by [`wrap`](Self::wrap).
    #[must_use]
    pub fn unwrap_hex(self, directive: &str) -> Option<&str> {
        match self {
            Self::RawPrefix => directive.strip_prefix("raw:"),
            Self::HexLiteral => directive
                .strip_prefix("x'")
                .and_then(|rest| rest.strip_suffix('\'')),
        }
    }
}

/// Extra predicate a value must satisfy on top of its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCheck {
    /// Range only.
    Range,
    /// Zero, or a power of two.
    PowerOfTwoOrZero,
    /// A multiple of the given alignment.
    MultipleOf(i64),
}

/// Legal values of one parameter for one cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRule {
    /// Smallest legal value.
    pub min: i64,
    /// Largest legal value.
    pub max: i64,
    /// Extra predicate.
    pub check: ValueCheck,
}

impl ParamRule {
    const fn range(min: i64, max: i64) -> Self {
        Self {
            min,
            max,
            check: ValueCheck::Range,
        }
    }
}

/// Parameter legality table of a cipher suite.
#[derive(Debug)]
pub struct CipherCapabilities {
    name: &'static str,
    rules: &'static [(Pragma, ParamRule)],
    raw_key: Option<RawKeyFormat>,
}

const I32_MAX: i64 = 2_147_483_647;

const BOOLEAN: ParamRule = ParamRule::range(0, 1);
const LEGACY_PAGE_SIZE: ParamRule = ParamRule {
    min: 0,
    max: 65536,
    check: ValueCheck::PowerOfTwoOrZero,
};
const ITERATIONS: ParamRule = ParamRule::range(1, I32_MAX);
const ALGORITHM: ParamRule = ParamRule::range(0, 2);
const PLAINTEXT_HEADER_SIZE: ParamRule = ParamRule {
    min: 0,
    max: 100,
    check: ValueCheck::MultipleOf(16),
};

const CHACHA20: CipherCapabilities = CipherCapabilities {
    name: "chacha20",
    rules: &[
        (Pragma::Legacy, ParamRule::range(0, 4)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
        (Pragma::KdfIter, ITERATIONS),
    ],
    raw_key: Some(RawKeyFormat::RawPrefix),
};

const SQLCIPHER: CipherCapabilities = CipherCapabilities {
    name: "sqlcipher",
    rules: &[
        (Pragma::Legacy, ParamRule::range(0, 4)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
        (Pragma::KdfIter, ITERATIONS),
        (Pragma::FastKdfIter, ITERATIONS),
        (Pragma::HmacUse, BOOLEAN),
        (Pragma::HmacPgno, ALGORITHM),
        (Pragma::HmacSaltMask, ParamRule::range(0, 255)),
        (Pragma::KdfAlgorithm, ALGORITHM),
        (Pragma::HmacAlgorithm, ALGORITHM),
        (Pragma::PlaintextHeaderSize, PLAINTEXT_HEADER_SIZE),
    ],
    raw_key: Some(RawKeyFormat::HexLiteral),
};

const RC4: CipherCapabilities = CipherCapabilities {
    name: "rc4",
    rules: &[
        (Pragma::Legacy, ParamRule::range(1, 1)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
    ],
    raw_key: None,
};

const AES128CBC: CipherCapabilities = CipherCapabilities {
    name: "aes128cbc",
    rules: &[
        (Pragma::Legacy, ParamRule::range(0, 1)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
    ],
    raw_key: None,
};

const AES256CBC: CipherCapabilities = CipherCapabilities {
    name: "aes256cbc",
    rules: &[
        (Pragma::Legacy, ParamRule::range(0, 1)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
        (Pragma::KdfIter, ITERATIONS),
    ],
    raw_key: None,
};

/// Rules used while no cipher is selected: the union of every suite, with
/// the widest range each parameter takes in any of them.
pub static GENERIC: CipherCapabilities = CipherCapabilities {
    name: "generic",
    rules: &[
        (Pragma::Legacy, ParamRule::range(0, 4)),
        (Pragma::HmacCheck, BOOLEAN),
        (Pragma::LegacyPageSize, LEGACY_PAGE_SIZE),
        (Pragma::KdfIter, ITERATIONS),
        (Pragma::FastKdfIter, ITERATIONS),
        (Pragma::HmacUse, BOOLEAN),
        (Pragma::HmacPgno, ALGORITHM),
        (Pragma::HmacSaltMask, ParamRule::range(0, 255)),
        (Pragma::KdfAlgorithm, ALGORITHM),
        (Pragma::HmacAlgorithm, ALGORITHM),
        (Pragma::PlaintextHeaderSize, PLAINTEXT_HEADER_SIZE),
    ],
    raw_key: None,
};

impl CipherCapabilities {
    /// Name of the rule set (cipher name, or `generic`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Rule for `pragma`, or `None` if it is not tunable for this cipher.
    #[must_use]
    pub fn rule(&self, pragma: Pragma) -> Option<&ParamRule> {
        self.rules
            .iter()
            .find(|(p, _)| *p == pragma)
            .map(|(_, rule)| rule)
    }

    /// Raw key encoding this cipher accepts, if any.
    #[must_use]
    pub const fn raw_key_format(&self) -> Option<RawKeyFormat> {
        self.raw_key
    }

    /// Checks `value` against the rule for `pragma`.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedParameter`] if the parameter is not tunable.
    /// * [`Error::InvalidParameter`] if the value is out of range.
    /// * [`Error::NotPowerOfTwo`] / [`Error::MisalignedParameter`] if the
    ///   extra predicate fails.
    pub fn validate(&self, pragma: Pragma, value: i64) -> Result<()> {
        let parameter = pragma.name();
        let rule = self.rule(pragma).ok_or(Error::UnsupportedParameter {
            parameter,
            cipher: self.name,
        })?;
        if value < rule.min || value > rule.max {
            return Err(Error::InvalidParameter {
                parameter,
                value,
                cipher: self.name,
                min: rule.min,
                max: rule.max,
            });
        }
        match rule.check {
            ValueCheck::Range => Ok(()),
            ValueCheck::PowerOfTwoOrZero => {
                if value == 0 || value.count_ones() == 1 {
                    Ok(())
                } else {
                    Err(Error::NotPowerOfTwo { parameter, value })
                }
            }
            ValueCheck::MultipleOf(multiple) => {
                if value % multiple == 0 {
                    Ok(())
                } else {
                    Err(Error::MisalignedParameter {
                        parameter,
                        value,
                        multiple,
                    })
                }
            }
        }
    }
}
