//! Canonical configuration parameter names.
//!
//! The names double as the wire vocabulary used when driving the engine
//! (`PRAGMA <name> = ...`, `sqlite3mc_config(..., 'default:<name>', ...)`) and
//! as property-bag keys. They are a durable contract: renaming one breaks
//! every stored configuration and every file created with it.

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// An encryption-related configuration parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Pragma {
    /// Cipher suite selection.
    Cipher,
    /// Historical on-disk format variant of the cipher.
    Legacy,
    /// Whether page HMACs are checked on read.
    HmacCheck,
    /// Page size used by legacy formats.
    LegacyPageSize,
    /// KDF iteration count for the page key.
    KdfIter,
    /// KDF iteration count for the HMAC key.
    FastKdfIter,
    /// Whether page HMACs are written.
    HmacUse,
    /// Byte order of the page number fed to the HMAC.
    HmacPgno,
    /// Salt mask for the HMAC key derivation.
    HmacSaltMask,
    /// KDF hash algorithm.
    KdfAlgorithm,
    /// HMAC hash algorithm.
    HmacAlgorithm,
    /// Size of the unencrypted prefix of page 1.
    PlaintextHeaderSize,
    /// Key directive.
    Key,
    /// Mirror of [`Pragma::Key`] kept for the older key-application path.
    Password,
    /// Rekey directive.
    Rekey,
    /// How the key slot is encoded ([`HexKeyMode`](crate::key::HexKeyMode)).
    HexkeyMode,
    /// Apply cipher parameters through `sqlite3mc_config()` instead of
    /// per-parameter `PRAGMA` statements.
    McUseSqlInterface,
}

/// Order in which cipher parameters are applied, before the key.
///
/// The engine derives its page format from these values when the key is
/// applied, so every one of them must be in place first.
pub const CIPHER_PRAGMA_ORDER: [Pragma; 12] = [
    Pragma::Cipher,
    Pragma::Legacy,
    Pragma::HmacCheck,
    Pragma::LegacyPageSize,
    Pragma::KdfIter,
    Pragma::FastKdfIter,
    Pragma::HmacUse,
    Pragma::HmacPgno,
    Pragma::HmacSaltMask,
    Pragma::KdfAlgorithm,
    Pragma::HmacAlgorithm,
    Pragma::PlaintextHeaderSize,
];

impl Pragma {
    /// Canonical name of the parameter.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns `true` for the slots holding key material, whose values must
    /// never be logged or printed.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Key | Self::Password | Self::Rekey)
    }
}

/// Returns `true` if `name` is one of the encryption parameter names.
///
/// These names are reserved: a general pragma set may not hold them, so
/// nothing can apply them a second time after the key.
#[must_use]
pub fn is_cipher_pragma_name(name: &str) -> bool {
    name.parse::<Pragma>().is_ok()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(Pragma::Cipher.name(), "cipher");
        assert_eq!(Pragma::LegacyPageSize.name(), "legacy_page_size");
        assert_eq!(Pragma::KdfIter.name(), "kdf_iter");
        assert_eq!(Pragma::FastKdfIter.name(), "fast_kdf_iter");
        assert_eq!(Pragma::HmacSaltMask.name(), "hmac_salt_mask");
        assert_eq!(Pragma::PlaintextHeaderSize.name(), "plaintext_header_size");
        assert_eq!(Pragma::HexkeyMode.name(), "hexkey_mode");
        assert_eq!(Pragma::McUseSqlInterface.name(), "mc_use_sql_interface");
    }

    #[test]
    fn test_names_are_unique_and_parse_back() {
        let mut seen = std::collections::HashSet::new();
        for pragma in Pragma::iter() {
            assert!(seen.insert(pragma.name()), "duplicate {pragma}");
            assert_eq!(pragma.name().parse::<Pragma>().expect("parse"), pragma);
        }
    }

    #[test]
    fn test_order_excludes_key_slots() {
        assert!(CIPHER_PRAGMA_ORDER.iter().all(|p| !p.is_secret()));
        assert_eq!(CIPHER_PRAGMA_ORDER[0], Pragma::Cipher);
        assert_eq!(CIPHER_PRAGMA_ORDER[11], Pragma::PlaintextHeaderSize);
    }

    #[test]
    fn test_is_cipher_pragma_name() {
        assert!(is_cipher_pragma_name("kdf_iter"));
        assert!(is_cipher_pragma_name("key"));
        assert!(!is_cipher_pragma_name("journal_mode"));
        assert!(!is_cipher_pragma_name("KDF_ITER"));
    }
}
