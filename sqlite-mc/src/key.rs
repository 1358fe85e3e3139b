//! Key material normalization.
//!
//! Every way of supplying a key (passphrase, hex string, raw 32/48 byte key)
//! is normalized here into one canonical directive string plus a
//! [`HexKeyMode`] telling the bootstrap which `PRAGMA` consumes it. Doing this
//! at configuration time means bad key material is rejected at the call site,
//! before any file is touched.
//!
//! Key strings are held in [`SecretString`] and every SQL text built from
//! them is wrapped in [`Zeroizing`], so they are wiped from memory on drop.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumString};
use zeroize::Zeroizing;

use crate::cipher::{CipherAlgorithm, CipherCapabilities, RawKeyFormat};
use crate::error::{Error, Result};

/// Length in bytes of a raw key without salt.
pub const RAW_UNSALTED_KEY_LEN: usize = 32;
/// Length in bytes of a raw key followed by its 16 byte salt.
pub const RAW_SALTED_KEY_LEN: usize = 48;

/// How the engine must interpret the key slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HexKeyMode {
    /// Textual key, applied with `PRAGMA key`. Passphrases, `raw:` and
    /// `x'...'` directives all use this mode.
    #[default]
    None,
    /// Hex digits decoded by the engine, applied with `PRAGMA hexkey`.
    Sse,
    /// Hex digits wrapped as a `SQLCipher` blob literal, applied with
    /// `PRAGMA key = "x'...'"`.
    SqlCipher,
}

/// Normalized key material: a canonical directive string and its mode.
pub struct KeyMaterial {
    directive: SecretString,
    mode: HexKeyMode,
    raw: Option<RawKeyFormat>,
}

impl KeyMaterial {
    /// A textual key: a passphrase, or a pre-formatted engine directive such
    /// as `x'...'` or `raw:...`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] for an empty key or one containing
    /// a NUL byte.
    pub fn passphrase(key: impl Into<String>) -> Result<Self> {
        let key = Zeroizing::new(key.into());
        if key.is_empty() {
            return Err(Error::InvalidKeyEncoding("key must not be empty".into()));
        }
        if key.contains('\0') {
            return Err(Error::InvalidKeyEncoding("key must not contain NUL".into()));
        }
        Ok(Self::from_parts(key.as_str(), HexKeyMode::None))
    }

    /// A hex-encoded key, decoded by the engine itself (`PRAGMA hexkey`).
    ///
    /// The canonical form is lowercase; it is never hex-encoded a second time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] unless `hex_key` is a non-empty,
    /// even-length string of hex digits.
    pub fn hex(hex_key: &str) -> Result<Self> {
        if hex_key.is_empty() || !hex_key.len().is_multiple_of(2) {
            return Err(Error::InvalidKeyEncoding(format!(
                "hex key must have a non-zero even length (provided: {})",
                hex_key.len()
            )));
        }
        if !hex_key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidKeyEncoding(
                "hex key must only contain hex digits".into(),
            ));
        }
        let canonical = Zeroizing::new(hex_key.to_ascii_lowercase());
        Ok(Self::from_parts(canonical.as_str(), HexKeyMode::Sse))
    }

    /// Binary key material applied through `PRAGMA hexkey`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] for an empty key.
    pub fn hex_bytes(key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidKeyEncoding("key must not be empty".into()));
        }
        let encoded = Zeroizing::new(hex::encode(key));
        Ok(Self::from_parts(encoded.as_str(), HexKeyMode::Sse))
    }

    /// A raw 32 byte key that bypasses the KDF.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidKeyLength`] unless `key` is exactly 32 bytes.
    /// * [`Error::UnsupportedParameter`] if `cipher` has no raw key form.
    pub fn raw_unsalted(key: &[u8], cipher: CipherAlgorithm) -> Result<Self> {
        Self::raw(key, RAW_UNSALTED_KEY_LEN, cipher.capabilities())
    }

    /// A raw 32 byte key followed by its 16 byte database salt.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidKeyLength`] unless `key` is exactly 48 bytes.
    /// * [`Error::UnsupportedParameter`] if `cipher` has no raw key form.
    pub fn raw_salted(key: &[u8], cipher: CipherAlgorithm) -> Result<Self> {
        Self::raw(key, RAW_SALTED_KEY_LEN, cipher.capabilities())
    }

    /// Generates a random raw 32 byte key from the OS random source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Randomness`] if the random source fails, or
    /// [`Error::UnsupportedParameter`] if `cipher` has no raw key form.
    pub fn generate_raw_unsalted(cipher: CipherAlgorithm) -> Result<Self> {
        let mut key = Zeroizing::new([0u8; RAW_UNSALTED_KEY_LEN]);
        getrandom::fill(&mut key[..]).map_err(|e| Error::Randomness(e.to_string()))?;
        Self::raw_unsalted(&key[..], cipher)
    }

    fn raw(
        key: &[u8],
        expected: usize,
        capabilities: &CipherCapabilities,
    ) -> Result<Self> {
        if key.len() != expected {
            return Err(Error::InvalidKeyLength {
                expected,
                actual: key.len(),
            });
        }
        let encoded = Zeroizing::new(hex::encode(key));
        Self::raw_hex(&encoded, capabilities)
    }

    /// Wraps already hex-encoded raw key material. The hex length is checked
    /// again here so pre-hexed input of the wrong size cannot slip through.
    fn raw_hex(hex_key: &str, capabilities: &CipherCapabilities) -> Result<Self> {
        let format = capabilities
            .raw_key_format()
            .ok_or(Error::UnsupportedParameter {
                parameter: "raw key",
                cipher: capabilities.name(),
            })?;
        if hex_key.len() != 2 * RAW_UNSALTED_KEY_LEN && hex_key.len() != 2 * RAW_SALTED_KEY_LEN
        {
            return Err(Error::InvalidKeyEncoding(format!(
                "raw key must be exactly 64 or 96 hex chars long (provided: {})",
                hex_key.len()
            )));
        }
        let directive = Zeroizing::new(format.wrap(hex_key));
        Ok(Self {
            raw: Some(format),
            ..Self::from_parts(directive.as_str(), HexKeyMode::None)
        })
    }

    pub(crate) fn from_parts(directive: &str, mode: HexKeyMode) -> Self {
        Self {
            directive: SecretString::from(directive),
            mode,
            raw: None,
        }
    }

    /// The same key for use with `cipher`. A raw key is re-wrapped in the
    /// raw format of `cipher`; any other key is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] for a raw key when `cipher`
    /// has no raw key form.
    pub(crate) fn for_cipher(&self, cipher: CipherAlgorithm) -> Result<Self> {
        let capabilities = cipher.capabilities();
        match self.raw {
            Some(format) if capabilities.raw_key_format() != Some(format) => {
                let hex_key = format.unwrap_hex(self.expose()).ok_or_else(|| {
                    Error::InvalidKeyEncoding("malformed raw key directive".into())
                })?;
                Self::raw_hex(hex_key, capabilities)
            }
            _ => Ok(self.clone()),
        }
    }

    /// Raw key encoding of this key, if it was built from raw bytes.
    #[must_use]
    pub const fn raw_format(&self) -> Option<RawKeyFormat> {
        self.raw
    }

    /// The key-encoding mode.
    #[must_use]
    pub const fn mode(&self) -> HexKeyMode {
        self.mode
    }

    /// The canonical directive string. Treat as sensitive.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.directive.expose_secret()
    }

    /// SHA-256 over mode and directive, used to recognise the key a
    /// connection was confirmed with without keeping the key itself.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.mode.as_ref().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.expose().as_bytes());
        hasher.finalize().into()
    }

    /// The `PRAGMA` statement applying this key.
    #[must_use]
    pub fn key_sql(&self) -> Zeroizing<String> {
        self.pragma_sql("key", "hexkey")
    }

    /// The `PRAGMA` statement re-encrypting the database under this key.
    #[must_use]
    pub fn rekey_sql(&self) -> Zeroizing<String> {
        self.pragma_sql("rekey", "hexrekey")
    }

    fn pragma_sql(&self, text_pragma: &str, hex_pragma: &str) -> Zeroizing<String> {
        let escaped = Zeroizing::new(self.expose().replace('\'', "''"));
        Zeroizing::new(match self.mode {
            HexKeyMode::None => format!("PRAGMA {text_pragma} = '{}';", escaped.as_str()),
            HexKeyMode::Sse => format!("PRAGMA {hex_pragma} = '{}';", escaped.as_str()),
            HexKeyMode::SqlCipher => {
                format!("PRAGMA {text_pragma} = \"x'{}'\";", escaped.as_str())
            }
        })
    }
}

impl Clone for KeyMaterial {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw,
            ..Self::from_parts(self.expose(), self.mode)
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("directive", &"[REDACTED]")
            .field("mode", &self.mode)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    const UNSALTED_HEX: &str =
        "54686973206973206d792076657279207365637265742070617373776f72642e";
    const SALTED_HEX: &str = "54686973206973206d792076657279207365637265742070617373776f72642e2e73616c7479206b65792073616c742e";

    #[test_case(31, false)]
    #[test_case(32, true)]
    #[test_case(33, false)]
    #[test_case(48, false)]
    fn test_raw_unsalted_length(len: usize, ok: bool) {
        let result = KeyMaterial::raw_unsalted(&vec![0xAB; len], CipherAlgorithm::Chacha20);
        match result {
            Ok(_) => assert!(ok),
            Err(Error::InvalidKeyLength { expected, actual }) => {
                assert!(!ok);
                assert_eq!(expected, 32);
                assert_eq!(actual, len);
            }
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test_case(32, false)]
    #[test_case(47, false)]
    #[test_case(48, true)]
    #[test_case(49, false)]
    fn test_raw_salted_length(len: usize, ok: bool) {
        let result = KeyMaterial::raw_salted(&vec![0x01; len], CipherAlgorithm::SqlCipher);
        assert_eq!(result.is_ok(), ok);
    }

    #[test]
    fn test_raw_canonical_forms() {
        let bytes = hex::decode(UNSALTED_HEX).unwrap();
        let key = KeyMaterial::raw_unsalted(&bytes, CipherAlgorithm::Chacha20).unwrap();
        assert_eq!(key.expose(), format!("raw:{UNSALTED_HEX}"));
        assert_eq!(key.expose().len(), 4 + 64);
        assert_eq!(key.mode(), HexKeyMode::None);

        let bytes = hex::decode(SALTED_HEX).unwrap();
        let key = KeyMaterial::raw_salted(&bytes, CipherAlgorithm::Chacha20).unwrap();
        assert_eq!(key.expose(), format!("raw:{SALTED_HEX}"));
        assert_eq!(key.expose().len(), 4 + 96);

        let key = KeyMaterial::raw_salted(&bytes, CipherAlgorithm::SqlCipher).unwrap();
        assert_eq!(key.expose(), format!("x'{SALTED_HEX}'"));
    }

    #[test]
    fn test_raw_format_follows_cipher() {
        let key = KeyMaterial::raw_unsalted(&[0x11; 32], CipherAlgorithm::Chacha20).unwrap();
        assert_eq!(key.raw_format(), Some(RawKeyFormat::RawPrefix));
        let moved = key.for_cipher(CipherAlgorithm::SqlCipher).unwrap();
        assert_eq!(moved.raw_format(), Some(RawKeyFormat::HexLiteral));
        assert_eq!(moved.expose(), format!("x'{}'", "11".repeat(32)));
        assert_eq!(moved.clone().raw_format(), Some(RawKeyFormat::HexLiteral));
        assert!(key.for_cipher(CipherAlgorithm::Rc4).is_err());

        let text = KeyMaterial::passphrase("raw:abc").unwrap();
        assert_eq!(text.raw_format(), None);
        assert_eq!(text.for_cipher(CipherAlgorithm::Rc4).unwrap().expose(), "raw:abc");
    }

    #[test]
    fn test_raw_hex_double_check() {
        let caps = CipherAlgorithm::Chacha20.capabilities();
        assert!(matches!(
            KeyMaterial::raw_hex("abcd", caps),
            Err(Error::InvalidKeyEncoding(_))
        ));
        assert!(KeyMaterial::raw_hex(UNSALTED_HEX, caps).is_ok());
    }

    #[test]
    fn test_raw_key_unsupported_for_wx_ciphers() {
        let err = KeyMaterial::raw_unsalted(&[0u8; 32], CipherAlgorithm::Aes256Cbc)
            .expect_err("no raw form");
        assert!(matches!(err, Error::UnsupportedParameter { .. }));
    }

    #[test]
    fn test_hex_key_validation_and_mode() {
        let key = KeyMaterial::hex("ABCDEF01").unwrap();
        assert_eq!(key.expose(), "abcdef01");
        assert_eq!(key.mode(), HexKeyMode::Sse);
        assert!(KeyMaterial::hex("abc").is_err());
        assert!(KeyMaterial::hex("zz").is_err());
        assert!(KeyMaterial::hex("").is_err());

        let key = KeyMaterial::hex_bytes(&[0xde, 0xad]).unwrap();
        assert_eq!(key.expose(), "dead");
        assert_eq!(key.mode(), HexKeyMode::Sse);
    }

    #[test]
    fn test_key_sql_forms() {
        let key = KeyMaterial::passphrase("it's").unwrap();
        assert_eq!(key.key_sql().as_str(), "PRAGMA key = 'it''s';");
        assert_eq!(key.rekey_sql().as_str(), "PRAGMA rekey = 'it''s';");

        let key = KeyMaterial::hex("00ff").unwrap();
        assert_eq!(key.key_sql().as_str(), "PRAGMA hexkey = '00ff';");
        assert_eq!(key.rekey_sql().as_str(), "PRAGMA hexrekey = '00ff';");

        let key = KeyMaterial::from_parts("00ff", HexKeyMode::SqlCipher);
        assert_eq!(key.key_sql().as_str(), "PRAGMA key = \"x'00ff'\";");
    }

    #[test]
    fn test_passphrase_rejects_empty() {
        assert!(KeyMaterial::passphrase("").is_err());
        assert!(KeyMaterial::passphrase("a\0b").is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_mode_and_key() {
        let a = KeyMaterial::passphrase("00ff").unwrap();
        let b = KeyMaterial::hex("00ff").unwrap();
        let c = KeyMaterial::passphrase("00ff").unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = KeyMaterial::generate_raw_unsalted(CipherAlgorithm::Chacha20).unwrap();
        let b = KeyMaterial::generate_raw_unsalted(CipherAlgorithm::Chacha20).unwrap();
        assert_ne!(a.expose(), b.expose());
        assert!(a.expose().starts_with("raw:"));
    }

    #[test]
    fn test_debug_redacts() {
        let key = KeyMaterial::passphrase("hunter2").unwrap();
        assert!(!format!("{key:?}").contains("hunter2"));
    }

    #[test]
    fn test_hex_key_mode_names() {
        assert_eq!(HexKeyMode::None.to_string(), "NONE");
        assert_eq!("SSE".parse::<HexKeyMode>().unwrap(), HexKeyMode::Sse);
        assert_eq!("SQLCIPHER".parse::<HexKeyMode>().unwrap(), HexKeyMode::SqlCipher);
    }
}
