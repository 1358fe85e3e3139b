//! Configuration builder and the immutable configuration it produces.
//!
//! [`ConfigBuilder`] validates every value against the capability table of
//! the selected cipher as it is set. [`ConfigBuilder::build`] copies the
//! accumulated values into an [`McConfig`], which is immutable and can be
//! reused for any number of opens. Builders for the historical on-disk
//! formats live in [`presets`].

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::bootstrap::Directive;
use crate::cipher::{
    CipherAlgorithm, CipherCapabilities, HmacAlgorithm, HmacPgno, KdfAlgorithm, GENERIC,
};
use crate::error::{Error, Result};
use crate::key::KeyMaterial;
use crate::pragma::{Pragma, CIPHER_PRAGMA_ORDER};

mod plain;
pub mod presets;

pub use plain::PlainConfig;

/// Accumulates and validates cipher parameters and key material.
///
/// Setters consume the builder and fail at the call site on illegal values;
/// nothing is clamped.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    cipher: Option<CipherAlgorithm>,
    params: BTreeMap<Pragma, i64>,
    key: Option<KeyMaterial>,
    use_sql_interface: bool,
    plain: PlainConfig,
}

impl ConfigBuilder {
    /// A builder with no cipher selected. Values are checked against the
    /// union of all cipher tables until a cipher is chosen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with `cipher` already selected.
    #[must_use]
    pub fn for_cipher(cipher: CipherAlgorithm) -> Self {
        Self {
            cipher: Some(cipher),
            ..Self::default()
        }
    }

    /// Builds from trusted preset literals without re-validating them.
    pub(crate) fn from_preset(cipher: CipherAlgorithm, values: &[(Pragma, i64)]) -> Self {
        Self {
            cipher: Some(cipher),
            params: values.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// The rule set currently in force.
    #[must_use]
    pub fn capabilities(&self) -> &'static CipherCapabilities {
        self.cipher.map_or(&GENERIC, CipherAlgorithm::capabilities)
    }

    /// Selects the cipher suite. Values set earlier are checked again under
    /// the new cipher's rules, and a raw key set earlier is re-wrapped in the
    /// new cipher's raw key format.
    ///
    /// # Errors
    ///
    /// Returns the first validation error of an already set value that the
    /// new cipher does not accept, or [`Error::UnsupportedParameter`] if a
    /// raw key is set and the new cipher has no raw key form.
    pub fn set_cipher(mut self, cipher: CipherAlgorithm) -> Result<Self> {
        let capabilities = cipher.capabilities();
        for (&pragma, &value) in &self.params {
            capabilities.validate(pragma, value)?;
        }
        self.key = self
            .key
            .as_ref()
            .map(|key| key.for_cipher(cipher))
            .transpose()?;
        self.cipher = Some(cipher);
        Ok(self)
    }

    pub(crate) fn set_param(mut self, pragma: Pragma, value: i64) -> Result<Self> {
        self.capabilities().validate(pragma, value)?;
        self.params.insert(pragma, value);
        Ok(self)
    }

    /// Sets the on-disk format variant of the cipher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] when out of range for the cipher.
    pub fn set_legacy(self, legacy: i64) -> Result<Self> {
        self.set_param(Pragma::Legacy, legacy)
    }

    /// Sets the page size used by legacy formats (0 lets the engine decide).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] outside `0..=65536`, or
    /// [`Error::NotPowerOfTwo`] for non-zero values that are not a power of two.
    pub fn set_legacy_page_size(self, page_size: i64) -> Result<Self> {
        self.set_param(Pragma::LegacyPageSize, page_size)
    }

    /// Sets the KDF iteration count of the page key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] or [`Error::UnsupportedParameter`].
    pub fn set_kdf_iter(self, iterations: i64) -> Result<Self> {
        self.set_param(Pragma::KdfIter, iterations)
    }

    /// Sets the KDF iteration count of the HMAC key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] or [`Error::UnsupportedParameter`].
    pub fn set_fast_kdf_iter(self, iterations: i64) -> Result<Self> {
        self.set_param(Pragma::FastKdfIter, iterations)
    }

    /// Sets the KDF hash algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] if the cipher has no KDF choice.
    pub fn set_kdf_algorithm(self, algorithm: KdfAlgorithm) -> Result<Self> {
        self.set_param(Pragma::KdfAlgorithm, algorithm.ordinal())
    }

    /// Enables or disables page HMACs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] if the cipher has no HMAC.
    pub fn set_hmac_use(self, enabled: bool) -> Result<Self> {
        self.set_param(Pragma::HmacUse, i64::from(enabled))
    }

    /// Sets the HMAC hash algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] if the cipher has no HMAC.
    pub fn set_hmac_algorithm(self, algorithm: HmacAlgorithm) -> Result<Self> {
        self.set_param(Pragma::HmacAlgorithm, algorithm.ordinal())
    }

    /// Sets the salt mask used to derive the HMAC key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] if the cipher has no HMAC.
    pub fn set_hmac_salt_mask(self, mask: u8) -> Result<Self> {
        self.set_param(Pragma::HmacSaltMask, i64::from(mask))
    }

    /// Sets the byte order of the page number fed to the HMAC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedParameter`] if the cipher has no HMAC.
    pub fn set_hmac_pgno(self, pgno: HmacPgno) -> Result<Self> {
        self.set_param(Pragma::HmacPgno, pgno.ordinal())
    }

    /// Enables or disables HMAC verification on read.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in ciphers; kept fallible like every setter.
    pub fn set_hmac_check(self, enabled: bool) -> Result<Self> {
        self.set_param(Pragma::HmacCheck, i64::from(enabled))
    }

    /// Sets how many bytes of page 1 stay unencrypted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] outside `0..=100`,
    /// [`Error::MisalignedParameter`] if not a multiple of 16, or
    /// [`Error::UnsupportedParameter`].
    pub fn set_plaintext_header_size(self, size: i64) -> Result<Self> {
        self.set_param(Pragma::PlaintextHeaderSize, size)
    }

    /// Applies cipher parameters through `sqlite3mc_config()` instead of
    /// per-parameter `PRAGMA` statements.
    #[must_use]
    pub const fn use_sql_interface(mut self, enabled: bool) -> Self {
        self.use_sql_interface = enabled;
        self
    }

    /// Sets a passphrase (or pre-formatted textual key directive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] for an empty key.
    pub fn with_key(self, key: &str) -> Result<Self> {
        Ok(self.with_key_material(KeyMaterial::passphrase(key)?))
    }

    /// Sets a hex key, decoded by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] for malformed hex.
    pub fn with_hex_key(self, hex_key: &str) -> Result<Self> {
        Ok(self.with_key_material(KeyMaterial::hex(hex_key)?))
    }

    /// Sets binary key material, hex-encoded for the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyEncoding`] for an empty key.
    pub fn with_hex_key_bytes(self, key: &[u8]) -> Result<Self> {
        Ok(self.with_key_material(KeyMaterial::hex_bytes(key)?))
    }

    /// Sets a raw 32 byte key, tagged for the selected cipher (or the engine
    /// default when none is selected yet).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] or [`Error::UnsupportedParameter`].
    pub fn with_raw_unsalted_key(self, key: &[u8]) -> Result<Self> {
        let cipher = self.effective_cipher();
        Ok(self.with_key_material(KeyMaterial::raw_unsalted(key, cipher)?))
    }

    /// Sets a raw 32 byte key followed by its 16 byte salt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] or [`Error::UnsupportedParameter`].
    pub fn with_raw_salted_key(self, key: &[u8]) -> Result<Self> {
        let cipher = self.effective_cipher();
        Ok(self.with_key_material(KeyMaterial::raw_salted(key, cipher)?))
    }

    /// Sets already normalized key material.
    #[must_use]
    pub fn with_key_material(mut self, key: KeyMaterial) -> Self {
        self.key = Some(key);
        self
    }

    /// Adds a general pragma applied after the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProperty`] for encryption parameter names
    /// (they have typed setters) and for names or values that are not plain
    /// identifiers or literals.
    pub fn with_pragma(mut self, name: &str, value: &str) -> Result<Self> {
        self.plain = self.plain.with_pragma(name, value)?;
        Ok(self)
    }

    /// Replaces all general pragmas at once.
    #[must_use]
    pub fn with_plain(mut self, plain: PlainConfig) -> Self {
        self.plain = plain;
        self
    }

    fn effective_cipher(&self) -> CipherAlgorithm {
        self.cipher.unwrap_or(CipherAlgorithm::ENGINE_DEFAULT)
    }

    /// Copies the accumulated state into an immutable configuration. The
    /// builder stays usable and later changes do not reach the result.
    #[must_use]
    pub fn build(&self) -> McConfig {
        McConfig {
            cipher: self.cipher,
            params: self.params.clone(),
            key: self.key.clone(),
            use_sql_interface: self.use_sql_interface,
            plain: self.plain.clone(),
        }
    }
}

/// An immutable, validated encryption configuration.
///
/// Serializes as its property-bag form (see
/// [`McConfig::to_properties`]); note that this form carries the key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "crate::properties::Properties", into = "crate::properties::Properties")]
pub struct McConfig {
    cipher: Option<CipherAlgorithm>,
    params: BTreeMap<Pragma, i64>,
    key: Option<KeyMaterial>,
    use_sql_interface: bool,
    plain: PlainConfig,
}

impl McConfig {
    /// Selected cipher, if any.
    #[must_use]
    pub const fn cipher(&self) -> Option<CipherAlgorithm> {
        self.cipher
    }

    /// Value of a cipher parameter, if set.
    #[must_use]
    pub fn get(&self, pragma: Pragma) -> Option<i64> {
        self.params.get(&pragma).copied()
    }

    /// Key material, if set.
    #[must_use]
    pub const fn key(&self) -> Option<&KeyMaterial> {
        self.key.as_ref()
    }

    /// Whether parameters go through `sqlite3mc_config()`.
    #[must_use]
    pub const fn uses_sql_interface(&self) -> bool {
        self.use_sql_interface
    }

    /// General pragmas applied after the key.
    #[must_use]
    pub const fn plain(&self) -> &PlainConfig {
        &self.plain
    }

    /// The same configuration with `key` in place of the current key, for
    /// opening the database after a rekey.
    #[must_use]
    pub fn with_rekeyed(&self, key: KeyMaterial) -> Self {
        Self {
            key: Some(key),
            ..self.clone()
        }
    }

    /// Cipher parameters in application order, with their wire values.
    pub(crate) fn ordered_params(&self) -> impl Iterator<Item = (Pragma, i64)> + '_ {
        CIPHER_PRAGMA_ORDER
            .iter()
            .filter_map(|pragma| self.get(*pragma).map(|value| (*pragma, value)))
    }

    /// SHA-256 over the cipher and its parameters, identifying the page
    /// format a connection was keyed under. The delivery mode and the key
    /// are not part of it.
    #[must_use]
    pub fn parameter_fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.cipher.map_or("", CipherAlgorithm::name).as_bytes());
        for (pragma, value) in self.ordered_params() {
            hasher.update([0u8]);
            hasher.update(pragma.name().as_bytes());
            hasher.update(value.to_le_bytes());
        }
        hasher.finalize().into()
    }

    /// The ordered directive list the bootstrap applies: cipher parameters,
    /// then the key, then general pragmas.
    #[must_use]
    pub fn directives(&self) -> Vec<Directive> {
        let mut directives = Vec::new();
        if self.use_sql_interface {
            let cipher = self.effective_cipher_name();
            if let Some(selected) = self.cipher {
                directives.push(Directive::public(
                    Pragma::Cipher.name(),
                    format!(
                        "SELECT sqlite3mc_config('default:cipher', '{}');",
                        selected.name()
                    ),
                ));
            }
            for (pragma, value) in self.ordered_params() {
                directives.push(Directive::public(
                    pragma.name(),
                    format!(
                        "SELECT sqlite3mc_config('{cipher}', 'default:{}', {value});",
                        pragma.name()
                    ),
                ));
            }
        } else {
            if let Some(selected) = self.cipher {
                directives.push(Directive::public(
                    Pragma::Cipher.name(),
                    format!("PRAGMA cipher = {};", selected.name()),
                ));
            }
            for (pragma, value) in self.ordered_params() {
                directives.push(Directive::public(
                    pragma.name(),
                    format!("PRAGMA {} = {value};", pragma.name()),
                ));
            }
        }
        if let Some(key) = &self.key {
            directives.push(Directive::secret(Pragma::Key.name(), key.key_sql()));
        }
        directives.extend(self.plain.directives());
        directives
    }

    fn effective_cipher_name(&self) -> &'static str {
        self.cipher
            .unwrap_or(CipherAlgorithm::ENGINE_DEFAULT)
            .name()
    }
}

#[cfg(test)]
mod tests;
