//! Property-bag form of a connection configuration.
//!
//! Hosts that move configuration around as string maps (connection-string
//! parsers, JSON files) use this form. Keys are the canonical
//! [`Pragma`](crate::pragma::Pragma) names plus the
//! [`CONFIG_CLASS_NAME`] marker.
//!
//! Detection of an encrypted configuration: a `key` entry always means
//! encrypted; otherwise the marker decides; otherwise the bag is a plain
//! configuration.

use std::collections::BTreeMap;

use crate::cipher::CipherAlgorithm;
use crate::config::{ConfigBuilder, McConfig, PlainConfig};
use crate::error::{Error, Result};
use crate::key::{HexKeyMode, KeyMaterial};
use crate::pragma::Pragma;

/// A flat string map of configuration entries.
pub type Properties = BTreeMap<String, String>;

/// Property naming the configuration family.
pub const CONFIG_CLASS_PROPERTY: &str = "config_class_name";

/// Value of [`CONFIG_CLASS_PROPERTY`] for encrypted configurations.
pub const CONFIG_CLASS_NAME: &str = "sqlite-mc";

/// A configuration recovered from a property bag.
#[derive(Debug, Clone)]
pub enum ConnectionConfig {
    /// No encryption; only general pragmas.
    Plain(PlainConfig),
    /// Encrypted with the given configuration.
    Encrypted(McConfig),
}

impl ConnectionConfig {
    /// Interprets a property bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProperty`] for malformed entries and the
    /// builder's validation errors for illegal parameter values.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let marked = properties
            .get(CONFIG_CLASS_PROPERTY)
            .is_some_and(|class| class == CONFIG_CLASS_NAME);
        if properties.contains_key(Pragma::Key.name()) || marked {
            return McConfig::from_properties(properties).map(Self::Encrypted);
        }
        let plain = properties
            .iter()
            .filter(|(name, _)| name.as_str() != CONFIG_CLASS_PROPERTY)
            .try_fold(PlainConfig::new(), |plain, (name, value)| {
                plain.with_pragma(name, value)
            })?;
        Ok(Self::Plain(plain))
    }

    /// Returns `true` for [`ConnectionConfig::Encrypted`].
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl McConfig {
    /// The property-bag form, including the class marker.
    ///
    /// Textual keys are written to both the `key` and `password` entries.
    /// The returned map holds key material in the clear.
    #[must_use]
    pub fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.insert(CONFIG_CLASS_PROPERTY.into(), CONFIG_CLASS_NAME.into());
        if let Some(cipher) = self.cipher() {
            properties.insert(Pragma::Cipher.name().into(), cipher.name().into());
        }
        for (pragma, value) in self.ordered_params() {
            properties.insert(pragma.name().into(), value.to_string());
        }
        if let Some(key) = self.key() {
            properties.insert(Pragma::Key.name().into(), key.expose().into());
            if key.mode() == HexKeyMode::None {
                properties.insert(Pragma::Password.name().into(), key.expose().into());
            }
            properties.insert(Pragma::HexkeyMode.name().into(), key.mode().to_string());
        }
        if self.uses_sql_interface() {
            properties.insert(Pragma::McUseSqlInterface.name().into(), "true".into());
        }
        for (name, value) in self.plain().pragmas() {
            properties.insert(name.into(), value.into());
        }
        properties
    }

    /// Rebuilds a configuration from its property-bag form, validating every
    /// entry through [`ConfigBuilder`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProperty`] for malformed entries and the
    /// builder's validation errors for illegal values.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut builder = ConfigBuilder::new();
        if let Some(cipher) = properties.get(Pragma::Cipher.name()) {
            builder = builder.set_cipher(CipherAlgorithm::resolve(cipher)?)?;
        }

        let mut mode = HexKeyMode::None;
        let mut key = None;
        let mut password = None;
        for (name, value) in properties {
            if name == CONFIG_CLASS_PROPERTY {
                continue;
            }
            let Ok(pragma) = name.parse::<Pragma>() else {
                builder = builder.with_pragma(name, value)?;
                continue;
            };
            match pragma {
                Pragma::Cipher => {}
                Pragma::Key => key = Some(value),
                Pragma::Password => password = Some(value),
                Pragma::HexkeyMode => {
                    mode = value.parse().map_err(|_| invalid(name, "unknown key mode"))?;
                }
                Pragma::McUseSqlInterface => {
                    builder = builder.use_sql_interface(parse_bool(name, value)?);
                }
                Pragma::Rekey => {
                    return Err(invalid(name, "rekey is applied to an open connection"));
                }
                _ => {
                    let parsed = value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| invalid(name, "expected an integer"))?;
                    builder = builder.set_param(pragma, parsed)?;
                }
            }
        }

        if let Some(directive) = key.or(password) {
            let material = match mode {
                HexKeyMode::None => KeyMaterial::passphrase(directive.as_str())?,
                HexKeyMode::Sse => KeyMaterial::hex(directive)?,
                HexKeyMode::SqlCipher => {
                    let checked = KeyMaterial::hex(directive)?;
                    KeyMaterial::from_parts(checked.expose(), HexKeyMode::SqlCipher)
                }
            };
            builder = builder.with_key_material(material);
        }
        Ok(builder.build())
    }
}

impl TryFrom<Properties> for McConfig {
    type Error = Error;

    fn try_from(properties: Properties) -> Result<Self> {
        Self::from_properties(&properties)
    }
}

impl From<McConfig> for Properties {
    fn from(config: McConfig) -> Self {
        config.to_properties()
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidProperty {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(invalid(name, "expected a boolean")),
    }
}
