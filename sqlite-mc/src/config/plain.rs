//! General (non-encryption) pragmas applied after the key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bootstrap::Directive;
use crate::error::{Error, Result};
use crate::pragma::is_cipher_pragma_name;
use crate::properties::CONFIG_CLASS_PROPERTY;

/// A set of general pragmas such as `journal_mode` or `foreign_keys`.
///
/// Names must be identifiers and values simple literals (digits, letters,
/// `_`, `-`, `.`), so nothing else can be smuggled into the SQL text.
/// Encryption parameter names and the property-bag class marker are
/// reserved and refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct PlainConfig {
    pragmas: BTreeMap<String, String>,
}

impl PlainConfig {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Crash-consistent settings: foreign keys on, WAL journal,
    /// `synchronous = FULL` and secure deletion of freed pages.
    ///
    /// The engine cannot rekey a database in WAL mode; switch the journal
    /// mode back before calling
    /// [`EncryptedConnection::rekey`](crate::EncryptedConnection::rekey).
    #[must_use]
    pub fn durable() -> Self {
        let pragmas = [
            ("foreign_keys", "ON"),
            ("journal_mode", "WAL"),
            ("synchronous", "FULL"),
            ("secure_delete", "ON"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
        Self { pragmas }
    }

    /// Adds or replaces a pragma.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProperty`] if the name is reserved or not an
    /// identifier, or the value is not a simple literal.
    pub fn with_pragma(mut self, name: &str, value: &str) -> Result<Self> {
        check_name(name)?;
        check_not_reserved(name)?;
        check_value(name, value)?;
        self.pragmas.insert(name.to_string(), value.to_string());
        Ok(self)
    }

    /// Value of a pragma, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pragmas.get(name).map(String::as_str)
    }

    /// Pragmas in name order.
    pub fn pragmas(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pragmas.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if no pragma is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pragmas.is_empty()
    }

    /// Directives for every pragma, in name order.
    #[must_use]
    pub fn directives(&self) -> Vec<Directive> {
        self.pragmas()
            .map(|(name, value)| Directive::public(name, format!("PRAGMA {name} = {value};")))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for PlainConfig {
    type Error = Error;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        map.iter()
            .try_fold(Self::new(), |config, (name, value)| config.with_pragma(name, value))
    }
}

impl From<PlainConfig> for BTreeMap<String, String> {
    fn from(config: PlainConfig) -> Self {
        config.pragmas
    }
}

fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProperty {
            name: name.to_string(),
            reason: "pragma name must be an identifier".into(),
        })
    }
}

fn check_not_reserved(name: &str) -> Result<()> {
    if is_cipher_pragma_name(name) {
        return Err(Error::InvalidProperty {
            name: name.to_string(),
            reason: "encryption parameters must be set through their typed setter".into(),
        });
    }
    if name == CONFIG_CLASS_PROPERTY {
        return Err(Error::InvalidProperty {
            name: name.to_string(),
            reason: "reserved for the property-bag class marker".into(),
        });
    }
    Ok(())
}

fn check_value(name: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProperty {
            name: name.to_string(),
            reason: format!("unsupported pragma value {value:?}"),
        })
    }
}
