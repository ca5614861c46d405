//! Connector configuration.
//!
//! The host platform exposes configuration as a flat string-keyed property
//! lookup ([`PropertySource`]). [`ConnectorConfig`] is the TOML-backed form
//! used by the command-line host.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};
use crate::key::KeyFormatter;

/// Semicolon-delimited node address list.
pub const HOSTS: &str = "hosts";
/// Prefix applied to every key.
pub const KEY_PREFIX: &str = "keyPrefix";
/// Report a get for an absent key as an application error.
pub const THROW_ON_NOT_FOUND: &str = "throwOnNotFound";

/// Flat string-keyed property lookup.
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<&str>;

    /// Boolean property; `true` in any case is true, everything else false.
    fn bool_property(&self, name: &str) -> bool {
        self.property(name)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl PropertySource for BTreeMap<String, String> {
    fn property(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Resolved connector properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorProperties {
    pub hosts: String,
    pub key_prefix: String,
    pub throw_on_not_found: bool,
}

impl ConnectorProperties {
    pub fn new(hosts: impl Into<String>) -> Self {
        Self {
            hosts: hosts.into(),
            key_prefix: String::new(),
            throw_on_not_found: false,
        }
    }

    /// Read properties from the host's property lookup.
    ///
    /// `hosts` is required; `keyPrefix` defaults to empty and
    /// `throwOnNotFound` to false.
    pub fn from_source(source: &dyn PropertySource) -> TypesResult<Self> {
        let hosts = source
            .property(HOSTS)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| TypesError::MissingProperty(HOSTS.into()))?;
        Ok(Self {
            hosts: hosts.to_string(),
            key_prefix: source.property(KEY_PREFIX).unwrap_or_default().to_string(),
            throw_on_not_found: source.bool_property(THROW_ON_NOT_FOUND),
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_throw_on_not_found(mut self, throw: bool) -> Self {
        self.throw_on_not_found = throw;
        self
    }

    pub fn key_formatter(&self) -> KeyFormatter {
        KeyFormatter::new(self.key_prefix.clone())
    }
}

/// File-backed connector configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub hosts: String,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default)]
    pub throw_on_not_found: bool,
    /// Directory searched for schema resources before the built-in set.
    #[serde(default)]
    pub metadata_dir: Option<PathBuf>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            hosts: "redis://127.0.0.1:6379".into(),
            key_prefix: String::new(),
            throw_on_not_found: false,
            metadata_dir: None,
        }
    }
}

impl ConnectorConfig {
    pub fn from_toml_str(s: &str) -> TypesResult<Self> {
        toml::from_str(s).map_err(|e| TypesError::ConfigParse(e.to_string()))
    }

    pub fn load(path: &Path) -> TypesResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TypesError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn properties(&self) -> ConnectorProperties {
        ConnectorProperties {
            hosts: self.hosts.clone(),
            key_prefix: self.key_prefix.clone(),
            throw_on_not_found: self.throw_on_not_found,
        }
    }
}
