//! Batch items handed to an operation by the host platform.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

/// Dynamic per-item property carrying the logical key of an upsert.
pub const PROP_KEY: &str = "key";
/// Dynamic per-item property carrying the TTL in seconds.
pub const PROP_TTL: &str = "ttl";
/// Dynamic per-item property selecting a single hash field.
pub const PROP_FIELD: &str = "field";

/// TTL sentinel meaning "no expiry".
pub const NO_EXPIRY: i64 = -1;

/// String-keyed dynamic properties attached to an item.
pub type DynamicProperties = BTreeMap<String, String>;

/// Tracking identifier correlating an input item with its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An item naming an object by id (get and delete batches).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectIdItem {
    pub id: ItemId,
    pub object_id: Option<String>,
    pub properties: DynamicProperties,
}

impl ObjectIdItem {
    pub fn new(id: ItemId, object_id: impl Into<String>) -> Self {
        Self {
            id,
            object_id: Some(object_id.into()),
            properties: DynamicProperties::new(),
        }
    }

    /// An item whose object id was not supplied.
    pub fn without_id(id: ItemId) -> Self {
        Self {
            id,
            object_id: None,
            properties: DynamicProperties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// The `field` selector, if present and non-empty.
    pub fn field(&self) -> Option<&str> {
        self.property(PROP_FIELD).filter(|f| !f.is_empty())
    }
}

/// An item carrying a document payload (upsert batches).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDataItem {
    pub id: ItemId,
    pub data: Bytes,
    pub properties: DynamicProperties,
}

impl ObjectDataItem {
    pub fn new(id: ItemId, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
            properties: DynamicProperties::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// The logical key from the `key` property.
    pub fn key(&self) -> Option<&str> {
        self.property(PROP_KEY)
    }

    /// The TTL from the `ttl` property.
    ///
    /// Absent or non-numeric values yield [`NO_EXPIRY`].
    pub fn ttl(&self) -> i64 {
        parse_ttl(self.property(PROP_TTL))
    }
}

/// Parse a raw TTL property, falling back to [`NO_EXPIRY`].
pub fn parse_ttl(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(NO_EXPIRY)
}
