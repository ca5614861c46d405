//! HashSet document codec.
//!
//! A HashSet travels to and from the host as
//! `{"HashSet": [{"ID": "<field>", "Value": "<value>"}, ...]}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("ID is a required field")]
    MissingId,

    #[error("HashSet document has no entries")]
    Empty,

    #[error("{0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(rename = "HashSet")]
    entries: Vec<Entry>,
}

#[derive(Serialize, Deserialize)]
struct Entry {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

/// Decodes a document into field/value pairs.
///
/// A later entry with the same `ID` replaces an earlier one.
pub fn decode(data: &[u8]) -> Result<BTreeMap<String, String>, DocumentError> {
    let document: Document =
        serde_json::from_slice(data).map_err(|e| DocumentError::Malformed(e.to_string()))?;
    if document.entries.is_empty() {
        return Err(DocumentError::Empty);
    }
    let mut fields = BTreeMap::new();
    for entry in document.entries {
        let id = entry
            .id
            .filter(|id| !id.is_empty())
            .ok_or(DocumentError::MissingId)?;
        fields.insert(id, entry.value.unwrap_or_default());
    }
    Ok(fields)
}

/// Encodes field/value pairs, one entry per field in field order.
pub fn encode(fields: &BTreeMap<String, String>) -> String {
    let document = Document {
        entries: fields
            .iter()
            .map(|(id, value)| Entry {
                id: Some(id.clone()),
                value: Some(value.clone()),
            })
            .collect(),
    };
    // Serializing plain strings cannot fail.
    serde_json::to_string(&document).unwrap_or_default()
}
