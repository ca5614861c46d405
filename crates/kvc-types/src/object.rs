//! Object type and operation vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// A logical data shape exposed to the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectTypeId {
    /// An opaque UTF-8 string value.
    String,
    /// A field/value hash map.
    HashSet,
}

impl ObjectTypeId {
    /// All supported object types.
    pub const ALL: [ObjectTypeId; 2] = [ObjectTypeId::String, ObjectTypeId::HashSet];

    /// The identifier used by the host platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::HashSet => "HashSet",
        }
    }
}

impl fmt::Display for ObjectTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectTypeId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "String" => Ok(Self::String),
            "HashSet" => Ok(Self::HashSet),
            other => Err(TypesError::UnsupportedObjectType(other.to_string())),
        }
    }
}

/// Operation type as declared in the metadata descriptor.
///
/// `Execute` is the only type that carries a custom subtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Get,
    Upsert,
    Delete,
    Execute,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
            Self::Execute => "EXECUTE",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "UPSERT" => Ok(Self::Upsert),
            "DELETE" => Ok(Self::Delete),
            "EXECUTE" => Ok(Self::Execute),
            _ => Err(TypesError::UnknownOperation(s.to_string())),
        }
    }
}

/// A CRUD data verb routed to a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Upsert,
    Delete,
}

impl Verb {
    /// The descriptor operation type this verb corresponds to.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Get => OperationType::Get,
            Self::Upsert => OperationType::Upsert,
            Self::Delete => OperationType::Delete,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "Get",
            Self::Upsert => "Upsert",
            Self::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Which side of an operation a schema applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
}

impl Role {
    pub const BOTH: [Role; 2] = [Role::Input, Role::Output];

    /// Lower-case role name used in resource and definition keys.
    pub fn value(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Role {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            _ => Err(TypesError::UnknownOperation(format!("role {s}"))),
        }
    }
}
