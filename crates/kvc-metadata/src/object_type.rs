//! Object types and their per-operation definitions.

use std::collections::HashMap;

use kvc_types::{ObjectTypeId, OperationType, Role};

use crate::error::{MetadataError, MetadataResult};

/// How a payload is presented to the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Json,
    Binary,
}

/// The shape of one input or output document.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaDescriptor {
    /// A JSON schema describing a structured document.
    Structured(serde_json::Value),
    /// Raw bytes with no declared structure.
    OpaqueBinary,
}

impl SchemaDescriptor {
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Self::Structured(_) => PayloadKind::Json,
            Self::OpaqueBinary => PayloadKind::Binary,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn schema(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(schema) => Some(schema),
            Self::OpaqueBinary => None,
        }
    }
}

/// A resolved definition for one role.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDefinition {
    pub role: Role,
    pub schema: SchemaDescriptor,
}

impl ObjectDefinition {
    pub fn payload_kind(&self) -> PayloadKind {
        self.schema.payload_kind()
    }
}

/// Lookup key for a definition: `lower("{operation}{customType}_{role}")`.
pub fn definition_key(operation: OperationType, custom_type: Option<&str>, role: Role) -> String {
    format!(
        "{}{}_{}",
        operation.as_str(),
        custom_type.unwrap_or_default(),
        role.value()
    )
    .to_lowercase()
}

/// A browsable object type with its registered definitions.
#[derive(Clone, Debug)]
pub struct ObjectType {
    id: ObjectTypeId,
    label: String,
    help_text: Option<String>,
    operations: Vec<OperationType>,
    definitions: HashMap<String, SchemaDescriptor>,
}

impl ObjectType {
    pub fn new(id: ObjectTypeId, label: impl Into<String>, help_text: Option<String>) -> Self {
        Self {
            id,
            label: label.into(),
            help_text,
            operations: Vec::new(),
            definitions: HashMap::new(),
        }
    }

    pub fn id(&self) -> ObjectTypeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    /// Declared operations in descriptor order.
    pub fn operations(&self) -> &[OperationType] {
        &self.operations
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub(crate) fn add_definition(
        &mut self,
        operation: OperationType,
        custom_type: Option<&str>,
        role: Role,
        schema: SchemaDescriptor,
    ) {
        if !self.operations.contains(&operation) {
            self.operations.push(operation);
        }
        self.definitions
            .insert(definition_key(operation, custom_type, role), schema);
    }

    /// Looks up the definition for an operation and role.
    pub fn definition(
        &self,
        operation: OperationType,
        custom_type: Option<&str>,
        role: Role,
    ) -> MetadataResult<&SchemaDescriptor> {
        self.definitions
            .get(&definition_key(operation, custom_type, role))
            .ok_or_else(|| MetadataError::DefinitionNotFound {
                id: self.id.to_string(),
                operation: operation.to_string(),
                role: role.value().to_string(),
            })
    }
}
