//! Serde model of the object type descriptor document.

use serde::{Deserialize, Serialize};

use kvc_types::{ObjectTypeId, OperationType, Role};

use crate::error::{MetadataError, MetadataResult};

/// The root descriptor document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Resource name template with `{id}`, `{type}` and `{mode}` placeholders.
    pub operation_metadata_resource_format: String,
    pub object_types: Vec<ObjectTypeDecl>,
}

/// One declared object type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeDecl {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub supported_operations: Vec<OperationDecl>,
}

/// One operation supported by an object type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDecl {
    #[serde(rename = "type")]
    pub operation: OperationType,
    #[serde(default)]
    pub custom_type: Option<String>,
    #[serde(default)]
    pub has_input: bool,
    #[serde(default)]
    pub has_output: bool,
}

impl Descriptor {
    /// Parses a descriptor from JSON text.
    pub fn from_json(text: &str) -> MetadataResult<Self> {
        let descriptor: Descriptor =
            serde_json::from_str(text).map_err(|e| MetadataError::Descriptor(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> MetadataResult<()> {
        if self.operation_metadata_resource_format.trim().is_empty() {
            return Err(MetadataError::Descriptor(
                "operationMetadataResourceFormat is empty".into(),
            ));
        }
        let mut seen = Vec::with_capacity(self.object_types.len());
        for decl in &self.object_types {
            let id = decl.type_id()?;
            if seen.contains(&id) {
                return Err(MetadataError::Descriptor(format!(
                    "object type {id} is declared twice"
                )));
            }
            seen.push(id);
        }
        Ok(())
    }

    /// Expands the resource name template for one definition.
    ///
    /// The result is lower-cased, so `HashSet`/`UPSERT`/`input` becomes
    /// `hashset_upsert_input` under the default template.
    pub fn resource_name(&self, id: &str, operation: OperationType, role: Role) -> String {
        self.operation_metadata_resource_format
            .replace("{id}", id)
            .replace("{type}", operation.as_str())
            .replace("{mode}", role.value())
            .to_lowercase()
    }
}

impl ObjectTypeDecl {
    /// The object type this declaration describes.
    pub fn type_id(&self) -> MetadataResult<ObjectTypeId> {
        self.id.parse().map_err(|_| {
            MetadataError::Descriptor(format!("unsupported object type id: {}", self.id))
        })
    }
}

impl OperationDecl {
    /// Whether the declaration carries a flag for `role`.
    pub fn declares(&self, role: Role) -> bool {
        match role {
            Role::Input => self.has_input,
            Role::Output => self.has_output,
        }
    }
}
