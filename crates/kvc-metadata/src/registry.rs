//! Descriptor-driven registry of object types.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use kvc_types::{OperationType, Role};

use crate::descriptor::Descriptor;
use crate::error::{MetadataError, MetadataResult};
use crate::object_type::{ObjectDefinition, ObjectType, SchemaDescriptor};
use crate::resources::ResourceSource;

/// Name of the descriptor resource.
pub const DESCRIPTOR_RESOURCE: &str = "object-types.json";

/// All object types known to a connector, in descriptor order.
#[derive(Clone, Debug)]
pub struct MetadataRegistry {
    types: Vec<ObjectType>,
}

impl MetadataRegistry {
    /// Reads the descriptor and every schema it points at from `source`.
    pub fn load(source: &dyn ResourceSource) -> MetadataResult<Self> {
        let text = source.read(DESCRIPTOR_RESOURCE)?.ok_or_else(|| {
            MetadataError::Descriptor(format!("resource {DESCRIPTOR_RESOURCE} not found"))
        })?;
        let descriptor = Descriptor::from_json(&text)?;
        Self::from_descriptor(&descriptor, source)
    }

    /// Builds the registry from a parsed descriptor.
    ///
    /// Each declared operation gets both roles. A role is structured when its
    /// flag is set and the templated resource exists, opaque binary otherwise.
    pub fn from_descriptor(
        descriptor: &Descriptor,
        source: &dyn ResourceSource,
    ) -> MetadataResult<Self> {
        let mut types = Vec::with_capacity(descriptor.object_types.len());
        for decl in &descriptor.object_types {
            let id = decl.type_id()?;
            let label = decl.label.clone().unwrap_or_else(|| decl.id.clone());
            let mut object_type = ObjectType::new(id, label, decl.help_text.clone());

            for op in &decl.supported_operations {
                for role in Role::BOTH {
                    let schema = if op.declares(role) {
                        let name = descriptor.resource_name(&decl.id, op.operation, role);
                        load_schema(source, &name)?
                    } else {
                        SchemaDescriptor::OpaqueBinary
                    };
                    debug!(
                        object_type = %id,
                        operation = %op.operation,
                        role = role.value(),
                        structured = schema.is_structured(),
                        "registered definition"
                    );
                    object_type.add_definition(op.operation, op.custom_type.as_deref(), role, schema);
                }
            }
            types.push(object_type);
        }
        info!(types = types.len(), "metadata registry loaded");
        Ok(Self { types })
    }

    /// Object types in descriptor order.
    pub fn list_types(&self) -> &[ObjectType] {
        &self.types
    }

    pub fn object_type(&self, id: &str) -> MetadataResult<&ObjectType> {
        self.types
            .iter()
            .find(|t| t.id().as_str() == id)
            .ok_or_else(|| MetadataError::UnknownObjectType(id.to_string()))
    }

    /// Resolves the schema for one object type, operation and role.
    pub fn resolve(
        &self,
        id: &str,
        operation: OperationType,
        custom_type: Option<&str>,
        role: Role,
    ) -> MetadataResult<&SchemaDescriptor> {
        self.object_type(id)?.definition(operation, custom_type, role)
    }

    /// Resolves definitions for each requested role, in request order.
    pub fn object_definitions(
        &self,
        id: &str,
        operation: OperationType,
        custom_type: Option<&str>,
        roles: &[Role],
    ) -> MetadataResult<Vec<ObjectDefinition>> {
        let object_type = self.object_type(id)?;
        roles
            .iter()
            .map(|&role| {
                Ok(ObjectDefinition {
                    role,
                    schema: object_type.definition(operation, custom_type, role)?.clone(),
                })
            })
            .collect()
    }
}

fn load_schema(source: &dyn ResourceSource, name: &str) -> MetadataResult<SchemaDescriptor> {
    match source.read(name)? {
        Some(text) => serde_json::from_str(&text)
            .map(SchemaDescriptor::Structured)
            .map_err(|e| MetadataError::Schema {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(SchemaDescriptor::OpaqueBinary),
    }
}

/// Loads a registry on first access and shares it afterwards.
///
/// A failed load is remembered and returned to every later caller.
pub struct RegistryCell {
    source: Box<dyn ResourceSource>,
    cell: OnceLock<MetadataResult<Arc<MetadataRegistry>>>,
}

impl RegistryCell {
    pub fn new(source: impl ResourceSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn ResourceSource>) -> Self {
        Self {
            source,
            cell: OnceLock::new(),
        }
    }

    pub fn get_or_load(&self) -> MetadataResult<Arc<MetadataRegistry>> {
        self.cell
            .get_or_init(|| MetadataRegistry::load(self.source.as_ref()).map(Arc::new))
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl std::fmt::Debug for RegistryCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCell")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kvc_types::ObjectTypeId;

    use super::*;
    use crate::object_type::PayloadKind;
    use crate::resources::{DirectoryResources, EmbeddedResources, LayeredResources};

    fn embedded() -> MetadataRegistry {
        MetadataRegistry::load(&EmbeddedResources).unwrap()
    }

    // --- Embedded descriptor ---

    #[test]
    fn lists_both_types_in_order() {
        let registry = embedded();
        let ids: Vec<_> = registry.list_types().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![ObjectTypeId::String, ObjectTypeId::HashSet]);
        for t in registry.list_types() {
            assert_eq!(
                t.operations(),
                &[OperationType::Get, OperationType::Upsert, OperationType::Delete]
            );
            assert_eq!(t.definition_count(), 6);
        }
    }

    #[test]
    fn string_definitions_are_binary() {
        let registry = embedded();
        for op in [OperationType::Get, OperationType::Upsert, OperationType::Delete] {
            for role in Role::BOTH {
                let schema = registry.resolve("String", op, None, role).unwrap();
                assert_eq!(schema.payload_kind(), PayloadKind::Binary);
            }
        }
    }

    #[test]
    fn hashset_structured_where_declared() {
        let registry = embedded();
        let kind = |op, role| {
            registry
                .resolve("HashSet", op, None, role)
                .unwrap()
                .payload_kind()
        };
        assert_eq!(kind(OperationType::Get, Role::Output), PayloadKind::Json);
        assert_eq!(kind(OperationType::Upsert, Role::Input), PayloadKind::Json);
        assert_eq!(kind(OperationType::Upsert, Role::Output), PayloadKind::Json);
        // Undeclared roles are still registered.
        assert_eq!(kind(OperationType::Get, Role::Input), PayloadKind::Binary);
        assert_eq!(kind(OperationType::Delete, Role::Input), PayloadKind::Binary);
        assert_eq!(kind(OperationType::Delete, Role::Output), PayloadKind::Binary);
    }

    #[test]
    fn unknown_type_and_operation() {
        let registry = embedded();
        assert_eq!(
            registry
                .resolve("SortedSet", OperationType::Get, None, Role::Output)
                .unwrap_err(),
            MetadataError::UnknownObjectType("SortedSet".into())
        );
        assert!(matches!(
            registry.resolve("String", OperationType::Execute, Some("x"), Role::Input),
            Err(MetadataError::DefinitionNotFound { .. })
        ));
    }

    #[test]
    fn object_definitions_follow_role_order() {
        let registry = embedded();
        let defs = registry
            .object_definitions(
                "HashSet",
                OperationType::Upsert,
                None,
                &[Role::Output, Role::Input],
            )
            .unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].role, Role::Output);
        assert_eq!(defs[1].role, Role::Input);
        assert!(defs.iter().all(|d| d.payload_kind() == PayloadKind::Json));
    }

    // --- Alternate sources ---

    #[test]
    fn missing_descriptor_is_an_error() {
        let empty: HashMap<String, String> = HashMap::new();
        assert!(matches!(
            MetadataRegistry::load(&empty),
            Err(MetadataError::Descriptor(_))
        ));
    }

    #[test]
    fn declared_but_absent_schema_falls_back_to_binary() {
        let mut source = HashMap::new();
        source.insert(
            DESCRIPTOR_RESOURCE.to_string(),
            r#"{
                "operationMetadataResourceFormat": "{id}_{type}_{mode}.json",
                "objectTypes": [ { "id": "HashSet", "supportedOperations": [
                    { "type": "GET", "hasOutput": true }
                ] } ]
            }"#
            .to_string(),
        );
        let registry = MetadataRegistry::load(&source).unwrap();
        let schema = registry
            .resolve("HashSet", OperationType::Get, None, Role::Output)
            .unwrap();
        assert_eq!(schema, &SchemaDescriptor::OpaqueBinary);
        assert_eq!(registry.list_types()[0].label(), "HashSet");
    }

    #[test]
    fn malformed_schema_is_an_error() {
        let mut source = HashMap::new();
        source.insert(
            DESCRIPTOR_RESOURCE.to_string(),
            r#"{
                "operationMetadataResourceFormat": "{id}_{type}_{mode}.json",
                "objectTypes": [ { "id": "String", "supportedOperations": [
                    { "type": "UPSERT", "hasInput": true }
                ] } ]
            }"#
            .to_string(),
        );
        source.insert("string_upsert_input.json".to_string(), "{ nope".to_string());
        assert!(matches!(
            MetadataRegistry::load(&source),
            Err(MetadataError::Schema { name, .. }) if name == "string_upsert_input.json"
        ));
    }

    #[test]
    fn directory_overrides_embedded_schema() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("schemas")).unwrap();
        std::fs::write(
            dir.path().join("schemas/hashset_get_output.json"),
            r#"{"title": "custom"}"#,
        )
        .unwrap();
        let source = LayeredResources::new()
            .with_layer(DirectoryResources::new(dir.path()))
            .with_layer(EmbeddedResources);
        let registry = MetadataRegistry::load(&source).unwrap();
        let schema = registry
            .resolve("HashSet", OperationType::Get, None, Role::Output)
            .unwrap();
        assert_eq!(schema.schema().unwrap()["title"], "custom");
    }

    // --- RegistryCell ---

    struct CountingSource {
        reads: Arc<AtomicUsize>,
    }

    impl ResourceSource for CountingSource {
        fn read(&self, name: &str) -> MetadataResult<Option<String>> {
            if name == DESCRIPTOR_RESOURCE {
                self.reads.fetch_add(1, Ordering::SeqCst);
            }
            EmbeddedResources.read(name)
        }
    }

    #[test]
    fn cell_loads_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let cell = RegistryCell::new(CountingSource {
            reads: Arc::clone(&reads),
        });
        assert!(!cell.is_loaded());
        let a = cell.get_or_load().unwrap();
        let b = cell.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(cell.is_loaded());
    }

    #[test]
    fn cell_loads_once_across_threads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let cell = Arc::new(RegistryCell::new(CountingSource {
            reads: Arc::clone(&reads),
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.get_or_load().unwrap().list_types().len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2);
        }
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cell_remembers_failure() {
        let cell = RegistryCell::new(HashMap::<String, String>::new());
        assert!(cell.get_or_load().is_err());
        assert!(cell.get_or_load().is_err());
        assert!(format!("{cell:?}").contains("loaded: true"));
    }
}
