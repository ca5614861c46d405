//! Object type and schema metadata for the key-value connector.
//!
//! A declarative descriptor lists the supported object types and, per type,
//! the supported operations. For every declared operation the registry
//! attaches an input and an output definition: a structured JSON schema when
//! a resource named by the descriptor's template exists, otherwise an opaque
//! binary marker.
//!
//! # Modules
//!
//! - [`descriptor`] -- Serde model of the descriptor document
//! - [`resources`] -- Where descriptor and schema resources are read from
//! - [`object_type`] -- [`ObjectType`] and its per-operation definitions
//! - [`registry`] -- [`MetadataRegistry`] lookups and the load-once [`RegistryCell`]

pub mod descriptor;
pub mod error;
pub mod object_type;
pub mod registry;
pub mod resources;

pub use descriptor::{Descriptor, ObjectTypeDecl, OperationDecl};
pub use error::{MetadataError, MetadataResult};
pub use object_type::{ObjectDefinition, ObjectType, PayloadKind, SchemaDescriptor};
pub use registry::{MetadataRegistry, RegistryCell, DESCRIPTOR_RESOURCE};
pub use resources::{DirectoryResources, EmbeddedResources, LayeredResources, ResourceSource};
