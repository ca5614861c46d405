//! Sources for descriptor and schema resources.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use crate::error::{MetadataError, MetadataResult};

/// Reads named text resources.
///
/// `Ok(None)` means the resource does not exist; errors are reserved for
/// resources that exist but cannot be read.
pub trait ResourceSource: Send + Sync {
    fn read(&self, name: &str) -> MetadataResult<Option<String>>;
}

const EMBEDDED: &[(&str, &str)] = &[
    (
        "object-types.json",
        include_str!("../resources/object-types.json"),
    ),
    (
        "schemas/hashset_get_output.json",
        include_str!("../resources/schemas/hashset_get_output.json"),
    ),
    (
        "schemas/hashset_upsert_input.json",
        include_str!("../resources/schemas/hashset_upsert_input.json"),
    ),
    (
        "schemas/hashset_upsert_output.json",
        include_str!("../resources/schemas/hashset_upsert_output.json"),
    ),
];

/// Resources compiled into the crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    /// Names of every embedded resource.
    pub fn names() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(name, _)| *name)
    }
}

impl ResourceSource for EmbeddedResources {
    fn read(&self, name: &str) -> MetadataResult<Option<String>> {
        Ok(EMBEDDED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| (*text).to_string()))
    }
}

/// Resources read from files under a root directory.
#[derive(Clone, Debug)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        // Names never escape the root.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ResourceSource for DirectoryResources {
    fn read(&self, name: &str) -> MetadataResult<Option<String>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| MetadataError::Io {
                name: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Consults each layer in order; the first layer holding a name wins.
#[derive(Default)]
pub struct LayeredResources {
    layers: Vec<Box<dyn ResourceSource>>,
}

impl LayeredResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: impl ResourceSource + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl ResourceSource for LayeredResources {
    fn read(&self, name: &str) -> MetadataResult<Option<String>> {
        for layer in &self.layers {
            if let Some(text) = layer.read(name)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for LayeredResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredResources")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ResourceSource for HashMap<String, String> {
    fn read(&self, name: &str) -> MetadataResult<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

impl ResourceSource for BTreeMap<String, String> {
    fn read(&self, name: &str) -> MetadataResult<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_holds_descriptor() {
        let text = EmbeddedResources.read("object-types.json").unwrap().unwrap();
        assert!(text.contains("operationMetadataResourceFormat"));
        assert_eq!(EmbeddedResources.read("missing.json").unwrap(), None);
        assert!(EmbeddedResources::names().any(|n| n == "schemas/hashset_get_output.json"));
    }

    #[test]
    fn directory_reads_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("schemas")).unwrap();
        std::fs::write(dir.path().join("schemas/a.json"), "{}").unwrap();
        let source = DirectoryResources::new(dir.path());
        assert_eq!(source.read("schemas/a.json").unwrap().as_deref(), Some("{}"));
        assert_eq!(source.read("schemas/b.json").unwrap(), None);
    }

    #[test]
    fn directory_refuses_parent_components() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(dir.path().join("secret.json"), "{}").unwrap();
        let source = DirectoryResources::new(&inner);
        assert_eq!(source.read("../secret.json").unwrap(), None);
        assert_eq!(source.read("/etc/hostname").unwrap(), None);
    }

    #[test]
    fn directory_treats_directories_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("schemas")).unwrap();
        let source = DirectoryResources::new(dir.path());
        assert_eq!(source.read("schemas").unwrap(), None);
    }

    #[test]
    fn first_layer_wins() {
        let mut top = HashMap::new();
        top.insert("object-types.json".to_string(), "override".to_string());
        let layered = LayeredResources::new()
            .with_layer(top)
            .with_layer(EmbeddedResources);
        assert_eq!(layered.len(), 2);
        assert_eq!(
            layered.read("object-types.json").unwrap().as_deref(),
            Some("override")
        );
        assert!(layered
            .read("schemas/hashset_get_output.json")
            .unwrap()
            .is_some());
        assert_eq!(layered.read("nothing").unwrap(), None);
    }

    #[test]
    fn empty_layers_find_nothing() {
        let layered = LayeredResources::new();
        assert!(layered.is_empty());
        assert_eq!(layered.read("object-types.json").unwrap(), None);
    }
}
