use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{EntityId, ModelType, Name, SourceMap};

/// A named partition of the model.
///
/// `entity` indexes this namespace's entities by model type then `metaEdName`; the entities
/// themselves live in the environment's arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    pub namespace_name: Name,
    pub project_extension: String,
    pub project_name: String,
    pub project_version: String,
    pub is_extension: bool,
    /// Names of namespaces this namespace may reference, nearest first.
    pub dependencies: Vec<Name>,
    pub entity: BTreeMap<ModelType, BTreeMap<Name, EntityId>>,
    pub source_map: SourceMap,
}

impl Namespace {
    pub fn new(namespace_name: &str) -> Self {
        Self {
            namespace_name: namespace_name.to_string(),
            project_extension: String::new(),
            project_name: namespace_name.to_string(),
            project_version: String::new(),
            is_extension: false,
            dependencies: Vec::new(),
            entity: BTreeMap::new(),
            source_map: SourceMap::default(),
        }
    }

    pub fn extension(namespace_name: &str, project_extension: &str) -> Self {
        Self {
            project_extension: project_extension.to_string(),
            is_extension: true,
            ..Self::new(namespace_name)
        }
    }

    pub fn get(&self, model_type: ModelType, metaed_name: &str) -> Option<EntityId> {
        self.entity
            .get(&model_type)
            .and_then(|by_name| by_name.get(metaed_name))
            .copied()
    }

    /// Every entity id in this namespace, ordered by model type then name.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entity.values().flat_map(|by_name| by_name.values().copied())
    }

    pub fn entity_ids_of_type(&self, model_type: ModelType) -> impl Iterator<Item = EntityId> + '_ {
        self.entity
            .get(&model_type)
            .into_iter()
            .flat_map(|by_name| by_name.values().copied())
    }
}
