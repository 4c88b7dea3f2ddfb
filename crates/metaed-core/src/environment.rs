//! `MetaEdEnvironment`: the entity arena, namespace repository and plugin environments.
//!
//! Fields are public so enhancers can borrow the arena and a plugin environment at the
//! same time (`let MetaEdEnvironment { entities, plugin, .. } = metaed;`).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

use crate::model::{Entity, EntityId, ModelType, Namespace};
use crate::plugin::{DataSlotError, PluginEnvironment};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("duplicate {model_type} named {metaed_name} in namespace {namespace}")]
    DuplicateEntity {
        namespace: String,
        model_type: ModelType,
        metaed_name: String,
        existing: EntityId,
    },
    #[error("unknown namespace {0}")]
    UnknownNamespace(String),
}

#[derive(Debug, Default)]
pub struct MetaEdEnvironment {
    pub data_standard_version: String,
    pub namespace: BTreeMap<String, Namespace>,
    pub entities: Vec<Entity>,
    pub plugin: BTreeMap<String, PluginEnvironment>,
}

impl MetaEdEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    pub fn add_namespace(&mut self, namespace: Namespace) {
        self.namespace
            .insert(namespace.namespace_name.clone(), namespace);
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespace.get(name)
    }

    /// The namespace followed by its transitive dependencies, breadth-first, nearest first.
    pub fn namespace_chain(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(namespace) = self.namespace.get(&current) {
                queue.extend(namespace.dependencies.iter().cloned());
                chain.push(current);
            }
        }
        chain
    }

    // ========================================================================
    // Entities
    // ========================================================================

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    pub fn try_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Inserts an entity into the arena and its namespace index.
    ///
    /// A name already used by the same model type in the namespace is rejected; the
    /// existing entity is left untouched.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId, RepositoryError> {
        let next_id = EntityId(self.entities.len() as u32);
        let namespace = self
            .namespace
            .get_mut(&entity.namespace)
            .ok_or_else(|| RepositoryError::UnknownNamespace(entity.namespace.clone()))?;
        let by_name = namespace.entity.entry(entity.model_type).or_default();
        if let Some(existing) = by_name.get(&entity.metaed_name) {
            return Err(RepositoryError::DuplicateEntity {
                namespace: entity.namespace.clone(),
                model_type: entity.model_type,
                metaed_name: entity.metaed_name.clone(),
                existing: *existing,
            });
        }
        by_name.insert(entity.metaed_name.clone(), next_id);
        entity.id = next_id;
        self.entities.push(entity);
        Ok(next_id)
    }

    pub fn get_entity(
        &self,
        namespace: &str,
        model_type: ModelType,
        metaed_name: &str,
    ) -> Option<EntityId> {
        self.namespace
            .get(namespace)
            .and_then(|ns| ns.get(model_type, metaed_name))
    }

    /// Looks up `metaed_name` under any of `model_types` in one namespace.
    pub fn get_entity_from_namespace(
        &self,
        namespace: &str,
        metaed_name: &str,
        model_types: &[ModelType],
    ) -> Option<EntityId> {
        model_types
            .iter()
            .find_map(|ty| self.get_entity(namespace, *ty, metaed_name))
    }

    /// Looks up `metaed_name` in the namespace, then in its dependency chain.
    pub fn get_entity_from_namespace_chain(
        &self,
        namespace: &str,
        metaed_name: &str,
        model_types: &[ModelType],
    ) -> Option<EntityId> {
        self.namespace_chain(namespace)
            .iter()
            .find_map(|ns| self.get_entity_from_namespace(ns, metaed_name, model_types))
    }

    /// Prefers an extension of `base` visible from `namespace` over `base` itself.
    ///
    /// Extensions are searched nearest namespace first, so an extension declared in the
    /// requesting namespace wins over one declared further down the chain.
    pub fn get_most_derived_entity(&self, namespace: &str, base: EntityId) -> EntityId {
        let base_entity = self.entity(base);
        let Some(extension_type) = base_entity.model_type.extension_type() else {
            return base;
        };
        self.namespace_chain(namespace)
            .iter()
            .filter_map(|ns| self.get_entity(ns, extension_type, &base_entity.metaed_name))
            .find(|id| {
                let extension = self.entity(*id);
                extension.base_entity.map_or(true, |b| b == base)
            })
            .unwrap_or(base)
    }

    /// Entities of the given types across all namespaces, ordered by namespace, type, name.
    pub fn get_all_entities_of_type(&self, model_types: &[ModelType]) -> Vec<EntityId> {
        self.namespace
            .values()
            .flat_map(|ns| {
                ns.entity
                    .iter()
                    .filter(|(ty, _)| model_types.contains(ty))
                    .flat_map(|(_, by_name)| by_name.values().copied())
            })
            .collect()
    }

    /// Entities of every type declared in the given namespaces, in the order given.
    pub fn get_all_entities_for_namespaces(&self, namespaces: &[String]) -> Vec<EntityId> {
        namespaces
            .iter()
            .filter_map(|name| self.namespace.get(name))
            .flat_map(|ns| ns.entity_ids())
            .collect()
    }

    // ========================================================================
    // Plugin environments
    // ========================================================================

    pub fn add_plugin_environment(&mut self, environment: PluginEnvironment) {
        self.plugin
            .insert(environment.short_name.clone(), environment);
    }

    pub fn plugin_environment(&self, short_name: &str) -> Result<&PluginEnvironment, DataSlotError> {
        self.plugin
            .get(short_name)
            .ok_or_else(|| DataSlotError::UnknownPlugin(short_name.to_string()))
    }

    pub fn plugin_environment_mut(
        &mut self,
        short_name: &str,
    ) -> Result<&mut PluginEnvironment, DataSlotError> {
        self.plugin
            .get_mut(short_name)
            .ok_or_else(|| DataSlotError::UnknownPlugin(short_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment_with_core_and_extension() -> MetaEdEnvironment {
        let mut metaed = MetaEdEnvironment::new();
        metaed.add_namespace(Namespace::new("EdFi"));
        let mut extension = Namespace::extension("Extension", "EXTENSION");
        extension.dependencies.push("EdFi".to_string());
        metaed.add_namespace(extension);
        metaed
    }

    #[test]
    fn duplicate_name_of_same_type_is_rejected() {
        let mut metaed = environment_with_core_and_extension();
        let first = metaed
            .add_entity(Entity::new(ModelType::DomainEntity, "EdFi", "Student"))
            .unwrap();
        let err = metaed
            .add_entity(Entity::new(ModelType::DomainEntity, "EdFi", "Student"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateEntity { existing, .. } if existing == first));
        assert_eq!(metaed.entities.len(), 1);

        // Same name, different type is a separate key.
        metaed
            .add_entity(Entity::new(ModelType::Association, "EdFi", "Student"))
            .unwrap();
    }

    #[test]
    fn chain_lookup_falls_back_to_dependencies() {
        let mut metaed = environment_with_core_and_extension();
        let core = metaed
            .add_entity(Entity::new(ModelType::DomainEntity, "EdFi", "School"))
            .unwrap();
        assert_eq!(
            metaed.get_entity_from_namespace_chain("Extension", "School", &[ModelType::DomainEntity]),
            Some(core)
        );
        assert_eq!(
            metaed.get_entity_from_namespace("Extension", "School", &[ModelType::DomainEntity]),
            None
        );
        assert_eq!(metaed.namespace_chain("Extension"), vec!["Extension", "EdFi"]);
    }

    #[test]
    fn most_derived_prefers_extension_in_requesting_namespace() {
        let mut metaed = environment_with_core_and_extension();
        let core = metaed
            .add_entity(Entity::new(ModelType::DomainEntity, "EdFi", "DomainEntityName1"))
            .unwrap();
        let mut extension = Entity::new(
            ModelType::DomainEntityExtension,
            "Extension",
            "DomainEntityName1",
        );
        extension.base_entity = Some(core);
        let extension = metaed.add_entity(extension).unwrap();

        assert_eq!(metaed.get_most_derived_entity("Extension", core), extension);
        assert_eq!(metaed.get_most_derived_entity("EdFi", core), core);
    }

    #[test]
    fn all_entities_of_type_are_ordered_by_namespace_then_name() {
        let mut metaed = environment_with_core_and_extension();
        let b = metaed
            .add_entity(Entity::new(ModelType::Descriptor, "EdFi", "B"))
            .unwrap();
        let a = metaed
            .add_entity(Entity::new(ModelType::Descriptor, "EdFi", "A"))
            .unwrap();
        let x = metaed
            .add_entity(Entity::new(ModelType::Descriptor, "Extension", "X"))
            .unwrap();
        assert_eq!(
            metaed.get_all_entities_of_type(&[ModelType::Descriptor]),
            vec![a, b, x]
        );
        assert_eq!(
            metaed.get_all_entities_for_namespaces(&["Extension".to_string()]),
            vec![x]
        );
    }
}
