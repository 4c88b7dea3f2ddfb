//! Per-plugin data slots.
//!
//! Each plugin owns side tables keyed by entity id and by namespace name. A slot holds one
//! plugin-defined record; enhancers reach it through the typed accessors below, which merge
//! into an existing record rather than replacing it.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::EntityId;

pub type DataSlot = Box<dyn Any + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataSlotError {
    #[error("no plugin environment registered for {0}")]
    UnknownPlugin(String),
    #[error("plugin {plugin} has no data for entity {entity}")]
    MissingEntityData { plugin: String, entity: EntityId },
    #[error("plugin {plugin} has no data for namespace {namespace}")]
    MissingNamespaceData { plugin: String, namespace: String },
    #[error("plugin {plugin} slot for {owner} does not hold a {expected}")]
    TypeMismatch {
        plugin: String,
        owner: String,
        expected: &'static str,
    },
}

pub struct PluginEnvironment {
    pub short_name: String,
    pub target_technology_version: String,
    pub entity: BTreeMap<EntityId, DataSlot>,
    pub namespace: BTreeMap<String, DataSlot>,
}

impl fmt::Debug for PluginEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEnvironment")
            .field("short_name", &self.short_name)
            .field("target_technology_version", &self.target_technology_version)
            .field("entity_slots", &self.entity.len())
            .field("namespace_slots", &self.namespace.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginEnvironment {
    pub fn new(short_name: &str, target_technology_version: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            target_technology_version: target_technology_version.to_string(),
            entity: BTreeMap::new(),
            namespace: BTreeMap::new(),
        }
    }

    fn mismatch<T>(&self, owner: String) -> DataSlotError {
        DataSlotError::TypeMismatch {
            plugin: self.short_name.clone(),
            owner,
            expected: type_name::<T>(),
        }
    }

    // ========================================================================
    // Entity slots
    // ========================================================================

    pub fn has_entity_data(&self, id: EntityId) -> bool {
        self.entity.contains_key(&id)
    }

    pub fn entity_data<T: Any>(&self, id: EntityId) -> Result<&T, DataSlotError> {
        let slot = self
            .entity
            .get(&id)
            .ok_or_else(|| DataSlotError::MissingEntityData {
                plugin: self.short_name.clone(),
                entity: id,
            })?;
        slot.downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>(id.to_string()))
    }

    pub fn entity_data_mut<T: Any>(&mut self, id: EntityId) -> Result<&mut T, DataSlotError> {
        let plugin = self.short_name.clone();
        match self.entity.get_mut(&id) {
            None => Err(DataSlotError::MissingEntityData { plugin, entity: id }),
            Some(slot) => slot.downcast_mut::<T>().ok_or(DataSlotError::TypeMismatch {
                plugin,
                owner: id.to_string(),
                expected: type_name::<T>(),
            }),
        }
    }

    /// The entity's record, created with `T::default()` when the slot is still empty.
    pub fn entity_data_or_default<T>(&mut self, id: EntityId) -> Result<&mut T, DataSlotError>
    where
        T: Any + Default + Send + Sync,
    {
        let plugin = self.short_name.clone();
        self.entity
            .entry(id)
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .ok_or(DataSlotError::TypeMismatch {
                plugin,
                owner: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    // ========================================================================
    // Namespace slots
    // ========================================================================

    pub fn namespace_data<T: Any>(&self, namespace: &str) -> Result<&T, DataSlotError> {
        let slot = self
            .namespace
            .get(namespace)
            .ok_or_else(|| DataSlotError::MissingNamespaceData {
                plugin: self.short_name.clone(),
                namespace: namespace.to_string(),
            })?;
        slot.downcast_ref::<T>()
            .ok_or_else(|| self.mismatch::<T>(namespace.to_string()))
    }

    pub fn namespace_data_mut<T: Any>(&mut self, namespace: &str) -> Result<&mut T, DataSlotError> {
        let plugin = self.short_name.clone();
        match self.namespace.get_mut(namespace) {
            None => Err(DataSlotError::MissingNamespaceData {
                plugin,
                namespace: namespace.to_string(),
            }),
            Some(slot) => slot.downcast_mut::<T>().ok_or(DataSlotError::TypeMismatch {
                plugin,
                owner: namespace.to_string(),
                expected: type_name::<T>(),
            }),
        }
    }

    pub fn namespace_data_or_default<T>(&mut self, namespace: &str) -> Result<&mut T, DataSlotError>
    where
        T: Any + Default + Send + Sync,
    {
        let plugin = self.short_name.clone();
        self.namespace
            .entry(namespace.to_string())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .ok_or(DataSlotError::TypeMismatch {
                plugin,
                owner: namespace.to_string(),
                expected: type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Record {
        complex_type: String,
        identity_type: String,
    }

    #[test]
    fn or_default_merges_into_existing_record() {
        let mut env = PluginEnvironment::new("edfiXsd", "3.0.0");
        let id = EntityId(0);
        env.entity_data_or_default::<Record>(id).unwrap().complex_type = "School".into();
        env.entity_data_or_default::<Record>(id).unwrap().identity_type =
            "SchoolIdentityType".into();

        assert_eq!(
            env.entity_data::<Record>(id).unwrap(),
            &Record {
                complex_type: "School".into(),
                identity_type: "SchoolIdentityType".into(),
            }
        );
    }

    #[test]
    fn wrong_type_is_reported_not_replaced() {
        let mut env = PluginEnvironment::new("edfiXsd", "3.0.0");
        env.namespace_data_or_default::<Record>("EdFi").unwrap();
        let err = env.namespace_data::<String>("EdFi").unwrap_err();
        assert!(matches!(err, DataSlotError::TypeMismatch { .. }));
        assert!(env.namespace_data::<Record>("EdFi").is_ok());
    }

    #[test]
    fn missing_slot_is_an_error() {
        let env = PluginEnvironment::new("edfiOdsApi", "3.0.0");
        assert_eq!(
            env.entity_data::<Record>(EntityId(3)).unwrap_err(),
            DataSlotError::MissingEntityData {
                plugin: "edfiOdsApi".into(),
                entity: EntityId(3),
            }
        );
    }
}
