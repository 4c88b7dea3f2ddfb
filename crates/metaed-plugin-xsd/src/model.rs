//! Records the XSD plugin attaches to entities and namespaces.

use std::collections::BTreeMap;

use metaed_core::model::InterchangeItem;
use metaed_core::plugin::DataSlotError;
use metaed_core::{EntityId, MetaEdEnvironment};

use crate::PLUGIN_NAME;

/// Schema type names of one entity. Names that do not apply to the entity's model type
/// stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityXsd {
    pub complex_type_name: String,
    pub identity_type_name: String,
    pub reference_type_name: String,
}

/// An interchange as it is emitted for one namespace: a core interchange, an interchange
/// declared in an extension, or an extension-namespace copy of a core interchange carrying
/// the extension's additions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedInterchange {
    /// Key within the namespace repository. Extension copies are prefixed with the project
    /// extension so they never shadow a same-named interchange declared in the extension.
    pub repository_id: String,
    pub metaed_name: String,
    pub namespace: String,
    pub interchange_name: String,
    pub documentation: String,
    pub extended_documentation: String,
    pub use_case_documentation: String,
    pub elements: Vec<InterchangeItem>,
    pub identity_templates: Vec<InterchangeItem>,
    /// Set for copies of an interchange declared in another namespace.
    pub is_extension: bool,
    pub source: EntityId,
}

impl MergedInterchange {
    /// Element entities, skipping members that did not resolve.
    pub fn element_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.elements.iter().filter_map(|item| item.referenced_entity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergedInterchangeRepository {
    pub merged_interchange: BTreeMap<String, MergedInterchange>,
}

impl MergedInterchangeRepository {
    pub fn add(&mut self, interchange: MergedInterchange) {
        self.merged_interchange
            .insert(interchange.repository_id.clone(), interchange);
    }

    pub fn values(&self) -> impl Iterator<Item = &MergedInterchange> {
        self.merged_interchange.values()
    }
}

pub fn merged_interchange_repository<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &str,
) -> Result<&'a MergedInterchangeRepository, DataSlotError> {
    metaed
        .plugin_environment(PLUGIN_NAME)?
        .namespace_data::<MergedInterchangeRepository>(namespace)
}

pub fn entity_xsd(metaed: &MetaEdEnvironment, id: EntityId) -> Result<&EntityXsd, DataSlotError> {
    metaed
        .plugin_environment(PLUGIN_NAME)?
        .entity_data::<EntityXsd>(id)
}
