//! Linking enhancers.
//!
//! Each enhancer resolves names to arena ids in two passes: a read-only pass collecting the
//! links, then a write pass applying them. Unresolvable names are left as `None` for the
//! validators to report.

use metaed_core::model::ModelType;
use metaed_core::{EnhancerResult, EntityId, MetaEdEnvironment};

use crate::lookup::{lookup_base, lookup_interchange_item, lookup_property_reference};

const SUBCLASS_AND_EXTENSION_TYPES: &[ModelType] = &[
    ModelType::AssociationExtension,
    ModelType::AssociationSubclass,
    ModelType::CommonExtension,
    ModelType::DomainEntityExtension,
    ModelType::DomainEntitySubclass,
    ModelType::InterchangeExtension,
];

pub fn base_entity_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let links: Vec<(EntityId, Option<EntityId>)> = metaed
        .get_all_entities_of_type(SUBCLASS_AND_EXTENSION_TYPES)
        .into_iter()
        .map(|id| (id, lookup_base(metaed, metaed.entity(id))))
        .collect();

    let mut unresolved = 0usize;
    for (id, base) in links {
        if base.is_none() {
            unresolved += 1;
        }
        metaed.entity_mut(id).base_entity = base;
    }
    tracing::debug!(unresolved, "base entities linked");
    Ok(EnhancerResult::success("BaseEntityEnhancer"))
}

pub fn referenced_entity_enhancer(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    let mut links: Vec<(EntityId, usize, Option<EntityId>)> = Vec::new();
    for entity in &metaed.entities {
        for (index, property) in entity.properties.iter().enumerate() {
            if property.property_type.is_referential() {
                links.push((entity.id, index, lookup_property_reference(metaed, property)));
            }
        }
    }

    for (id, index, referenced) in links {
        metaed.entity_mut(id).properties[index].referenced_entity = referenced;
    }
    Ok(EnhancerResult::success("ReferencedEntityEnhancer"))
}

#[derive(Clone, Copy)]
enum ItemList {
    Elements,
    IdentityTemplates,
}

pub fn interchange_item_enhancer(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    let mut links: Vec<(EntityId, ItemList, usize, Option<EntityId>)> = Vec::new();
    for id in metaed.get_all_entities_of_type(&[ModelType::Interchange, ModelType::InterchangeExtension]) {
        let interchange = metaed.entity(id);
        for (index, item) in interchange.elements.iter().enumerate() {
            let target = lookup_interchange_item(metaed, &interchange.namespace, item);
            links.push((id, ItemList::Elements, index, target));
        }
        for (index, item) in interchange.identity_templates.iter().enumerate() {
            let target = lookup_interchange_item(metaed, &interchange.namespace, item);
            links.push((id, ItemList::IdentityTemplates, index, target));
        }
    }

    for (id, list, index, target) in links {
        let interchange = metaed.entity_mut(id);
        let items = match list {
            ItemList::Elements => &mut interchange.elements,
            ItemList::IdentityTemplates => &mut interchange.identity_templates,
        };
        items[index].referenced_entity = target;
    }
    Ok(EnhancerResult::success("InterchangeItemEnhancer"))
}
