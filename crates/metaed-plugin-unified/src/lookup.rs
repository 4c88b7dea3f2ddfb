//! Reference resolution shared by the linking enhancers and the validators.
//!
//! A reference may name any namespace visible from the referring entity's namespace (itself
//! or its dependency chain). Lookups start in the named namespace and fall back along its own
//! chain.

use metaed_core::model::{Entity, EntityProperty, InterchangeItem, ModelType};
use metaed_core::{EntityId, MetaEdEnvironment};

fn is_visible(metaed: &MetaEdEnvironment, from: &str, target: &str) -> bool {
    from == target || metaed.namespace_chain(from).iter().any(|ns| ns == target)
}

fn lookup(
    metaed: &MetaEdEnvironment,
    from_namespace: &str,
    target_namespace: &str,
    name: &str,
    model_types: &[ModelType],
) -> Option<EntityId> {
    let target = if target_namespace.is_empty() {
        from_namespace
    } else {
        target_namespace
    };
    if !is_visible(metaed, from_namespace, target) {
        return None;
    }
    metaed.get_entity_from_namespace_chain(target, name, model_types)
}

/// The base of a subclass or extension entity.
pub fn lookup_base(metaed: &MetaEdEnvironment, entity: &Entity) -> Option<EntityId> {
    if !entity.has_base() {
        return None;
    }
    lookup(
        metaed,
        &entity.namespace,
        &entity.base_entity_namespace_name,
        &entity.base_entity_name,
        entity.model_type.base_types(),
    )
}

/// The entity a referential property names; `None` for simple properties.
pub fn lookup_property_reference(
    metaed: &MetaEdEnvironment,
    property: &EntityProperty,
) -> Option<EntityId> {
    let types = property.property_type.referenced_types();
    if types.is_empty() {
        return None;
    }
    lookup(
        metaed,
        &property.namespace,
        &property.referenced_namespace_name,
        &property.metaed_name,
        types,
    )
}

pub fn lookup_interchange_item(
    metaed: &MetaEdEnvironment,
    namespace: &str,
    item: &InterchangeItem,
) -> Option<EntityId> {
    lookup(
        metaed,
        namespace,
        &item.referenced_namespace_name,
        &item.metaed_name,
        item.item_type.referenced_types(),
    )
}
