//! Core semantic validators.
//!
//! Validators run before this plugin's enhancers, so they resolve names through
//! [`crate::lookup`] rather than trusting the linked ids.

use std::collections::BTreeMap;

use metaed_core::model::ModelType;
use metaed_core::{MetaEdEnvironment, ValidationFailure};

use crate::lookup::{lookup_base, lookup_interchange_item, lookup_property_reference};

fn display_type(model_type: ModelType) -> &'static str {
    match model_type {
        ModelType::Association => "Association",
        ModelType::AssociationExtension => "Association additions",
        ModelType::AssociationSubclass => "Association subclass",
        ModelType::Common => "Common",
        ModelType::CommonExtension => "Common additions",
        ModelType::Descriptor => "Descriptor",
        ModelType::DomainEntity => "Domain Entity",
        ModelType::DomainEntityExtension => "Domain Entity additions",
        ModelType::DomainEntitySubclass => "Domain Entity subclass",
        ModelType::Enumeration => "Enumeration",
        ModelType::Interchange => "Interchange",
        ModelType::InterchangeExtension => "Interchange additions",
    }
}

pub fn base_entity_must_exist(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    metaed
        .entities
        .iter()
        .filter(|entity| entity.has_base() && lookup_base(metaed, entity).is_none())
        .map(|entity| {
            ValidationFailure::error(
                "BaseEntityMustExist",
                format!(
                    "{} {} refers to {}.{}, which could not be found.",
                    display_type(entity.model_type),
                    entity.metaed_name,
                    entity.base_entity_namespace_name,
                    entity.base_entity_name
                ),
                entity.source_map,
            )
        })
        .collect()
}

/// Extensions add to entities of another namespace, never their own.
pub fn extension_must_not_share_namespace_with_base(
    metaed: &MetaEdEnvironment,
) -> Vec<ValidationFailure> {
    metaed
        .entities
        .iter()
        .filter(|entity| entity.model_type.is_extension())
        .filter_map(|entity| {
            let base = metaed.entity(lookup_base(metaed, entity)?);
            (base.namespace == entity.namespace).then(|| {
                ValidationFailure::error(
                    "ExtensionMustNotShareNamespaceWithBase",
                    format!(
                        "{} {} is declared in namespace {}, the same namespace as the entity it extends.",
                        display_type(entity.model_type),
                        entity.metaed_name,
                        entity.namespace
                    ),
                    entity.source_map,
                )
            })
        })
        .collect()
}

pub fn referenced_entity_must_exist(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for entity in &metaed.entities {
        for property in &entity.properties {
            if !property.property_type.is_referential()
                || lookup_property_reference(metaed, property).is_some()
            {
                continue;
            }
            failures.push(ValidationFailure::error(
                "ReferencedEntityMustExist",
                format!(
                    "{} property {} on {} {} does not match any visible {}.",
                    property.property_type.keyword(),
                    property.metaed_name,
                    display_type(entity.model_type),
                    entity.metaed_name,
                    property.property_type.keyword()
                ),
                property.source_map,
            ));
        }
    }
    failures
}

pub fn interchange_item_must_exist(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for id in metaed.get_all_entities_of_type(&[ModelType::Interchange, ModelType::InterchangeExtension]) {
        let interchange = metaed.entity(id);
        let items = interchange
            .elements
            .iter()
            .chain(interchange.identity_templates.iter());
        for item in items {
            if lookup_interchange_item(metaed, &interchange.namespace, item).is_none() {
                failures.push(ValidationFailure::error(
                    "InterchangeItemMustExist",
                    format!(
                        "Interchange {} member {} does not match any visible entity.",
                        interchange.metaed_name, item.metaed_name
                    ),
                    item.source_map,
                ));
            }
        }
    }
    failures
}

/// Types that share one name space within a namespace.
const TOP_LEVEL_TYPES: &[ModelType] = &[
    ModelType::Association,
    ModelType::AssociationSubclass,
    ModelType::Common,
    ModelType::DomainEntity,
    ModelType::DomainEntitySubclass,
];

pub fn top_level_name_must_be_unique(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for namespace in metaed.namespace.values() {
        let mut by_name: BTreeMap<&str, Vec<ModelType>> = BTreeMap::new();
        for model_type in TOP_LEVEL_TYPES {
            for id in namespace.entity_ids_of_type(*model_type) {
                by_name
                    .entry(metaed.entity(id).metaed_name.as_str())
                    .or_default()
                    .push(*model_type);
            }
        }
        for (name, types) in by_name.into_iter().filter(|(_, types)| types.len() > 1) {
            for model_type in &types {
                let Some(id) = namespace.get(*model_type, name) else {
                    continue;
                };
                failures.push(ValidationFailure::error(
                    "TopLevelNameMustBeUnique",
                    format!(
                        "{} named {} is a duplicate declaration of that name in namespace {}.",
                        display_type(*model_type),
                        name,
                        namespace.namespace_name
                    ),
                    metaed.entity(id).source_map,
                ));
            }
        }
    }
    failures
}

pub fn namespace_name_must_be_unique_ignoring_case(
    metaed: &MetaEdEnvironment,
) -> Vec<ValidationFailure> {
    let mut by_lowercase: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for name in metaed.namespace.keys() {
        by_lowercase.entry(name.to_lowercase()).or_default().push(name);
    }
    by_lowercase
        .into_values()
        .filter(|names| names.len() > 1)
        .flatten()
        .filter_map(|name| metaed.namespace(name))
        .map(|namespace| {
            ValidationFailure::error(
                "NamespaceNameMustBeUniqueIgnoringCase",
                format!(
                    "Namespace {} differs from another namespace only by case.",
                    namespace.namespace_name
                ),
                namespace.source_map,
            )
        })
        .collect()
}

pub fn domain_entity_must_have_identity(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    metaed
        .get_all_entities_of_type(&[ModelType::DomainEntity])
        .into_iter()
        .map(|id| metaed.entity(id))
        .filter(|entity| entity.identity_properties().next().is_none())
        .map(|entity| {
            ValidationFailure::error(
                "DomainEntityMustHaveIdentity",
                format!(
                    "Domain Entity {} has no identity property.",
                    entity.metaed_name
                ),
                entity.source_map,
            )
        })
        .collect()
}
