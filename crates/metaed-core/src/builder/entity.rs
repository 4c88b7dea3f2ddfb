use crate::environment::{MetaEdEnvironment, RepositoryError};
use crate::grammar::{
    Documentation, EntityKeyword, EntityNode, HeaderForm, InterchangeMemberNode, PropertyModifier,
    PropertyNode,
};
use crate::model::{
    Entity, EntityProperty, EnumerationItem, InterchangeItem, ModelType, PropertyType,
};
use crate::state::ValidationFailure;

const ENTITY_VALIDATOR_NAME: &str = "TopLevelEntityBuilder";
const PROPERTY_VALIDATOR_NAME: &str = "PropertyBuilder";

fn model_type_for(keyword: EntityKeyword, form: &HeaderForm) -> ModelType {
    match (keyword, form) {
        (EntityKeyword::DomainEntity, HeaderForm::Subclass { .. }) => ModelType::DomainEntitySubclass,
        (EntityKeyword::DomainEntity, HeaderForm::Extension) => ModelType::DomainEntityExtension,
        (EntityKeyword::DomainEntity | EntityKeyword::AbstractEntity, _) => ModelType::DomainEntity,
        (EntityKeyword::Association, HeaderForm::Subclass { .. }) => ModelType::AssociationSubclass,
        (EntityKeyword::Association, HeaderForm::Extension) => ModelType::AssociationExtension,
        (EntityKeyword::Association, _) => ModelType::Association,
        (EntityKeyword::Common, HeaderForm::Extension) => ModelType::CommonExtension,
        (EntityKeyword::Common, _) => ModelType::Common,
        (EntityKeyword::Descriptor, _) => ModelType::Descriptor,
        (EntityKeyword::Enumeration, _) => ModelType::Enumeration,
        (EntityKeyword::Interchange, HeaderForm::Extension) => ModelType::InterchangeExtension,
        (EntityKeyword::Interchange, _) => ModelType::Interchange,
    }
}

fn build_property(
    namespace: &str,
    node: &PropertyNode,
    failures: &mut Vec<ValidationFailure>,
) -> Option<EntityProperty> {
    let Some(property_type) = PropertyType::from_keyword(&node.keyword) else {
        failures.push(ValidationFailure::error(
            PROPERTY_VALIDATOR_NAME,
            format!(
                "Property {} has unknown property type `{}`.",
                node.name, node.keyword
            ),
            node.source_map,
        ));
        return None;
    };

    let mut property = EntityProperty::new(property_type, &node.name, namespace);
    property.source_map = node.source_map;
    if let Some(qualifier) = &node.namespace_qualifier {
        property.referenced_namespace_name = qualifier.clone();
    }
    match &node.documentation {
        Some(Documentation::Text(text)) => property.documentation = text.clone(),
        Some(Documentation::Inherited) => property.documentation_inherited = true,
        None => {}
    }

    for modifier in &node.modifiers {
        match modifier {
            PropertyModifier::PartOfIdentity => property.is_part_of_identity = true,
            PropertyModifier::Required => property.is_required = true,
            PropertyModifier::Optional => property.is_optional = true,
            PropertyModifier::RequiredCollection => property.is_required_collection = true,
            PropertyModifier::OptionalCollection => property.is_optional_collection = true,
            PropertyModifier::QueryableOnly => property.is_queryable_only = true,
            PropertyModifier::RoleName { name, shorten_to } => {
                property.role_name = name.clone();
                property.shorten_to = shorten_to.clone().unwrap_or_default();
            }
            PropertyModifier::MinLength(v) => property.constraints.min_length = Some(v.clone()),
            PropertyModifier::MaxLength(v) => property.constraints.max_length = Some(v.clone()),
            PropertyModifier::MinValue(v) => property.constraints.min_value = Some(v.clone()),
            PropertyModifier::MaxValue(v) => property.constraints.max_value = Some(v.clone()),
            PropertyModifier::TotalDigits(v) => {
                property.constraints.total_digits = Some(v.clone())
            }
            PropertyModifier::DecimalPlaces(v) => {
                property.constraints.decimal_places = Some(v.clone())
            }
        }
    }
    Some(property)
}

fn build_interchange_item(namespace: &str, node: &InterchangeMemberNode) -> InterchangeItem {
    InterchangeItem {
        metaed_name: node.name.clone(),
        item_type: node.item_type,
        referenced_namespace_name: node
            .namespace_qualifier
            .clone()
            .unwrap_or_else(|| namespace.to_string()),
        referenced_entity: None,
        source_map: node.source_map,
    }
}

/// Builds one top-level entity and adds it to its namespace.
pub fn build_entity(
    namespace: &str,
    node: &EntityNode,
    metaed: &mut MetaEdEnvironment,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    let model_type = model_type_for(node.keyword, &node.form);

    let mut entity = Entity::new(model_type, namespace, &node.name);
    entity.source_map = node.source_map;
    entity.is_abstract = node.keyword == EntityKeyword::AbstractEntity;
    match &node.documentation {
        Some(Documentation::Text(text)) => entity.documentation = text.clone(),
        Some(Documentation::Inherited) => entity.documentation_inherited = true,
        None => {}
    }
    entity.extended_documentation = node.extended_documentation.clone().unwrap_or_default();
    entity.use_case_documentation = node.use_case_documentation.clone().unwrap_or_default();

    match &node.form {
        HeaderForm::Plain => {}
        HeaderForm::Subclass {
            base_namespace,
            base_name,
        } => {
            entity.base_entity_name = base_name.clone();
            entity.base_entity_namespace_name =
                base_namespace.clone().unwrap_or_else(|| namespace.to_string());
        }
        HeaderForm::Extension => {
            entity.base_entity_name = node.name.clone();
            entity.base_entity_namespace_name = node
                .namespace_qualifier
                .clone()
                .unwrap_or_else(|| namespace.to_string());
        }
    }

    entity.properties = node
        .properties
        .iter()
        .filter_map(|p| build_property(namespace, p, &mut failures))
        .collect();

    entity.enumeration_items = node
        .items
        .iter()
        .map(|item| EnumerationItem {
            short_description: item.short_description.clone(),
            documentation: item.documentation.clone().unwrap_or_default(),
            source_map: item.source_map,
        })
        .collect();
    if let Some(required) = node.map_type_required {
        entity.is_map_type_required = required;
        entity.is_map_type_optional = !required;
    }

    entity.elements = node
        .elements
        .iter()
        .map(|m| build_interchange_item(namespace, m))
        .collect();
    entity.identity_templates = node
        .identity_templates
        .iter()
        .map(|m| build_interchange_item(namespace, m))
        .collect();

    let source_map = entity.source_map;
    match metaed.add_entity(entity) {
        Ok(_) => {}
        Err(RepositoryError::DuplicateEntity {
            model_type,
            metaed_name,
            existing,
            ..
        }) => {
            // Both declarations are reported so each shows up at its own position.
            let message = format!(
                "{} named {} is a duplicate declaration of that name.",
                model_type, metaed_name
            );
            let existing_source_map = metaed.entity(existing).source_map;
            failures.push(ValidationFailure::error(
                ENTITY_VALIDATOR_NAME,
                message.clone(),
                existing_source_map,
            ));
            failures.push(ValidationFailure::error(
                ENTITY_VALIDATOR_NAME,
                message,
                source_map,
            ));
        }
        Err(err @ RepositoryError::UnknownNamespace(_)) => {
            failures.push(ValidationFailure::error(
                ENTITY_VALIDATOR_NAME,
                err.to_string(),
                source_map,
            ));
        }
    }
    failures
}
