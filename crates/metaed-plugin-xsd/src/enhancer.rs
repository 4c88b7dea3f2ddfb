//! XSD enhancers, in execution order: slot setup, complex type naming, merged interchanges,
//! merged interchange extensions.

use metaed_core::model::{Entity, InterchangeItem, ModelType, Namespace};
use metaed_core::{EnhancerResult, EntityId, MetaEdEnvironment};

use crate::model::{EntityXsd, MergedInterchange, MergedInterchangeRepository};
use crate::PLUGIN_NAME;

// ============================================================================
// Setup
// ============================================================================

pub fn setup_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let MetaEdEnvironment {
        namespace,
        entities,
        plugin,
        ..
    } = metaed;
    let environment = plugin
        .get_mut(PLUGIN_NAME)
        .ok_or_else(|| anyhow::anyhow!("{PLUGIN_NAME} environment is not registered"))?;
    for entity in entities.iter() {
        environment.entity_data_or_default::<EntityXsd>(entity.id)?;
    }
    for name in namespace.keys() {
        environment.namespace_data_or_default::<MergedInterchangeRepository>(name)?;
    }
    Ok(EnhancerResult::success("XsdSetupEnhancer"))
}

// ============================================================================
// Complex types
// ============================================================================

fn extension_prefix(namespace: Option<&Namespace>) -> String {
    match namespace {
        Some(ns) if ns.is_extension => format!("{}-", ns.project_extension),
        _ => String::new(),
    }
}

/// Type names for one entity. Extension entities are named after the entity they extend.
pub fn type_names_for(entity: &Entity, namespace: Option<&Namespace>) -> EntityXsd {
    let prefix = extension_prefix(namespace);
    let name = &entity.metaed_name;
    match entity.model_type {
        ModelType::DomainEntity
        | ModelType::DomainEntitySubclass
        | ModelType::Association
        | ModelType::AssociationSubclass => EntityXsd {
            complex_type_name: format!("{prefix}{name}"),
            identity_type_name: format!("{prefix}{name}IdentityType"),
            reference_type_name: format!("{prefix}{name}ReferenceType"),
        },
        ModelType::Descriptor => EntityXsd {
            complex_type_name: format!("{prefix}{name}Descriptor"),
            identity_type_name: String::new(),
            reference_type_name: format!("{prefix}{name}DescriptorReferenceType"),
        },
        ModelType::Enumeration => EntityXsd {
            complex_type_name: format!("{prefix}{name}Type"),
            ..EntityXsd::default()
        },
        ModelType::Common => EntityXsd {
            complex_type_name: format!("{prefix}{name}"),
            ..EntityXsd::default()
        },
        ModelType::DomainEntityExtension
        | ModelType::AssociationExtension
        | ModelType::CommonExtension => EntityXsd {
            complex_type_name: format!("{prefix}{name}Extension"),
            ..EntityXsd::default()
        },
        ModelType::Interchange | ModelType::InterchangeExtension => EntityXsd::default(),
    }
}

pub fn complex_type_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let names: Vec<(EntityId, EntityXsd)> = metaed
        .entities
        .iter()
        .map(|entity| (entity.id, type_names_for(entity, metaed.namespace(&entity.namespace))))
        .collect();

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for (id, xsd) in names {
        *environment.entity_data_or_default::<EntityXsd>(id)? = xsd;
    }
    Ok(EnhancerResult::success("ComplexTypeEnhancer"))
}

// ============================================================================
// Merged interchanges
// ============================================================================

fn interchange_name(metaed_name: &str) -> String {
    format!("Interchange{metaed_name}")
}

/// Appends `additions` to `items`, skipping members already present by name and type.
fn merge_items(items: &mut Vec<InterchangeItem>, additions: &[InterchangeItem]) {
    for item in additions {
        let present = items
            .iter()
            .any(|i| i.metaed_name == item.metaed_name && i.item_type == item.item_type);
        if !present {
            items.push(item.clone());
        }
    }
}

fn merged_from_interchange(interchange: &Entity) -> MergedInterchange {
    MergedInterchange {
        repository_id: interchange.metaed_name.clone(),
        metaed_name: interchange.metaed_name.clone(),
        namespace: interchange.namespace.clone(),
        interchange_name: interchange_name(&interchange.metaed_name),
        documentation: interchange.documentation.clone(),
        extended_documentation: interchange.extended_documentation.clone(),
        use_case_documentation: interchange.use_case_documentation.clone(),
        elements: interchange.elements.clone(),
        identity_templates: interchange.identity_templates.clone(),
        is_extension: false,
        source: interchange.id,
    }
}

/// Copy of a core interchange placed in an extension namespace.
fn extension_copy(base: &MergedInterchange, namespace: &Namespace) -> MergedInterchange {
    MergedInterchange {
        repository_id: format!("{}-{}", namespace.project_extension, base.metaed_name),
        namespace: namespace.namespace_name.clone(),
        is_extension: true,
        ..base.clone()
    }
}

/// One merged interchange per interchange; an interchange extension becomes a copy of its
/// base in the extension's namespace with the extension's members appended.
pub fn merged_interchange_enhancer(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    let mut merged: Vec<MergedInterchange> = metaed
        .get_all_entities_of_type(&[ModelType::Interchange])
        .into_iter()
        .map(|id| merged_from_interchange(metaed.entity(id)))
        .collect();

    for id in metaed.get_all_entities_of_type(&[ModelType::InterchangeExtension]) {
        let extension = metaed.entity(id);
        let (Some(base), Some(namespace)) =
            (extension.base_entity, metaed.namespace(&extension.namespace))
        else {
            tracing::debug!(interchange = %extension.metaed_name, "interchange extension has no base");
            continue;
        };
        let mut copy = extension_copy(&merged_from_interchange(metaed.entity(base)), namespace);
        merge_items(&mut copy.elements, &extension.elements);
        merge_items(&mut copy.identity_templates, &extension.identity_templates);
        copy.source = id;
        merged.push(copy);
    }

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    let count = merged.len();
    for interchange in merged {
        let namespace = interchange.namespace.clone();
        environment
            .namespace_data_or_default::<MergedInterchangeRepository>(&namespace)?
            .add(interchange);
    }
    tracing::debug!(merged_interchanges = count, "merged interchanges built");
    Ok(EnhancerResult::success("MergedInterchangeEnhancer"))
}

fn has_extension_in(metaed: &MetaEdEnvironment, namespace: &str, id: EntityId) -> bool {
    let entity = metaed.entity(id);
    entity
        .model_type
        .extension_type()
        .and_then(|ty| metaed.get_entity(namespace, ty, &entity.metaed_name))
        .is_some()
}

/// Copies a core interchange into each extension namespace that extends one of its
/// elements, unless the extension already declares additions to that interchange.
pub fn merged_interchange_extension_enhancer(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    let environment = metaed.plugin_environment(PLUGIN_NAME)?;
    let mut copies: Vec<MergedInterchange> = Vec::new();

    for namespace in metaed.namespace.values().filter(|ns| ns.is_extension) {
        let existing = environment
            .namespace_data::<MergedInterchangeRepository>(&namespace.namespace_name)?;
        for dependency in metaed.namespace_chain(&namespace.namespace_name).iter().skip(1) {
            if metaed.namespace(dependency).map_or(true, |ns| ns.is_extension) {
                continue;
            }
            let core = environment.namespace_data::<MergedInterchangeRepository>(dependency)?;
            for interchange in core.values().filter(|i| !i.is_extension) {
                let copy = extension_copy(interchange, namespace);
                if existing.merged_interchange.contains_key(&copy.repository_id) {
                    continue;
                }
                let extended = interchange
                    .element_entities()
                    .any(|id| has_extension_in(metaed, &namespace.namespace_name, id));
                if extended {
                    copies.push(copy);
                }
            }
        }
    }

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for copy in copies {
        let namespace = copy.namespace.clone();
        environment
            .namespace_data_or_default::<MergedInterchangeRepository>(&namespace)?
            .add(copy);
    }
    Ok(EnhancerResult::success("MergedInterchangeExtensionEnhancer"))
}
