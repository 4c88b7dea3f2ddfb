//! Interchange ordering.
//!
//! Within each namespace, the elements of every merged interchange form a dependency graph:
//! an element depends on the elements it references, through entity references directly or
//! through common types transitively, and a subclass depends on its base. Extensions visible
//! from the namespace contribute their properties to the entity they extend, so the same
//! element can rank differently in a core namespace and in an extension.
//!
//! Interchanges are then leveled: an interchange depends on another in the same namespace when
//! one of its elements depends on one of the other's elements.

use std::collections::{BTreeMap, BTreeSet};

use metaed_core::model::EntityProperty;
use metaed_core::{DependencyGraph, EnhancerResult, EntityId, MetaEdEnvironment};
use metaed_plugin_xsd::{merged_interchange_repository, MergedInterchangeRepository};

use crate::model::{ApiOrderedElement, InterchangeOrder, InterchangeOrderRepository};
use crate::PLUGIN_NAME;

const API_ORDER_STEP: usize = 10;

pub fn setup_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let namespaces: Vec<String> = metaed.namespace.keys().cloned().collect();
    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for namespace in &namespaces {
        environment.namespace_data_or_default::<InterchangeOrderRepository>(namespace)?;
    }
    Ok(EnhancerResult::success("OdsApiSetupEnhancer"))
}

// ============================================================================
// Element graph
// ============================================================================

/// An extension stands in for the entity it extends.
fn base_of(metaed: &MetaEdEnvironment, id: EntityId) -> EntityId {
    let entity = metaed.entity(id);
    match entity.base_entity {
        Some(base) if entity.model_type.is_extension() => base,
        _ => id,
    }
}

/// Properties of `id` plus those of its extension visible from `namespace`.
fn properties_visible_from<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &str,
    id: EntityId,
) -> Vec<&'a EntityProperty> {
    let mut properties: Vec<&EntityProperty> = metaed.entity(id).properties.iter().collect();
    let derived = metaed.get_most_derived_entity(namespace, id);
    if derived != id {
        properties.extend(metaed.entity(derived).properties.iter());
    }
    properties
}

/// Entity references reachable through `property`, as `(name, is_required)`.
fn referenced_names(
    metaed: &MetaEdEnvironment,
    namespace: &str,
    property: &EntityProperty,
    outer_required: bool,
    visited_commons: &mut BTreeSet<EntityId>,
    out: &mut Vec<(String, bool)>,
) {
    let Some(target) = property.referenced_entity else {
        return;
    };
    let is_required = outer_required && property.is_required_reference();
    if property.property_type.is_entity_reference() {
        out.push((metaed.entity(target).metaed_name.clone(), is_required));
    } else if property.property_type.is_common() && visited_commons.insert(target) {
        for inner in properties_visible_from(metaed, namespace, target) {
            referenced_names(metaed, namespace, inner, is_required, visited_commons, out);
        }
    }
}

pub fn element_graph(
    metaed: &MetaEdEnvironment,
    namespace: &str,
    repository: &MergedInterchangeRepository,
) -> DependencyGraph {
    let mut elements: BTreeMap<&str, Option<EntityId>> = BTreeMap::new();
    for interchange in repository.values() {
        for item in &interchange.elements {
            let slot = elements.entry(item.metaed_name.as_str()).or_insert(None);
            if slot.is_none() {
                *slot = item.referenced_entity;
            }
        }
    }

    let mut graph = DependencyGraph::new();
    for name in elements.keys() {
        graph.add_node(name);
    }
    for (name, id) in &elements {
        let Some(id) = id else {
            continue;
        };
        let base = base_of(metaed, *id);

        let mut references = Vec::new();
        let mut visited_commons = BTreeSet::new();
        for property in properties_visible_from(metaed, namespace, base) {
            referenced_names(metaed, namespace, property, true, &mut visited_commons, &mut references);
        }
        let entity = metaed.entity(base);
        if entity.model_type.is_subclass() {
            if let Some(superclass) = entity.base_entity {
                references.push((metaed.entity(superclass).metaed_name.clone(), true));
            }
        }

        for (target, is_required) in references {
            if elements.contains_key(target.as_str()) {
                graph.add_edge(name, &target, is_required);
            }
        }
    }
    graph
}

// ============================================================================
// Ordering
// ============================================================================

fn interchange_levels(
    repository: &MergedInterchangeRepository,
    elements: &DependencyGraph,
) -> anyhow::Result<BTreeMap<String, usize>> {
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut graph = DependencyGraph::new();
    for interchange in repository.values() {
        graph.add_node(&interchange.repository_id);
        for item in &interchange.elements {
            owners
                .entry(item.metaed_name.as_str())
                .or_default()
                .push(interchange.repository_id.as_str());
        }
    }
    for (from, to, _) in elements.edges() {
        let (Some(dependents), Some(dependencies)) = (owners.get(from), owners.get(to)) else {
            continue;
        };
        for dependent in dependents {
            for dependency in dependencies.iter().filter(|d| *d != dependent) {
                graph.add_edge(dependent, dependency, false);
            }
        }
    }

    let resolution = graph.resolve()?;
    let dropped: BTreeSet<(&str, &str)> = resolution
        .dropped_edges
        .iter()
        .map(|(f, t)| (f.as_str(), t.as_str()))
        .collect();
    let mut dependencies: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (from, to, _) in graph.edges() {
        if from != to && !dropped.contains(&(from, to)) {
            dependencies.entry(from).or_default().push(to);
        }
    }

    let mut levels: BTreeMap<String, usize> = BTreeMap::new();
    for group in &resolution.groups {
        let mut deepest = 0;
        for member in group {
            for dependency in dependencies.get(member.as_str()).into_iter().flatten() {
                if group.iter().any(|m| m.as_str() == *dependency) {
                    continue;
                }
                deepest = deepest.max(levels.get(*dependency).copied().unwrap_or(0));
            }
        }
        let level = deepest + 1;
        for member in group {
            levels.insert(member.clone(), level);
        }
    }
    Ok(levels)
}

pub fn order_namespace(
    metaed: &MetaEdEnvironment,
    namespace: &str,
    repository: &MergedInterchangeRepository,
) -> anyhow::Result<InterchangeOrderRepository> {
    let elements = element_graph(metaed, namespace, repository);
    let global_order = elements.resolve()?.global_dependency_order();
    let levels = interchange_levels(repository, &elements)?;

    let mut orders = InterchangeOrderRepository::default();
    for interchange in repository.values() {
        let names: BTreeSet<&str> = interchange
            .elements
            .iter()
            .map(|item| item.metaed_name.as_str())
            .collect();
        let mut api_ordered_elements: Vec<ApiOrderedElement> = names
            .into_iter()
            .map(|name| {
                ApiOrderedElement::new(name, global_order.get(name).copied().unwrap_or_default())
            })
            .collect();
        api_ordered_elements.sort_by(|a, b| {
            (a.global_dependency_order, &a.name).cmp(&(b.global_dependency_order, &b.name))
        });
        let level = levels.get(&interchange.repository_id).copied().unwrap_or(1);
        orders.interchange.insert(
            interchange.repository_id.clone(),
            InterchangeOrder {
                api_order: API_ORDER_STEP * level,
                api_ordered_elements,
            },
        );
    }
    Ok(orders)
}

pub fn interchange_order_enhancer(
    metaed: &mut MetaEdEnvironment,
) -> anyhow::Result<EnhancerResult> {
    let mut ordered: Vec<(String, InterchangeOrderRepository)> = Vec::new();
    for namespace in metaed.namespace.keys() {
        let repository = merged_interchange_repository(metaed, namespace)?;
        if repository.merged_interchange.is_empty() {
            continue;
        }
        let orders = order_namespace(metaed, namespace, repository)
            .map_err(|err| err.context(format!("ordering interchanges of namespace {namespace}")))?;
        tracing::debug!(namespace = %namespace, interchanges = orders.interchange.len(), "interchanges ordered");
        ordered.push((namespace.clone(), orders));
    }

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for (namespace, orders) in ordered {
        *environment.namespace_data_or_default::<InterchangeOrderRepository>(&namespace)? = orders;
    }
    Ok(EnhancerResult::success("InterchangeOrderMetadataEnhancer"))
}
