use crate::environment::MetaEdEnvironment;
use crate::grammar::NamespaceNode;
use crate::model::Namespace;
use crate::state::ValidationFailure;

const VALIDATOR_NAME: &str = "NamespaceBuilder";

/// Creates the namespace for a block, or reuses it when several files open the same one.
pub fn build_namespace(node: &NamespaceNode, metaed: &mut MetaEdEnvironment) -> Vec<ValidationFailure> {
    let is_extension = node.project_extension != "core";

    if let Some(existing) = metaed.namespace(&node.namespace_name) {
        if existing.is_extension != is_extension
            || (is_extension && existing.project_extension != node.project_extension)
        {
            return vec![ValidationFailure::error(
                VALIDATOR_NAME,
                format!(
                    "Namespace {} is declared with project extension {} but was already declared with {}.",
                    node.namespace_name,
                    node.project_extension,
                    if existing.is_extension {
                        existing.project_extension.as_str()
                    } else {
                        "core"
                    }
                ),
                node.source_map,
            )];
        }
        return vec![];
    }

    let mut namespace = if is_extension {
        Namespace::extension(&node.namespace_name, &node.project_extension)
    } else {
        Namespace::new(&node.namespace_name)
    };
    namespace.source_map = node.source_map;
    metaed.add_namespace(namespace);
    vec![]
}
