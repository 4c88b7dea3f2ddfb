//! Builders: walk the parse tree and populate the namespace and entity repositories.
//!
//! Builders never fail as a whole. Anything they cannot place (an unknown property type, a
//! duplicate entity name) becomes a [`ValidationFailure`] and the walk continues.

use crate::environment::MetaEdEnvironment;
use crate::grammar::ParseTree;
use crate::state::ValidationFailure;

mod entity;
mod namespace;

pub use entity::build_entity;
pub use namespace::build_namespace;

pub const GRAMMAR_VALIDATOR_NAME: &str = "MetaEdGrammar";

/// Syntax errors recorded by the grammar, as validation failures.
pub fn syntax_failures(tree: &ParseTree) -> Vec<ValidationFailure> {
    tree.syntax_errors
        .iter()
        .map(|err| {
            ValidationFailure::error(
                GRAMMAR_VALIDATOR_NAME,
                format!("Syntax error: {}", err.message),
                err.source_map,
            )
        })
        .collect()
}

/// Runs the namespace builder, then the top-level entity builder, over every namespace block.
pub fn walk_builders(tree: &ParseTree, metaed: &mut MetaEdEnvironment) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for node in &tree.namespaces {
        failures.extend(build_namespace(node, metaed));
    }
    for node in &tree.namespaces {
        for entity in &node.entities {
            failures.extend(build_entity(&node.namespace_name, entity, metaed));
        }
    }
    tracing::debug!(
        namespaces = metaed.namespace.len(),
        entities = metaed.entities.len(),
        failures = failures.len(),
        "builders walked parse tree"
    );
    failures
}
