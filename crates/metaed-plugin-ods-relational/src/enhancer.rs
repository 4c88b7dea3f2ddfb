//! Relational enhancers: repository setup, then table construction.

use metaed_core::{EnhancerResult, MetaEdEnvironment};

use crate::model::TableRepository;
use crate::table::build_tables;
use crate::PLUGIN_NAME;

pub fn setup_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let namespaces: Vec<String> = metaed.namespace.keys().cloned().collect();
    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for name in &namespaces {
        environment.namespace_data_or_default::<TableRepository>(name)?;
    }
    Ok(EnhancerResult::success("OdsRelationalSetupEnhancer"))
}

pub fn table_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let tables = build_tables(metaed);
    tracing::debug!(count = tables.len(), "built relational tables");

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for (namespace, table) in tables {
        let repository = environment.namespace_data_or_default::<TableRepository>(&namespace)?;
        if repository.get(&table.table_id).is_some() {
            tracing::warn!(namespace = %namespace, table = %table.table_id, "duplicate table id, keeping first");
            continue;
        }
        repository.add(table);
    }
    Ok(EnhancerResult::success("TableEnhancer"))
}
