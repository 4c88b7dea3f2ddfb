//! Maps every relational table onto SQL Server columns, keys and constraint names.

use std::collections::BTreeMap;

use metaed_core::{EnhancerResult, MetaEdEnvironment};
use metaed_plugin_ods_relational::{table_repository, Table};

use crate::model::{sql_data_type, SqlColumn, SqlForeignKey, SqlTable, SqlTableRepository};
use crate::PLUGIN_NAME;

/// SQL Server identifiers are limited to 128 characters.
const MAX_IDENTIFIER_LENGTH: usize = 128;

fn constraint_name(name: String) -> String {
    if name.len() <= MAX_IDENTIFIER_LENGTH {
        return name;
    }
    tracing::warn!(name = %name, "constraint name truncated");
    name.chars().take(MAX_IDENTIFIER_LENGTH).collect()
}

pub fn sql_table(table: &Table) -> SqlTable {
    let columns = table
        .columns
        .iter()
        .map(|column| SqlColumn {
            name: column.column_id.clone(),
            data_type: sql_data_type(&column.column_type),
            is_nullable: column.is_nullable,
            is_part_of_primary_key: column.is_part_of_primary_key,
        })
        .collect();

    // Two keys to the same table (role-named references) are told apart by position.
    let mut uses: BTreeMap<&str, usize> = BTreeMap::new();
    let foreign_keys = table
        .foreign_keys
        .iter()
        .map(|fk| {
            let count = uses.entry(fk.foreign_table_id.as_str()).or_default();
            *count += 1;
            let suffix = if *count > 1 { count.to_string() } else { String::new() };
            SqlForeignKey {
                name: constraint_name(format!("FK_{}_{}{suffix}", table.table_id, fk.foreign_table_id)),
                columns: fk.column_pairs.iter().map(|p| p.parent_table_column_id.clone()).collect(),
                foreign_schema: fk.foreign_table_schema.clone(),
                foreign_table: fk.foreign_table_id.clone(),
                foreign_columns: fk.column_pairs.iter().map(|p| p.foreign_table_column_id.clone()).collect(),
            }
        })
        .collect();

    SqlTable {
        schema: table.schema.clone(),
        name: table.table_id.clone(),
        primary_key_name: constraint_name(format!("{}_PK", table.table_id)),
        columns,
        foreign_keys,
    }
}

pub fn column_data_type_enhancer(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let mut repositories: Vec<(String, SqlTableRepository)> = Vec::new();
    for namespace in metaed.namespace.keys() {
        let mut repository = SqlTableRepository::default();
        for table in table_repository(metaed, namespace)?.table.values() {
            repository.table.insert(table.table_id.clone(), sql_table(table));
        }
        tracing::debug!(namespace = %namespace, tables = repository.table.len(), "sql tables");
        repositories.push((namespace.clone(), repository));
    }

    let environment = metaed.plugin_environment_mut(PLUGIN_NAME)?;
    for (namespace, repository) in repositories {
        *environment.namespace_data_or_default::<SqlTableRepository>(&namespace)? = repository;
    }
    Ok(EnhancerResult::success("ColumnDataTypeEnhancer"))
}
