//! `0020-Tables.sql` and `0030-ForeignKeys.sql` for each namespace that owns tables.

use std::fmt::Write as _;

use metaed_core::{GeneratedOutput, GeneratorResult, MetaEdEnvironment};

use crate::model::{sql_table_repository, SqlTable};

pub const STRUCTURE_FOLDER: &str = "Database/SQLServer/ODS/Structure";
pub const TABLES_FILE: &str = "0020-Tables.sql";
pub const FOREIGN_KEYS_FILE: &str = "0030-ForeignKeys.sql";

pub fn create_table(out: &mut String, table: &SqlTable) -> std::fmt::Result {
    writeln!(out, "-- Table [{}].[{}] --", table.schema, table.name)?;
    writeln!(out, "CREATE TABLE [{}].[{}] (", table.schema, table.name)?;
    for column in &table.columns {
        let null = if column.is_nullable { "NULL" } else { "NOT NULL" };
        writeln!(out, "    [{}] {} {},", column.name, column.data_type, null)?;
    }
    writeln!(out, "    CONSTRAINT [{}] PRIMARY KEY CLUSTERED (", table.primary_key_name)?;
    let keys: Vec<String> = table
        .primary_key_columns()
        .map(|c| format!("        [{}] ASC", c.name))
        .collect();
    writeln!(out, "{}", keys.join(",\n"))?;
    writeln!(out, "    )")?;
    writeln!(out, ")")?;
    writeln!(out, "GO")?;
    writeln!(out)
}

fn bracketed(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("[{n}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn add_foreign_keys(out: &mut String, table: &SqlTable) -> std::fmt::Result {
    for fk in &table.foreign_keys {
        writeln!(
            out,
            "ALTER TABLE [{}].[{}] WITH CHECK ADD CONSTRAINT [{}] FOREIGN KEY ({})",
            table.schema,
            table.name,
            fk.name,
            bracketed(&fk.columns)
        )?;
        writeln!(
            out,
            "REFERENCES [{}].[{}] ({})",
            fk.foreign_schema,
            fk.foreign_table,
            bracketed(&fk.foreign_columns)
        )?;
        writeln!(out, "GO")?;
        writeln!(out)?;
    }
    Ok(())
}

fn output(namespace: &str, file_name: &str, result_string: String) -> GeneratedOutput {
    GeneratedOutput {
        name: "ODS Tables".to_string(),
        namespace: namespace.to_string(),
        folder_name: STRUCTURE_FOLDER.to_string(),
        file_name: file_name.to_string(),
        result_string,
        result_stream: None,
    }
}

pub fn generate(metaed: &MetaEdEnvironment) -> anyhow::Result<GeneratorResult> {
    let mut generated_output = Vec::new();
    for namespace in metaed.namespace.keys() {
        let repository = sql_table_repository(metaed, namespace)?;
        if repository.table.is_empty() {
            continue;
        }
        let mut tables = String::new();
        let mut foreign_keys = String::new();
        for table in repository.table.values() {
            create_table(&mut tables, table)?;
            add_foreign_keys(&mut foreign_keys, table)?;
        }
        generated_output.push(output(namespace, TABLES_FILE, tables));
        if !foreign_keys.is_empty() {
            generated_output.push(output(namespace, FOREIGN_KEYS_FILE, foreign_keys));
        }
    }
    Ok(GeneratorResult {
        generator_name: "OdsTableGenerator".to_string(),
        generated_output,
    })
}
