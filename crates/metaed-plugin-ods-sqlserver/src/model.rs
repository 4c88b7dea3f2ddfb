//! SQL Server rendering of the relational model.

use std::collections::BTreeMap;

use metaed_core::plugin::DataSlotError;
use metaed_core::MetaEdEnvironment;
use metaed_plugin_ods_relational::ColumnType;

use crate::PLUGIN_NAME;

/// SQL Server data type for a logical column type.
pub fn sql_data_type(column_type: &ColumnType) -> String {
    match column_type {
        ColumnType::Boolean => "BIT".to_string(),
        ColumnType::Currency => "MONEY".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Datetime => "DATETIME2(7)".to_string(),
        ColumnType::Decimal {
            total_digits,
            decimal_places,
        } => format!("DECIMAL({total_digits}, {decimal_places})"),
        ColumnType::Duration => "NVARCHAR(30)".to_string(),
        ColumnType::Integer => "INT".to_string(),
        ColumnType::Percent => "DECIMAL(5, 4)".to_string(),
        ColumnType::Short | ColumnType::Year => "SMALLINT".to_string(),
        ColumnType::String { max_length } => format!("NVARCHAR({max_length})"),
        ColumnType::Time => "TIME(7)".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlColumn {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub is_part_of_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub foreign_schema: String,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTable {
    pub schema: String,
    pub name: String,
    pub primary_key_name: String,
    pub columns: Vec<SqlColumn>,
    pub foreign_keys: Vec<SqlForeignKey>,
}

impl SqlTable {
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &SqlColumn> {
        self.columns.iter().filter(|c| c.is_part_of_primary_key)
    }
}

/// Per-namespace SQL tables keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct SqlTableRepository {
    pub table: BTreeMap<String, SqlTable>,
}

pub fn sql_table_repository<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &str,
) -> Result<&'a SqlTableRepository, DataSlotError> {
    metaed
        .plugin_environment(PLUGIN_NAME)?
        .namespace_data::<SqlTableRepository>(namespace)
}
