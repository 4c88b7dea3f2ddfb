//! Relational model: tables, columns and foreign keys, held per namespace.

use std::collections::BTreeMap;

use metaed_core::plugin::DataSlotError;
use metaed_core::{EntityId, MetaEdEnvironment};

use crate::PLUGIN_NAME;

/// Logical column type; each database plugin maps it to its own SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Currency,
    Date,
    Datetime,
    Decimal { total_digits: u32, decimal_places: u32 },
    Duration,
    Integer,
    Percent,
    Short,
    String { max_length: u32 },
    Time,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub column_id: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    pub is_part_of_primary_key: bool,
    pub description: String,
}

impl Column {
    pub fn new(column_id: &str, column_type: ColumnType) -> Self {
        Self {
            column_id: column_id.to_string(),
            column_type,
            is_nullable: false,
            is_part_of_primary_key: false,
            description: String::new(),
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_part_of_primary_key = true;
        self.is_nullable = false;
        self
    }

    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable && !self.is_part_of_primary_key;
        self
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub parent_table_column_id: String,
    pub foreign_table_column_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub foreign_table_schema: String,
    pub foreign_table_id: String,
    pub column_pairs: Vec<ColumnPair>,
}

impl ForeignKey {
    pub fn new(foreign_table_schema: &str, foreign_table_id: &str) -> Self {
        Self {
            foreign_table_schema: foreign_table_schema.to_string(),
            foreign_table_id: foreign_table_id.to_string(),
            column_pairs: Vec::new(),
        }
    }

    pub fn with_pair(mut self, parent_table_column_id: &str, foreign_table_column_id: &str) -> Self {
        self.column_pairs.push(ColumnPair {
            parent_table_column_id: parent_table_column_id.to_string(),
            foreign_table_column_id: foreign_table_column_id.to_string(),
        });
        self
    }
}

/// Why a table exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    EntityMain,
    Subclass,
    Extension,
    Descriptor,
    BaseDescriptor,
    Enumeration,
    /// Child table implementing a collection or common property.
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub table_id: String,
    pub schema: String,
    pub description: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Table this one hangs off (child, subclass and extension tables).
    pub parent_table_id: Option<String>,
    pub entity: Option<EntityId>,
}

impl Table {
    pub fn new(schema: &str, table_id: &str, kind: TableKind) -> Self {
        Self {
            table_id: table_id.to_string(),
            schema: schema.to_string(),
            description: String::new(),
            kind,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            parent_table_id: None,
            entity: None,
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.column_id == column_id)
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_part_of_primary_key)
    }

    /// Adds columns not already present by id; a repeated column keeps its first definition,
    /// becoming part of the primary key if either definition was.
    pub fn add_columns(&mut self, columns: impl IntoIterator<Item = Column>) {
        for column in columns {
            match self.columns.iter_mut().find(|c| c.column_id == column.column_id) {
                Some(existing) => {
                    if column.is_part_of_primary_key {
                        existing.is_part_of_primary_key = true;
                        existing.is_nullable = false;
                    }
                }
                None => self.columns.push(column),
            }
        }
    }
}

/// Per-namespace table repository keyed by table id.
#[derive(Debug, Clone, Default)]
pub struct TableRepository {
    pub table: BTreeMap<String, Table>,
}

impl TableRepository {
    pub fn add(&mut self, table: Table) {
        self.table.insert(table.table_id.clone(), table);
    }

    pub fn get(&self, table_id: &str) -> Option<&Table> {
        self.table.get(table_id)
    }

    pub fn get_mut(&mut self, table_id: &str) -> Option<&mut Table> {
        self.table.get_mut(table_id)
    }
}

pub fn table_repository<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &str,
) -> Result<&'a TableRepository, DataSlotError> {
    metaed
        .plugin_environment(PLUGIN_NAME)?
        .namespace_data::<TableRepository>(namespace)
}

/// Schema for a namespace's tables: the namespace name in lower case.
pub fn schema_for(namespace: &str) -> String {
    namespace.to_lowercase()
}
