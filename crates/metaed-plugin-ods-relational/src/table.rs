//! Table construction.
//!
//! Every domain entity and association gets a main table named after it. Subclasses and
//! extensions get a table keyed by their base's primary key with a foreign key back to the
//! base table. Collections and common properties become child tables keyed by the parent's
//! primary key; inline commons are flattened into the holding table. References contribute the
//! referenced entity's identity columns, prefixed with the property's role name.

use std::collections::BTreeSet;

use metaed_core::model::{Entity, EntityProperty, ModelType, PropertyType};
use metaed_core::{EntityId, MetaEdEnvironment};

use crate::model::{schema_for, Column, ColumnType, ForeignKey, Table, TableKind};

/// Identity chains deeper than this are treated as cyclic and cut off.
const MAX_IDENTITY_DEPTH: usize = 16;

pub const BASE_DESCRIPTOR_TABLE: &str = "Descriptor";
pub const BASE_DESCRIPTOR_ID: &str = "DescriptorId";

fn parse_or(value: &Option<String>, default: u32) -> u32 {
    value
        .as_deref()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn column_type(property: &EntityProperty) -> ColumnType {
    let constraints = &property.constraints;
    match property.property_type {
        PropertyType::Boolean => ColumnType::Boolean,
        PropertyType::Currency => ColumnType::Currency,
        PropertyType::Date => ColumnType::Date,
        PropertyType::Datetime => ColumnType::Datetime,
        PropertyType::Decimal => ColumnType::Decimal {
            total_digits: parse_or(&constraints.total_digits, 18),
            decimal_places: parse_or(&constraints.decimal_places, 4),
        },
        PropertyType::Duration => ColumnType::Duration,
        PropertyType::Percent => ColumnType::Percent,
        PropertyType::Short => ColumnType::Short,
        PropertyType::String => ColumnType::String {
            max_length: parse_or(&constraints.max_length, 255),
        },
        PropertyType::Time => ColumnType::Time,
        PropertyType::Year => ColumnType::Year,
        PropertyType::Integer
        | PropertyType::Association
        | PropertyType::Common
        | PropertyType::Descriptor
        | PropertyType::DomainEntity
        | PropertyType::Enumeration
        | PropertyType::InlineCommon => ColumnType::Integer,
    }
}

/// Table holding an entity's rows, as referenced by foreign keys.
pub fn table_name(entity: &Entity) -> String {
    match entity.model_type {
        ModelType::Descriptor => format!("{}Descriptor", entity.metaed_name),
        ModelType::Enumeration => format!("{}Type", entity.metaed_name),
        ModelType::DomainEntityExtension
        | ModelType::AssociationExtension
        | ModelType::CommonExtension => format!("{}Extension", entity.metaed_name),
        _ => entity.metaed_name.clone(),
    }
}

fn role_prefix(property: &EntityProperty) -> &str {
    if property.role_name == property.metaed_name {
        ""
    } else {
        &property.role_name
    }
}

/// Columns and foreign keys a property contributes to a table.
#[derive(Debug, Default)]
struct Contribution {
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
}

struct Builder<'a> {
    metaed: &'a MetaEdEnvironment,
}

impl<'a> Builder<'a> {
    /// Primary key columns of the table holding `id`, as seen by a referencing table.
    fn identity_columns(&self, id: EntityId, depth: usize) -> Vec<Column> {
        if depth > MAX_IDENTITY_DEPTH {
            tracing::warn!(entity = %self.metaed.entity(id).metaed_name, "identity chain too deep");
            return Vec::new();
        }
        let entity = self.metaed.entity(id);
        if entity.model_type.is_subclass() || entity.model_type.is_extension() {
            if let Some(base) = entity.base_entity {
                return self.identity_columns(base, depth + 1);
            }
        }
        match entity.model_type {
            ModelType::Descriptor => {
                vec![Column::new(&format!("{}DescriptorId", entity.metaed_name), ColumnType::Integer).primary_key()]
            }
            ModelType::Enumeration => {
                vec![Column::new(&format!("{}TypeId", entity.metaed_name), ColumnType::Integer).primary_key()]
            }
            _ => entity
                .identity_properties()
                .flat_map(|p| self.property_contribution(p, true, false, depth + 1).columns)
                .collect(),
        }
    }

    /// Single-valued contribution of `property`. Common and collection properties are
    /// handled by [`Builder::child_tables`] and contribute nothing here.
    fn property_contribution(
        &self,
        property: &EntityProperty,
        is_primary_key: bool,
        is_nullable: bool,
        depth: usize,
    ) -> Contribution {
        let shape = |column: Column| {
            let column = if is_primary_key { column.primary_key() } else { column };
            column.nullable(is_nullable).described(&property.documentation)
        };
        let mut contribution = Contribution::default();
        let full_name = property.full_property_name();

        match property.property_type {
            PropertyType::Common => {}
            PropertyType::Descriptor | PropertyType::Enumeration => {
                let suffix = if property.property_type == PropertyType::Descriptor {
                    "DescriptorId"
                } else {
                    "TypeId"
                };
                let column_id = format!("{full_name}{suffix}");
                contribution
                    .columns
                    .push(shape(Column::new(&column_id, ColumnType::Integer)));
                if let Some(target) = property.referenced_entity {
                    let target = self.metaed.entity(target);
                    contribution.foreign_keys.push(
                        ForeignKey::new(&schema_for(&target.namespace), &table_name(target))
                            .with_pair(&column_id, &format!("{}{suffix}", target.metaed_name)),
                    );
                }
            }
            PropertyType::DomainEntity | PropertyType::Association => {
                let Some(target) = property.referenced_entity else {
                    return contribution;
                };
                let prefix = role_prefix(property);
                let target_entity = self.metaed.entity(target);
                let mut foreign_key = ForeignKey::new(
                    &schema_for(&target_entity.namespace),
                    &table_name(target_entity),
                );
                for column in self.identity_columns(target, depth + 1) {
                    let column_id = format!("{prefix}{}", column.column_id);
                    foreign_key = foreign_key.with_pair(&column_id, &column.column_id);
                    contribution.columns.push(shape(Column {
                        column_id,
                        is_part_of_primary_key: false,
                        ..column
                    }));
                }
                contribution.foreign_keys.push(foreign_key);
            }
            PropertyType::InlineCommon => {
                let Some(common) = property.referenced_entity else {
                    return contribution;
                };
                let prefix = role_prefix(property);
                for inner in &self.metaed.entity(common).properties {
                    if inner.is_collection() || inner.property_type == PropertyType::Common {
                        continue;
                    }
                    let inner_nullable = is_nullable || !(inner.is_required || inner.is_part_of_identity);
                    let nested = self.property_contribution(inner, is_primary_key, inner_nullable, depth + 1);
                    contribution.columns.extend(nested.columns.into_iter().map(|c| Column {
                        column_id: format!("{prefix}{}", c.column_id),
                        ..c
                    }));
                    contribution.foreign_keys.extend(nested.foreign_keys.into_iter().map(|mut fk| {
                        for pair in &mut fk.column_pairs {
                            pair.parent_table_column_id = format!("{prefix}{}", pair.parent_table_column_id);
                        }
                        fk
                    }));
                }
            }
            _ => {
                contribution
                    .columns
                    .push(shape(Column::new(&full_name, column_type(property))));
            }
        }
        contribution
    }

    /// Adds `properties` to `table`, returning the child tables they require.
    fn add_properties(&self, table: &mut Table, properties: &[EntityProperty], key_properties: bool) -> Vec<Table> {
        let mut children = Vec::new();
        for property in properties {
            if property.is_collection() || property.property_type == PropertyType::Common {
                children.extend(self.child_tables(table, property));
                continue;
            }
            let is_primary_key = key_properties && property.is_part_of_identity;
            let is_nullable = !(property.is_required || property.is_part_of_identity);
            let contribution = self.property_contribution(property, is_primary_key, is_nullable, 0);
            table.add_columns(contribution.columns);
            table.foreign_keys.extend(contribution.foreign_keys);
        }
        children
    }

    fn child_tables(&self, parent: &Table, property: &EntityProperty) -> Vec<Table> {
        let mut child = Table::new(
            &parent.schema,
            &format!("{}{}", parent.table_id, property.full_property_name()),
            TableKind::Child,
        );
        child.description = property.documentation.clone();
        child.parent_table_id = Some(parent.table_id.clone());

        let mut to_parent = ForeignKey::new(&parent.schema, &parent.table_id);
        for column in parent.primary_key_columns() {
            to_parent = to_parent.with_pair(&column.column_id, &column.column_id);
        }
        child.add_columns(parent.primary_key_columns().cloned());
        child.foreign_keys.push(to_parent);

        let mut nested = Vec::new();
        if property.property_type == PropertyType::Common {
            if let Some(common) = property.referenced_entity {
                let common = self.metaed.entity(common);
                nested = self.add_properties(&mut child, &common.properties, property.is_collection());
            }
        } else {
            let contribution = self.property_contribution(property, true, false, 0);
            child.add_columns(contribution.columns);
            child.foreign_keys.extend(contribution.foreign_keys);
        }

        let mut tables = vec![child];
        tables.extend(nested);
        tables
    }

    fn entity_tables(&self, entity: &Entity) -> Vec<Table> {
        let kind = match entity.model_type {
            ModelType::DomainEntity | ModelType::Association => TableKind::EntityMain,
            ModelType::DomainEntitySubclass | ModelType::AssociationSubclass => TableKind::Subclass,
            _ => TableKind::Extension,
        };
        let mut table = Table::new(&schema_for(&entity.namespace), &table_name(entity), kind);
        table.description = entity.documentation.clone();
        table.entity = Some(entity.id);

        if kind != TableKind::EntityMain {
            let Some(base) = entity.base_entity else {
                tracing::debug!(entity = %entity.metaed_name, "no base entity, table skipped");
                return Vec::new();
            };
            let base_entity = self.metaed.entity(base);
            let mut to_base =
                ForeignKey::new(&schema_for(&base_entity.namespace), &table_name(base_entity));
            let key = self.identity_columns(base, 0);
            for column in &key {
                to_base = to_base.with_pair(&column.column_id, &column.column_id);
            }
            table.add_columns(key);
            table.foreign_keys.push(to_base);
            table.parent_table_id = Some(table_name(base_entity));
        }

        let children = self.add_properties(&mut table, &entity.properties, kind == TableKind::EntityMain);
        let mut tables = vec![table];
        tables.extend(children);
        tables
    }

    fn descriptor_tables(&self, entity: &Entity, base_schema: &str) -> Vec<Table> {
        let schema = schema_for(&entity.namespace);
        let id_column = format!("{}DescriptorId", entity.metaed_name);
        let mut table = Table::new(&schema, &table_name(entity), TableKind::Descriptor);
        table.description = entity.documentation.clone();
        table.entity = Some(entity.id);
        table.parent_table_id = Some(BASE_DESCRIPTOR_TABLE.to_string());
        table.add_columns([Column::new(&id_column, ColumnType::Integer).primary_key()]);
        table.foreign_keys.push(
            ForeignKey::new(base_schema, BASE_DESCRIPTOR_TABLE).with_pair(&id_column, BASE_DESCRIPTOR_ID),
        );

        let mut tables = Vec::new();
        if entity.is_map_type_required || entity.is_map_type_optional {
            let map_type = Table {
                description: format!("Enumeration items mapped from {}", entity.metaed_name),
                ..enumeration_table(&schema, &format!("{}Map", entity.metaed_name))
            };
            let map_column = format!("{}MapTypeId", entity.metaed_name);
            table.add_columns([Column::new(&map_column, ColumnType::Integer)
                .nullable(entity.is_map_type_optional)]);
            table.foreign_keys.push(
                ForeignKey::new(&schema, &map_type.table_id).with_pair(&map_column, &map_column),
            );
            tables.push(map_type);
        }
        tables.insert(0, table);
        tables
    }
}

fn enumeration_table(schema: &str, name: &str) -> Table {
    let mut table = Table::new(schema, &format!("{name}Type"), TableKind::Enumeration);
    table.add_columns([
        Column::new(&format!("{name}TypeId"), ColumnType::Integer).primary_key(),
        Column::new("CodeValue", ColumnType::String { max_length: 50 }),
        Column::new("Description", ColumnType::String { max_length: 1024 }),
        Column::new("ShortDescription", ColumnType::String { max_length: 450 }),
    ]);
    table
}

pub fn base_descriptor_table(schema: &str) -> Table {
    let mut table = Table::new(schema, BASE_DESCRIPTOR_TABLE, TableKind::BaseDescriptor);
    table.description = "This is the base entity for the descriptor pattern.".to_string();
    table.add_columns([
        Column::new(BASE_DESCRIPTOR_ID, ColumnType::Integer).primary_key(),
        Column::new("Namespace", ColumnType::String { max_length: 255 }),
        Column::new("CodeValue", ColumnType::String { max_length: 50 }),
        Column::new("ShortDescription", ColumnType::String { max_length: 75 }),
        Column::new("Description", ColumnType::String { max_length: 1024 }).nullable(true),
    ]);
    table
}

/// The nearest non-extension namespace in `namespace`'s chain; it holds the base descriptor table.
fn base_descriptor_namespace(metaed: &MetaEdEnvironment, namespace: &str) -> String {
    metaed
        .namespace_chain(namespace)
        .into_iter()
        .find(|ns| metaed.namespace(ns).is_some_and(|n| !n.is_extension))
        .unwrap_or_else(|| namespace.to_string())
}

/// Every table of the model as `(namespace, table)`.
pub fn build_tables(metaed: &MetaEdEnvironment) -> Vec<(String, Table)> {
    let builder = Builder { metaed };
    let mut tables: Vec<(String, Table)> = Vec::new();
    let mut base_descriptor_namespaces: BTreeSet<String> = BTreeSet::new();

    for entity in &metaed.entities {
        let built = match entity.model_type {
            ModelType::DomainEntity
            | ModelType::Association
            | ModelType::DomainEntitySubclass
            | ModelType::AssociationSubclass
            | ModelType::DomainEntityExtension
            | ModelType::AssociationExtension => builder.entity_tables(entity),
            ModelType::Descriptor => {
                let base = base_descriptor_namespace(metaed, &entity.namespace);
                let tables = builder.descriptor_tables(entity, &schema_for(&base));
                base_descriptor_namespaces.insert(base);
                tables
            }
            ModelType::Enumeration => {
                let mut table = enumeration_table(&schema_for(&entity.namespace), &entity.metaed_name);
                table.description = entity.documentation.clone();
                table.entity = Some(entity.id);
                vec![table]
            }
            _ => Vec::new(),
        };
        tables.extend(built.into_iter().map(|t| (entity.namespace.clone(), t)));
    }

    for namespace in base_descriptor_namespaces {
        let table = base_descriptor_table(&schema_for(&namespace));
        tables.push((namespace, table));
    }
    tables
}
