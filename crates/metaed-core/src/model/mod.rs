//! MetaEd semantic model.
//!
//! Entities live in an arena owned by [`crate::MetaEdEnvironment`] and are addressed by
//! [`EntityId`]. Cross-entity relations (`base_entity`, `referenced_entity`) are ids resolved
//! by linking enhancers after every entity is loaded; they are lookups, never ownership.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod namespace;

pub use namespace::Namespace;

pub type Name = String;

/// Stable arena index of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Model types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    Association,
    AssociationExtension,
    AssociationSubclass,
    Common,
    CommonExtension,
    Descriptor,
    DomainEntity,
    DomainEntityExtension,
    DomainEntitySubclass,
    Enumeration,
    Interchange,
    InterchangeExtension,
}

pub const ALL_MODEL_TYPES: &[ModelType] = &[
    ModelType::Association,
    ModelType::AssociationExtension,
    ModelType::AssociationSubclass,
    ModelType::Common,
    ModelType::CommonExtension,
    ModelType::Descriptor,
    ModelType::DomainEntity,
    ModelType::DomainEntityExtension,
    ModelType::DomainEntitySubclass,
    ModelType::Enumeration,
    ModelType::Interchange,
    ModelType::InterchangeExtension,
];

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Association => "association",
            ModelType::AssociationExtension => "associationExtension",
            ModelType::AssociationSubclass => "associationSubclass",
            ModelType::Common => "common",
            ModelType::CommonExtension => "commonExtension",
            ModelType::Descriptor => "descriptor",
            ModelType::DomainEntity => "domainEntity",
            ModelType::DomainEntityExtension => "domainEntityExtension",
            ModelType::DomainEntitySubclass => "domainEntitySubclass",
            ModelType::Enumeration => "enumeration",
            ModelType::Interchange => "interchange",
            ModelType::InterchangeExtension => "interchangeExtension",
        }
    }

    pub fn is_extension(self) -> bool {
        matches!(
            self,
            ModelType::AssociationExtension
                | ModelType::CommonExtension
                | ModelType::DomainEntityExtension
                | ModelType::InterchangeExtension
        )
    }

    pub fn is_subclass(self) -> bool {
        matches!(
            self,
            ModelType::AssociationSubclass | ModelType::DomainEntitySubclass
        )
    }

    /// Model types a subclass or extension of this type may name as its base.
    pub fn base_types(self) -> &'static [ModelType] {
        match self {
            ModelType::AssociationExtension | ModelType::AssociationSubclass => &[
                ModelType::Association,
                ModelType::AssociationSubclass,
            ],
            ModelType::DomainEntityExtension | ModelType::DomainEntitySubclass => &[
                ModelType::DomainEntity,
                ModelType::DomainEntitySubclass,
            ],
            ModelType::CommonExtension => &[ModelType::Common],
            ModelType::InterchangeExtension => &[ModelType::Interchange],
            _ => &[],
        }
    }

    /// The extension type whose entities add to entities of this type, if any.
    pub fn extension_type(self) -> Option<ModelType> {
        match self {
            ModelType::Association | ModelType::AssociationSubclass => {
                Some(ModelType::AssociationExtension)
            }
            ModelType::DomainEntity | ModelType::DomainEntitySubclass => {
                Some(ModelType::DomainEntityExtension)
            }
            ModelType::Common => Some(ModelType::CommonExtension),
            ModelType::Interchange => Some(ModelType::InterchangeExtension),
            _ => None,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    Association,
    Boolean,
    Common,
    Currency,
    Date,
    Datetime,
    Decimal,
    Descriptor,
    DomainEntity,
    Duration,
    Enumeration,
    InlineCommon,
    Integer,
    Percent,
    Short,
    String,
    Time,
    Year,
}

impl PropertyType {
    /// Maps a property keyword as written in MetaEd source (`domain entity`, `bool`, ...).
    pub fn from_keyword(keyword: &str) -> Option<PropertyType> {
        let ty = match keyword {
            "association" => PropertyType::Association,
            "bool" | "boolean" => PropertyType::Boolean,
            "common" => PropertyType::Common,
            "currency" => PropertyType::Currency,
            "date" => PropertyType::Date,
            "datetime" => PropertyType::Datetime,
            "decimal" => PropertyType::Decimal,
            "descriptor" => PropertyType::Descriptor,
            "domain entity" => PropertyType::DomainEntity,
            "duration" => PropertyType::Duration,
            "enumeration" => PropertyType::Enumeration,
            "inline common" => PropertyType::InlineCommon,
            "integer" => PropertyType::Integer,
            "percent" => PropertyType::Percent,
            "short" => PropertyType::Short,
            "string" => PropertyType::String,
            "time" => PropertyType::Time,
            "year" => PropertyType::Year,
            _ => return None,
        };
        Some(ty)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PropertyType::Association => "association",
            PropertyType::Boolean => "bool",
            PropertyType::Common => "common",
            PropertyType::Currency => "currency",
            PropertyType::Date => "date",
            PropertyType::Datetime => "datetime",
            PropertyType::Decimal => "decimal",
            PropertyType::Descriptor => "descriptor",
            PropertyType::DomainEntity => "domain entity",
            PropertyType::Duration => "duration",
            PropertyType::Enumeration => "enumeration",
            PropertyType::InlineCommon => "inline common",
            PropertyType::Integer => "integer",
            PropertyType::Percent => "percent",
            PropertyType::Short => "short",
            PropertyType::String => "string",
            PropertyType::Time => "time",
            PropertyType::Year => "year",
        }
    }

    /// Entity types a property of this type may reference. Empty for simple properties.
    pub fn referenced_types(self) -> &'static [ModelType] {
        match self {
            PropertyType::Association => &[
                ModelType::Association,
                ModelType::AssociationSubclass,
            ],
            PropertyType::Common | PropertyType::InlineCommon => &[ModelType::Common],
            PropertyType::Descriptor => &[ModelType::Descriptor],
            PropertyType::DomainEntity => &[
                ModelType::DomainEntity,
                ModelType::DomainEntitySubclass,
            ],
            PropertyType::Enumeration => &[ModelType::Enumeration],
            _ => &[],
        }
    }

    pub fn is_referential(self) -> bool {
        !self.referenced_types().is_empty()
    }

    /// Domain entity, association and descriptor references carry identity and ordering.
    pub fn is_entity_reference(self) -> bool {
        matches!(
            self,
            PropertyType::Association | PropertyType::DomainEntity | PropertyType::Descriptor
        )
    }

    pub fn is_common(self) -> bool {
        matches!(self, PropertyType::Common | PropertyType::InlineCommon)
    }
}

/// Position of a token in the concatenated source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceMap {
    /// 1-based line number across the concatenation of all loaded files.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
}

impl SourceMap {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyConstraints {
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub total_digits: Option<String>,
    pub decimal_places: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProperty {
    pub property_type: PropertyType,
    pub metaed_name: Name,
    /// Namespace of the entity that owns this property.
    pub namespace: Name,
    /// Namespace qualifier written on the reference, or the owner's namespace.
    pub referenced_namespace_name: Name,
    pub documentation: String,
    pub documentation_inherited: bool,
    pub role_name: Name,
    pub shorten_to: Name,
    pub is_part_of_identity: bool,
    pub is_required: bool,
    pub is_optional: bool,
    pub is_required_collection: bool,
    pub is_optional_collection: bool,
    pub is_queryable_only: bool,
    pub constraints: PropertyConstraints,
    pub referenced_entity: Option<EntityId>,
    pub source_map: SourceMap,
}

impl EntityProperty {
    pub fn new(property_type: PropertyType, metaed_name: &str, namespace: &str) -> Self {
        Self {
            property_type,
            metaed_name: metaed_name.to_string(),
            namespace: namespace.to_string(),
            referenced_namespace_name: namespace.to_string(),
            documentation: String::new(),
            documentation_inherited: false,
            role_name: String::new(),
            shorten_to: String::new(),
            is_part_of_identity: false,
            is_required: false,
            is_optional: false,
            is_required_collection: false,
            is_optional_collection: false,
            is_queryable_only: false,
            constraints: PropertyConstraints::default(),
            referenced_entity: None,
            source_map: SourceMap::default(),
        }
    }

    /// Role name prefixed onto the property name, unless the role name repeats it.
    pub fn full_property_name(&self) -> String {
        if self.role_name.is_empty() || self.role_name == self.metaed_name {
            self.metaed_name.clone()
        } else {
            format!("{}{}", self.role_name, self.metaed_name)
        }
    }

    pub fn is_collection(&self) -> bool {
        self.is_required_collection || self.is_optional_collection
    }

    /// Whether a reference through this property must be present.
    pub fn is_required_reference(&self) -> bool {
        self.is_part_of_identity || self.is_required || self.is_required_collection
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerationItem {
    pub short_description: String,
    pub documentation: String,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterchangeItemType {
    Association,
    Descriptor,
    DomainEntity,
}

impl InterchangeItemType {
    pub fn referenced_types(self) -> &'static [ModelType] {
        match self {
            InterchangeItemType::Association => &[
                ModelType::Association,
                ModelType::AssociationSubclass,
            ],
            InterchangeItemType::Descriptor => &[ModelType::Descriptor],
            InterchangeItemType::DomainEntity => &[
                ModelType::DomainEntity,
                ModelType::DomainEntitySubclass,
            ],
        }
    }
}

/// A member (element or identity template) of an interchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeItem {
    pub metaed_name: Name,
    pub item_type: InterchangeItemType,
    pub referenced_namespace_name: Name,
    pub referenced_entity: Option<EntityId>,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub model_type: ModelType,
    pub is_abstract: bool,
    pub namespace: Name,
    pub metaed_name: Name,
    pub documentation: String,
    pub documentation_inherited: bool,
    pub extended_documentation: String,
    pub use_case_documentation: String,
    pub properties: Vec<EntityProperty>,
    pub base_entity_name: Name,
    pub base_entity_namespace_name: Name,
    pub base_entity: Option<EntityId>,
    pub enumeration_items: Vec<EnumerationItem>,
    pub is_map_type_required: bool,
    pub is_map_type_optional: bool,
    pub elements: Vec<InterchangeItem>,
    pub identity_templates: Vec<InterchangeItem>,
    pub source_map: SourceMap,
}

impl Entity {
    /// A fresh entity; the repository assigns the final id on insertion.
    pub fn new(model_type: ModelType, namespace: &str, metaed_name: &str) -> Self {
        Self {
            id: EntityId(u32::MAX),
            model_type,
            is_abstract: false,
            namespace: namespace.to_string(),
            metaed_name: metaed_name.to_string(),
            documentation: String::new(),
            documentation_inherited: false,
            extended_documentation: String::new(),
            use_case_documentation: String::new(),
            properties: Vec::new(),
            base_entity_name: String::new(),
            base_entity_namespace_name: String::new(),
            base_entity: None,
            enumeration_items: Vec::new(),
            is_map_type_required: false,
            is_map_type_optional: false,
            elements: Vec::new(),
            identity_templates: Vec::new(),
            source_map: SourceMap::default(),
        }
    }

    pub fn identity_properties(&self) -> impl Iterator<Item = &EntityProperty> {
        self.properties.iter().filter(|p| p.is_part_of_identity)
    }

    pub fn has_base(&self) -> bool {
        self.model_type.is_subclass() || self.model_type.is_extension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_property_name_prefixes_distinct_role_name() {
        let mut property = EntityProperty::new(PropertyType::DomainEntity, "School", "EdFi");
        assert_eq!(property.full_property_name(), "School");

        property.role_name = "Responsibility".to_string();
        assert_eq!(property.full_property_name(), "ResponsibilitySchool");

        property.role_name = "School".to_string();
        assert_eq!(property.full_property_name(), "School");
    }

    #[test]
    fn keywords_map_back_to_property_types() {
        for keyword in ["domain entity", "inline common", "bool", "string", "descriptor"] {
            let ty = PropertyType::from_keyword(keyword).expect("known keyword");
            assert_eq!(PropertyType::from_keyword(ty.keyword()), Some(ty));
        }
        assert_eq!(PropertyType::from_keyword("shared string"), None);
    }

    #[test]
    fn required_reference_covers_identity_and_required_collection() {
        let mut property = EntityProperty::new(PropertyType::Association, "A", "EdFi");
        assert!(!property.is_required_reference());
        property.is_required_collection = true;
        assert!(property.is_required_reference());
        property.is_required_collection = false;
        property.is_part_of_identity = true;
        assert!(property.is_required_reference());
    }
}
