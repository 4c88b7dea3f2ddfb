//! MetaEd source grammar.
//!
//! The surface syntax is line-oriented: every statement sits on its own line and nesting is
//! implied by keywords, so indentation is cosmetic. The parser runs over the concatenation of
//! all loaded files and produces a [`ParseTree`] of namespace blocks.
//!
//! Error recovery is per namespace block: the first syntax error inside
//! `Begin Namespace` .. `End Namespace` is recorded and the rest of that block is skipped, so
//! one broken project does not hide the others.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::many1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::model::{InterchangeItemType, SourceMap};

pub mod text_builder;

pub use text_builder::MetaEdTextBuilder;

// ============================================================================
// Parse tree
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTree {
    pub namespaces: Vec<NamespaceNode>,
    pub syntax_errors: Vec<SyntaxError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub message: String,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceNode {
    pub namespace_name: String,
    /// `core` or the extension project prefix.
    pub project_extension: String,
    pub entities: Vec<EntityNode>,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKeyword {
    AbstractEntity,
    Association,
    Common,
    Descriptor,
    DomainEntity,
    Enumeration,
    Interchange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderForm {
    Plain,
    /// `X based on [Ns.]Base`
    Subclass {
        base_namespace: Option<String>,
        base_name: String,
    },
    /// `[Ns.]X additions`
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Documentation {
    Text(String),
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyModifier {
    PartOfIdentity,
    Required,
    Optional,
    RequiredCollection,
    OptionalCollection,
    QueryableOnly,
    RoleName {
        name: String,
        shorten_to: Option<String>,
    },
    MinLength(String),
    MaxLength(String),
    MinValue(String),
    MaxValue(String),
    TotalDigits(String),
    DecimalPlaces(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNode {
    /// Type keyword as written (`domain entity`, `string`, ...); validated by the builder.
    pub keyword: String,
    pub namespace_qualifier: Option<String>,
    pub name: String,
    pub documentation: Option<Documentation>,
    pub modifiers: Vec<PropertyModifier>,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemNode {
    pub short_description: String,
    pub documentation: Option<String>,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterchangeMemberNode {
    pub item_type: InterchangeItemType,
    pub namespace_qualifier: Option<String>,
    pub name: String,
    pub source_map: SourceMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityNode {
    pub keyword: EntityKeyword,
    pub form: HeaderForm,
    pub namespace_qualifier: Option<String>,
    pub name: String,
    pub documentation: Option<Documentation>,
    pub extended_documentation: Option<String>,
    pub use_case_documentation: Option<String>,
    pub properties: Vec<PropertyNode>,
    pub items: Vec<ItemNode>,
    /// `Some(true)` for `with map type`, `Some(false)` for `with optional map type`.
    pub map_type_required: Option<bool>,
    pub elements: Vec<InterchangeMemberNode>,
    pub identity_templates: Vec<InterchangeMemberNode>,
    pub source_map: SourceMap,
}

// ============================================================================
// Line parsers
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    )))(input)
}

/// `Name` or `Namespace.Name`.
fn parse_qualified_ident(input: &str) -> IResult<&str, (Option<String>, String)> {
    let (input, first) = parse_ident(input)?;
    let (input, second) = opt(preceded(pchar('.'), parse_ident))(input)?;
    Ok(match second {
        Some(name) => (input, (Some(first.to_string()), name.to_string())),
        None => (input, (None, first.to_string())),
    })
}

fn parse_lower_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_lowercase())(input)
}

fn parse_number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(pchar('-')),
        digit1,
        opt(pair(pchar('.'), digit1)),
    )))(input)
}

fn parse_quoted(input: &str) -> IResult<&str, &str> {
    delimited(pchar('"'), take_while(|c| c != '"'), pchar('"'))(input)
}

fn parse_namespace_header(rest: &str) -> Result<(String, String), String> {
    fn parser(input: &str) -> IResult<&str, (String, String)> {
        let (input, name) = parse_ident(input)?;
        let (input, _) = multispace1(input)?;
        let (input, extension) = parse_ident(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, (name.to_string(), extension.to_string())))
    }

    all_consuming(parser)(rest.trim())
        .map(|(_, v)| v)
        .map_err(|_| {
            "namespace header expects: `Begin Namespace <Name> <core|ProjectExtension>`".to_string()
        })
}

struct EntityHeader {
    keyword: EntityKeyword,
    namespace_qualifier: Option<String>,
    name: String,
    form: HeaderForm,
}

fn parse_entity_header(line: &str) -> Result<EntityHeader, String> {
    fn keyword(input: &str) -> IResult<&str, EntityKeyword> {
        alt((
            value(EntityKeyword::DomainEntity, tag("Domain Entity")),
            value(EntityKeyword::AbstractEntity, tag("Abstract Entity")),
            value(EntityKeyword::Association, tag("Association")),
            value(EntityKeyword::Common, tag("Common")),
            value(EntityKeyword::Descriptor, tag("Descriptor")),
            value(EntityKeyword::Enumeration, tag("Enumeration")),
            value(EntityKeyword::Interchange, tag("Interchange")),
        ))(input)
    }

    fn form(input: &str) -> IResult<&str, HeaderForm> {
        alt((
            map(
                preceded(
                    tuple((
                        multispace1,
                        tag("based"),
                        multispace1,
                        tag("on"),
                        multispace1,
                    )),
                    parse_qualified_ident,
                ),
                |(base_namespace, base_name)| HeaderForm::Subclass {
                    base_namespace,
                    base_name,
                },
            ),
            value(HeaderForm::Extension, preceded(multispace1, tag("additions"))),
        ))(input)
    }

    fn parser(input: &str) -> IResult<&str, EntityHeader> {
        let (input, keyword) = keyword(input)?;
        let (input, _) = multispace1(input)?;
        let (input, (namespace_qualifier, name)) = parse_qualified_ident(input)?;
        let (input, form) = opt(form)(input)?;
        let (input, _) = multispace0(input)?;
        Ok((
            input,
            EntityHeader {
                keyword,
                namespace_qualifier,
                name,
                form: form.unwrap_or(HeaderForm::Plain),
            },
        ))
    }

    let header = all_consuming(parser)(line.trim())
        .map(|(_, v)| v)
        .map_err(|_| {
            "entity header expects: `<Keyword> <Name>`, `<Keyword> <Name> based on <Base>` or `<Keyword> <Name> additions`"
                .to_string()
        })?;

    let allowed = match (&header.keyword, &header.form) {
        (_, HeaderForm::Plain) => true,
        (EntityKeyword::DomainEntity | EntityKeyword::Association, _) => true,
        (EntityKeyword::Common | EntityKeyword::Interchange, HeaderForm::Extension) => true,
        _ => false,
    };
    if !allowed {
        return Err(format!(
            "{:?} does not support this header form",
            header.keyword
        ));
    }
    if header.namespace_qualifier.is_some() && header.form != HeaderForm::Extension {
        return Err("only `additions` headers may qualify the entity name".to_string());
    }
    Ok(header)
}

fn parse_modifier(line: &str) -> Option<PropertyModifier> {
    fn numeric(input: &str) -> IResult<&str, PropertyModifier> {
        let (input, key) = alt((
            tag("min length"),
            tag("max length"),
            tag("min value"),
            tag("max value"),
            tag("total digits"),
            tag("decimal places"),
        ))(input)?;
        let (input, number) = preceded(multispace1, parse_number)(input)?;
        let number = number.to_string();
        let modifier = match key {
            "min length" => PropertyModifier::MinLength(number),
            "max length" => PropertyModifier::MaxLength(number),
            "min value" => PropertyModifier::MinValue(number),
            "max value" => PropertyModifier::MaxValue(number),
            "total digits" => PropertyModifier::TotalDigits(number),
            _ => PropertyModifier::DecimalPlaces(number),
        };
        Ok((input, modifier))
    }

    fn role_name(input: &str) -> IResult<&str, PropertyModifier> {
        let (input, _) = terminated(tag("role name"), multispace1)(input)?;
        let (input, name) = parse_ident(input)?;
        let (input, shorten_to) = opt(preceded(
            tuple((multispace1, tag("shorten to"), multispace1)),
            parse_ident,
        ))(input)?;
        Ok((
            input,
            PropertyModifier::RoleName {
                name: name.to_string(),
                shorten_to: shorten_to.map(str::to_string),
            },
        ))
    }

    fn parser(input: &str) -> IResult<&str, PropertyModifier> {
        terminated(
            alt((
                value(PropertyModifier::PartOfIdentity, tag("is part of identity")),
                value(
                    PropertyModifier::RequiredCollection,
                    tag("is required collection"),
                ),
                value(
                    PropertyModifier::OptionalCollection,
                    tag("is optional collection"),
                ),
                value(PropertyModifier::QueryableOnly, tag("is queryable only")),
                value(PropertyModifier::Required, tag("is required")),
                value(PropertyModifier::Optional, tag("is optional")),
                role_name,
                numeric,
            )),
            multispace0,
        )(input)
    }

    all_consuming(parser)(line).map(|(_, v)| v).ok()
}

/// `<lowercase keyword words> [Ns.]Name`
fn parse_property_decl(line: &str) -> Option<(String, Option<String>, String)> {
    fn parser(input: &str) -> IResult<&str, (String, Option<String>, String)> {
        let (input, words) = many1(terminated(parse_lower_word, multispace1))(input)?;
        let (input, (namespace, name)) = parse_qualified_ident(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, (words.join(" "), namespace, name)))
    }

    all_consuming(parser)(line).map(|(_, v)| v).ok()
}

fn parse_interchange_member(line: &str) -> Option<(InterchangeItemType, bool, Option<String>, String)> {
    fn parser(input: &str) -> IResult<&str, (InterchangeItemType, bool, Option<String>, String)> {
        let (input, (item_type, is_identity)) = alt((
            value(
                (InterchangeItemType::DomainEntity, true),
                tag("domain entity identity"),
            ),
            value(
                (InterchangeItemType::Association, true),
                tag("association identity"),
            ),
            value((InterchangeItemType::DomainEntity, false), tag("domain entity")),
            value((InterchangeItemType::Association, false), tag("association")),
            value((InterchangeItemType::Descriptor, false), tag("descriptor")),
        ))(input)?;
        let (input, _) = multispace1(input)?;
        let (input, (namespace, name)) = parse_qualified_ident(input)?;
        let (input, _) = multispace0(input)?;
        Ok((input, (item_type, is_identity, namespace, name)))
    }

    all_consuming(parser)(line).map(|(_, v)| v).ok()
}

fn parse_item(line: &str) -> Option<String> {
    all_consuming(terminated(
        preceded(pair(tag("item"), multispace1), parse_quoted),
        multispace0,
    ))(line)
    .map(|(_, v)| v.to_string())
    .ok()
}

fn parse_doc_line(line: &str) -> Option<String> {
    all_consuming(terminated(parse_quoted, multispace0))(line)
        .map(|(_, v)| v.to_string())
        .ok()
}

/// Drops a `//` comment, ignoring `//` inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'"' => in_quotes = !in_quotes,
            b'/' if !in_quotes && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
    }
    line
}

// ============================================================================
// Block parser
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocTarget {
    Entity,
    Extended,
    UseCase,
    Property,
    Item,
    MapType,
}

/// What the last statement opened, for attaching documentation and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Entity,
    Property,
    Item,
    MapType,
    Member,
}

struct NamespaceBlock {
    node: NamespaceNode,
    entity: Option<EntityNode>,
    last: Last,
    doc_target: Option<DocTarget>,
}

impl NamespaceBlock {
    fn close_entity(&mut self) {
        if let Some(entity) = self.entity.take() {
            self.node.entities.push(entity);
        }
    }

    fn append_doc(&mut self, text: String) -> Result<(), String> {
        let target = self
            .doc_target
            .ok_or_else(|| "quoted text outside of documentation".to_string())?;
        let entity = self
            .entity
            .as_mut()
            .ok_or_else(|| "documentation outside of an entity".to_string())?;
        fn join(existing: &mut Option<String>, text: String) {
            match existing {
                Some(s) => {
                    s.push(' ');
                    s.push_str(&text);
                }
                None => *existing = Some(text),
            }
        }
        match target {
            DocTarget::Entity => join_documentation(&mut entity.documentation, text),
            DocTarget::Extended => join(&mut entity.extended_documentation, text),
            DocTarget::UseCase => join(&mut entity.use_case_documentation, text),
            DocTarget::Property => {
                if let Some(property) = entity.properties.last_mut() {
                    join_documentation(&mut property.documentation, text);
                }
            }
            DocTarget::Item => {
                if let Some(item) = entity.items.last_mut() {
                    join(&mut item.documentation, text);
                }
            }
            DocTarget::MapType => {}
        }
        Ok(())
    }

    fn mark_inherited(&mut self) -> Result<(), String> {
        let entity = self
            .entity
            .as_mut()
            .ok_or_else(|| "documentation outside of an entity".to_string())?;
        match self.doc_target {
            Some(DocTarget::Entity) if entity.documentation.is_none() => {
                entity.documentation = Some(Documentation::Inherited);
            }
            Some(DocTarget::Property) => match entity.properties.last_mut() {
                Some(property) if property.documentation.is_none() => {
                    property.documentation = Some(Documentation::Inherited);
                }
                _ => return Err("`inherited` must directly follow `documentation`".to_string()),
            },
            _ => return Err("`inherited` must directly follow `documentation`".to_string()),
        }
        self.doc_target = None;
        Ok(())
    }

    /// Handles one statement inside the namespace block.
    fn statement(&mut self, line: &str, source_map: SourceMap) -> Result<(), String> {
        if let Some(text) = parse_doc_line(line) {
            return self.append_doc(text);
        }
        if line == "inherited" {
            return self.mark_inherited();
        }
        self.doc_target = None;

        if line.starts_with(|c: char| c.is_ascii_uppercase()) {
            let header = parse_entity_header(line)?;
            self.close_entity();
            self.entity = Some(EntityNode {
                keyword: header.keyword,
                form: header.form,
                namespace_qualifier: header.namespace_qualifier,
                name: header.name,
                documentation: None,
                extended_documentation: None,
                use_case_documentation: None,
                properties: vec![],
                items: vec![],
                map_type_required: None,
                elements: vec![],
                identity_templates: vec![],
                source_map,
            });
            self.last = Last::Entity;
            return Ok(());
        }

        let Some(entity) = self.entity.as_mut() else {
            return Err(format!("unexpected `{line}` outside of an entity"));
        };

        match line {
            "documentation" => {
                self.doc_target = Some(match self.last {
                    Last::Entity | Last::Member => DocTarget::Entity,
                    Last::Property => DocTarget::Property,
                    Last::Item => DocTarget::Item,
                    Last::MapType => DocTarget::MapType,
                });
                return Ok(());
            }
            "extended documentation" | "use case documentation"
                if entity.keyword == EntityKeyword::Interchange =>
            {
                self.doc_target = Some(if line.starts_with("extended") {
                    DocTarget::Extended
                } else {
                    DocTarget::UseCase
                });
                return Ok(());
            }
            "with map type" | "with optional map type"
                if entity.keyword == EntityKeyword::Descriptor =>
            {
                entity.map_type_required = Some(line == "with map type");
                self.last = Last::MapType;
                return Ok(());
            }
            _ => {}
        }

        match entity.keyword {
            EntityKeyword::Interchange => {
                let (item_type, is_identity, namespace_qualifier, name) =
                    parse_interchange_member(line).ok_or_else(|| {
                        format!("interchange member expects: `domain entity|association|descriptor [identity] <Name>`, found `{line}`")
                    })?;
                let member = InterchangeMemberNode {
                    item_type,
                    namespace_qualifier,
                    name,
                    source_map,
                };
                if is_identity {
                    entity.identity_templates.push(member);
                } else {
                    entity.elements.push(member);
                }
                self.last = Last::Member;
                Ok(())
            }
            EntityKeyword::Enumeration | EntityKeyword::Descriptor
                if line.starts_with("item ") =>
            {
                let short_description = parse_item(line)
                    .ok_or_else(|| "item expects: `item \"<Description>\"`".to_string())?;
                entity.items.push(ItemNode {
                    short_description,
                    documentation: None,
                    source_map,
                });
                self.last = Last::Item;
                Ok(())
            }
            EntityKeyword::Enumeration => Err(format!(
                "enumerations contain only documentation and items, found `{line}`"
            )),
            _ => {
                if let Some(modifier) = parse_modifier(line) {
                    let property = entity
                        .properties
                        .last_mut()
                        .filter(|_| self.last == Last::Property)
                        .ok_or_else(|| format!("`{line}` must follow a property"))?;
                    property.modifiers.push(modifier);
                    return Ok(());
                }
                let (keyword, namespace_qualifier, name) = parse_property_decl(line)
                    .ok_or_else(|| format!("unrecognized statement `{line}`"))?;
                entity.properties.push(PropertyNode {
                    keyword,
                    namespace_qualifier,
                    name,
                    documentation: None,
                    modifiers: vec![],
                    source_map,
                });
                self.last = Last::Property;
                Ok(())
            }
        }
    }
}

fn join_documentation(existing: &mut Option<Documentation>, text: String) {
    match existing {
        Some(Documentation::Text(s)) => {
            s.push(' ');
            s.push_str(&text);
        }
        _ => *existing = Some(Documentation::Text(text)),
    }
}

/// Parses concatenated MetaEd source. Never fails as a whole: syntax errors are collected
/// in the returned tree and the offending namespace block is left out.
pub fn parse_metaed(text: &str) -> ParseTree {
    let mut tree = ParseTree::default();
    let mut block: Option<NamespaceBlock> = None;
    let mut skipping = false;

    for (i, raw) in text.lines().enumerate() {
        let column = raw.len() - raw.trim_start().len();
        let source_map = SourceMap::new(i + 1, column);
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if skipping {
            if line == "End Namespace" {
                skipping = false;
            }
            continue;
        }

        if line == "End Namespace" {
            match block.take() {
                Some(mut open) => {
                    open.close_entity();
                    tree.namespaces.push(open.node);
                }
                None => tree.syntax_errors.push(SyntaxError {
                    message: "`End Namespace` without a matching `Begin Namespace`".to_string(),
                    source_map,
                }),
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("Begin Namespace") {
            if let Some(open) = block.take() {
                tree.syntax_errors.push(SyntaxError {
                    message: format!(
                        "namespace {} is missing `End Namespace`",
                        open.node.namespace_name
                    ),
                    source_map,
                });
            }
            match parse_namespace_header(rest) {
                Ok((namespace_name, project_extension)) => {
                    block = Some(NamespaceBlock {
                        node: NamespaceNode {
                            namespace_name,
                            project_extension,
                            entities: vec![],
                            source_map,
                        },
                        entity: None,
                        last: Last::Entity,
                        doc_target: None,
                    });
                }
                Err(message) => {
                    tree.syntax_errors.push(SyntaxError { message, source_map });
                    skipping = true;
                }
            }
            continue;
        }

        let Some(open) = block.as_mut() else {
            tree.syntax_errors.push(SyntaxError {
                message: format!("unexpected `{line}` outside of a namespace"),
                source_map,
            });
            continue;
        };

        if let Err(message) = open.statement(line, source_map) {
            tracing::debug!(
                namespace = %open.node.namespace_name,
                line = source_map.line,
                %message,
                "syntax error, skipping rest of namespace"
            );
            tree.syntax_errors.push(SyntaxError { message, source_map });
            block = None;
            skipping = true;
        }
    }

    if let Some(open) = block {
        let line = text.lines().count();
        tree.syntax_errors.push(SyntaxError {
            message: format!(
                "namespace {} is missing `End Namespace`",
                open.node.namespace_name
            ),
            source_map: SourceMap::new(line, 0),
        });
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entity_with_properties_and_modifiers() {
        let text = r#"
Begin Namespace EdFi core
  Domain Entity School // trailing comment
    documentation "A school."
    string SchoolName
      documentation "The name, see http://example.org"
      is part of identity
      max length 75
    domain entity EdFi.LocalEducationAgency
      documentation "The LEA."
      is optional
      role name Parent shorten to P
End Namespace
"#;
        let tree = parse_metaed(text);
        assert!(tree.syntax_errors.is_empty(), "{:?}", tree.syntax_errors);
        let entity = &tree.namespaces[0].entities[0];
        assert_eq!(entity.keyword, EntityKeyword::DomainEntity);
        assert_eq!(entity.name, "School");
        assert_eq!(
            entity.documentation,
            Some(Documentation::Text("A school.".into()))
        );
        assert_eq!(entity.properties.len(), 2);
        assert_eq!(
            entity.properties[0].documentation,
            Some(Documentation::Text("The name, see http://example.org".into()))
        );
        assert_eq!(
            entity.properties[0].modifiers,
            vec![
                PropertyModifier::PartOfIdentity,
                PropertyModifier::MaxLength("75".into())
            ]
        );
        let reference = &entity.properties[1];
        assert_eq!(reference.keyword, "domain entity");
        assert_eq!(reference.namespace_qualifier.as_deref(), Some("EdFi"));
        assert_eq!(
            reference.modifiers[1],
            PropertyModifier::RoleName {
                name: "Parent".into(),
                shorten_to: Some("P".into())
            }
        );
        assert_eq!(entity.source_map, SourceMap::new(3, 2));
    }

    #[test]
    fn parses_subclass_extension_and_interchange_headers() {
        let text = "Begin Namespace Sample SAMPLE\n\
                    Domain Entity EdFi.School additions\n\
                    integer Bus\n\
                    Association Sub based on EdFi.Base\n\
                    Interchange Students\n\
                    extended documentation\n\
                    \"More\"\n\
                    domain entity Student\n\
                    domain entity identity School\n\
                    End Namespace\n";
        let tree = parse_metaed(text);
        assert!(tree.syntax_errors.is_empty(), "{:?}", tree.syntax_errors);
        let ns = &tree.namespaces[0];
        assert_eq!(ns.project_extension, "SAMPLE");
        assert_eq!(ns.entities[0].form, HeaderForm::Extension);
        assert_eq!(ns.entities[0].namespace_qualifier.as_deref(), Some("EdFi"));
        assert_eq!(
            ns.entities[1].form,
            HeaderForm::Subclass {
                base_namespace: Some("EdFi".into()),
                base_name: "Base".into()
            }
        );
        let interchange = &ns.entities[2];
        assert_eq!(interchange.extended_documentation.as_deref(), Some("More"));
        assert_eq!(interchange.elements[0].name, "Student");
        assert_eq!(interchange.identity_templates[0].name, "School");
    }

    #[test]
    fn enumeration_items_and_descriptor_map_type() {
        let text = "Begin Namespace EdFi core\n\
                    Enumeration Grade\n\
                    item \"First\"\n\
                    documentation\n\
                    \"First grade\"\n\
                    item \"Second\"\n\
                    Descriptor Level\n\
                    with optional map type\n\
                    documentation\n\
                    \"ignored\"\n\
                    item \"A\"\n\
                    End Namespace\n";
        let tree = parse_metaed(text);
        assert!(tree.syntax_errors.is_empty(), "{:?}", tree.syntax_errors);
        let enumeration = &tree.namespaces[0].entities[0];
        assert_eq!(enumeration.items.len(), 2);
        assert_eq!(enumeration.items[0].documentation.as_deref(), Some("First grade"));
        let descriptor = &tree.namespaces[0].entities[1];
        assert_eq!(descriptor.map_type_required, Some(false));
        assert_eq!(descriptor.items[0].short_description, "A");
    }

    #[test]
    fn syntax_error_drops_only_its_namespace() {
        let text = "Begin Namespace Broken core\n\
                    Domain Entity\n\
                    string Name\n\
                    End Namespace\n\
                    Begin Namespace EdFi core\n\
                    Descriptor Level\n\
                    End Namespace\n";
        let tree = parse_metaed(text);
        assert_eq!(tree.syntax_errors.len(), 1);
        assert_eq!(tree.syntax_errors[0].source_map.line, 2);
        assert_eq!(tree.namespaces.len(), 1);
        assert_eq!(tree.namespaces[0].namespace_name, "EdFi");
    }

    #[test]
    fn modifier_without_property_is_an_error() {
        let tree = parse_metaed("Begin Namespace EdFi core\nDomain Entity A\nis required\nEnd Namespace\n");
        assert_eq!(tree.namespaces.len(), 0);
        assert!(tree.syntax_errors[0].message.contains("must follow a property"));
    }

    #[test]
    fn unknown_property_keyword_is_left_for_the_builder() {
        let tree = parse_metaed(
            "Begin Namespace EdFi core\nDomain Entity A\nshared string Name\nEnd Namespace\n",
        );
        assert!(tree.syntax_errors.is_empty());
        assert_eq!(tree.namespaces[0].entities[0].properties[0].keyword, "shared string");
    }

    #[test]
    fn missing_end_namespace_is_reported() {
        let tree = parse_metaed("Begin Namespace EdFi core\nDescriptor Level\n");
        assert!(tree.namespaces.is_empty());
        assert!(tree.syntax_errors[0].message.contains("missing `End Namespace`"));
    }

    #[test]
    fn invalid_header_forms_are_rejected() {
        assert!(parse_entity_header("Descriptor A based on B").is_err());
        assert!(parse_entity_header("Enumeration A additions").is_err());
        assert!(parse_entity_header("Domain Entity EdFi.A").is_err());
        assert!(parse_entity_header("Common A additions").is_ok());
    }
}
