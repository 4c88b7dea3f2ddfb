//! Interchange schema generator: one `xs:schema` per merged interchange.

use std::fmt::Write as _;

use metaed_core::model::InterchangeItem;
use metaed_core::version::coerce_version;
use metaed_core::{GeneratedOutput, GeneratorResult, MetaEdEnvironment};

use crate::model::{entity_xsd, merged_interchange_repository, MergedInterchange};

pub const INTERCHANGE_FOLDER: &str = "Interchange";

/// Escapes text for use in XML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `StudentEnrollment` → `Student Enrollment`; runs of capitals stay together (`EdFiXML`).
pub fn split_words(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let previous_lower = chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if previous_lower || (chars[i - 1].is_uppercase() && next_lower) {
                words.push(' ');
            }
        }
        words.push(*c);
    }
    words
}

/// `http://ed-fi.org/0300` for data standard 3.0.x.
pub fn target_namespace(data_standard_version: &str) -> String {
    let (major, minor) = coerce_version(data_standard_version)
        .map(|v| (v.major, v.minor))
        .unwrap_or((3, 0));
    format!("http://ed-fi.org/0{major}{minor}0")
}

fn element_type(
    metaed: &MetaEdEnvironment,
    namespace: &str,
    item: &InterchangeItem,
) -> anyhow::Result<String> {
    let Some(id) = item.referenced_entity else {
        return Ok(item.metaed_name.clone());
    };
    let id = metaed.get_most_derived_entity(namespace, id);
    Ok(entity_xsd(metaed, id)?.complex_type_name.clone())
}

fn reference_type(metaed: &MetaEdEnvironment, item: &InterchangeItem) -> anyhow::Result<String> {
    match item.referenced_entity {
        Some(id) => Ok(entity_xsd(metaed, id)?.reference_type_name.clone()),
        None => Ok(format!("{}ReferenceType", item.metaed_name)),
    }
}

fn render(
    metaed: &MetaEdEnvironment,
    interchange: &MergedInterchange,
    project_extension: Option<&str>,
) -> anyhow::Result<String> {
    let target = target_namespace(&metaed.data_standard_version);
    let include = match project_extension {
        Some(extension) => format!("{extension}-Ed-Fi-Extended-Core.xsd"),
        None => "Ed-Fi-Core.xsd".to_string(),
    };

    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<xs:schema xmlns="{target}" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:ann="http://ed-fi.org/annotation" targetNamespace="{target}" elementFormDefault="qualified" attributeFormDefault="unqualified">"#
    )?;
    writeln!(out, r#"  <xs:include schemaLocation="{include}" />"#)?;
    writeln!(out, "  <xs:annotation>")?;
    writeln!(
        out,
        "    <xs:documentation>===== {} Interchange Model =====</xs:documentation>",
        escape_xml(&split_words(&interchange.metaed_name))
    )?;
    writeln!(out, "  </xs:annotation>")?;
    writeln!(out, r#"  <xs:element name="{}">"#, interchange.interchange_name)?;
    writeln!(out, "    <xs:annotation>")?;
    writeln!(
        out,
        "      <xs:documentation>{}</xs:documentation>",
        escape_xml(&interchange.documentation)
    )?;
    writeln!(out, "    </xs:annotation>")?;
    writeln!(out, "    <xs:complexType>")?;
    writeln!(out, r#"      <xs:choice maxOccurs="unbounded">"#)?;
    for template in &interchange.identity_templates {
        writeln!(
            out,
            r#"        <xs:element name="{}Reference" type="{}" />"#,
            template.metaed_name,
            reference_type(metaed, template)?
        )?;
    }
    for element in &interchange.elements {
        writeln!(
            out,
            r#"        <xs:element name="{}" type="{}" />"#,
            element.metaed_name,
            element_type(metaed, &interchange.namespace, element)?
        )?;
    }
    writeln!(out, "      </xs:choice>")?;
    writeln!(out, "    </xs:complexType>")?;
    writeln!(out, "  </xs:element>")?;
    writeln!(out, "</xs:schema>")?;
    Ok(out)
}

fn file_name(interchange: &MergedInterchange, project_extension: Option<&str>) -> String {
    match (project_extension, interchange.is_extension) {
        (Some(extension), true) => {
            format!("{extension}-Interchange-{}-Extension.xsd", interchange.metaed_name)
        }
        (Some(extension), false) => format!("{extension}-Interchange-{}.xsd", interchange.metaed_name),
        (None, _) => format!("Interchange-{}.xsd", interchange.metaed_name),
    }
}

pub fn generate(metaed: &MetaEdEnvironment) -> anyhow::Result<GeneratorResult> {
    let mut generated_output = Vec::new();
    for namespace in metaed.namespace.values() {
        let project_extension = namespace
            .is_extension
            .then_some(namespace.project_extension.as_str());
        let repository = merged_interchange_repository(metaed, &namespace.namespace_name)?;
        for interchange in repository.values() {
            generated_output.push(GeneratedOutput {
                name: "XSD".to_string(),
                namespace: namespace.namespace_name.clone(),
                folder_name: INTERCHANGE_FOLDER.to_string(),
                file_name: file_name(interchange, project_extension),
                result_string: render(metaed, interchange, project_extension)?,
                result_stream: None,
            });
        }
    }
    Ok(GeneratorResult {
        generator_name: "InterchangeGenerator".to_string(),
        generated_output,
    })
}
