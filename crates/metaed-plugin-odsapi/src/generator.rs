//! `InterchangeOrderMetadata.xml`: interchange and element load order for the ODS/API.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use metaed_core::model::Namespace;
use metaed_core::{GeneratedOutput, GeneratorResult, MetaEdEnvironment};
use metaed_plugin_xsd::generator::escape_xml;
use metaed_plugin_xsd::{merged_interchange_repository, MergedInterchange};

use crate::model::{interchange_order_repository, InterchangeOrder};

pub const API_METADATA_FOLDER: &str = "ApiMetadata";

/// Interchanges listed in a namespace's metadata file: its own, then those of its
/// dependencies not shadowed by a same-named interchange nearer in the chain.
fn visible_interchanges<'a>(
    metaed: &'a MetaEdEnvironment,
    namespace: &Namespace,
) -> anyhow::Result<Vec<(&'a MergedInterchange, &'a InterchangeOrder)>> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut visible = Vec::new();
    for (depth, name) in metaed
        .namespace_chain(&namespace.namespace_name)
        .iter()
        .enumerate()
    {
        let merged = merged_interchange_repository(metaed, name)?;
        let orders = interchange_order_repository(metaed, name)?;
        for interchange in merged.values() {
            if depth > 0 && interchange.is_extension {
                continue;
            }
            if !seen.insert(interchange.metaed_name.as_str()) {
                continue;
            }
            if let Some(order) = orders.interchange.get(&interchange.repository_id) {
                visible.push((interchange, order));
            }
        }
    }
    visible.sort_by(|(a, a_order), (b, b_order)| {
        (a_order.api_order, &a.metaed_name).cmp(&(b_order.api_order, &b.metaed_name))
    });
    Ok(visible)
}

fn render(interchanges: &[(&MergedInterchange, &InterchangeOrder)]) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(out, "<Interchanges>")?;
    for (interchange, order) in interchanges {
        writeln!(
            out,
            r#"  <Interchange name="{}" order="{}">"#,
            escape_xml(&interchange.metaed_name),
            order.api_order
        )?;
        for element in &order.api_ordered_elements {
            writeln!(out, r#"    <Element name="{}" />"#, escape_xml(&element.name))?;
        }
        writeln!(out, "  </Interchange>")?;
    }
    writeln!(out, "</Interchanges>")?;
    Ok(out)
}

pub fn file_name(namespace: &Namespace) -> String {
    if namespace.is_extension {
        format!("InterchangeOrderMetadata-{}.xml", namespace.project_extension)
    } else {
        "InterchangeOrderMetadata.xml".to_string()
    }
}

pub fn generate(metaed: &MetaEdEnvironment) -> anyhow::Result<GeneratorResult> {
    let mut generated_output = Vec::new();
    for namespace in metaed.namespace.values() {
        let interchanges = visible_interchanges(metaed, namespace)?;
        if interchanges.is_empty() {
            continue;
        }
        generated_output.push(GeneratedOutput {
            name: "InterchangeOrderMetadata".to_string(),
            namespace: namespace.namespace_name.clone(),
            folder_name: API_METADATA_FOLDER.to_string(),
            file_name: file_name(namespace),
            result_string: render(&interchanges)?,
            result_stream: None,
        });
    }
    Ok(GeneratorResult {
        generator_name: "InterchangeOrderMetadataGenerator".to_string(),
        generated_output,
    })
}
