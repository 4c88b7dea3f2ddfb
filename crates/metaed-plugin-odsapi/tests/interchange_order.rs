use metaed_core::{MetaEdEnvironment, MetaEdTextBuilder, PluginEnvironment};
use metaed_plugin_odsapi::{generator, interchange_order_repository, ApiOrderedElement};

fn enhanced(text: MetaEdTextBuilder) -> MetaEdEnvironment {
    let mut metaed = MetaEdEnvironment::new();
    let failures = text.send_to(&mut metaed);
    assert!(failures.is_empty(), "{failures:?}");
    metaed.data_standard_version = "3.0.0".to_string();
    for plugin in [metaed_plugin_xsd::PLUGIN_NAME, metaed_plugin_odsapi::PLUGIN_NAME] {
        metaed.add_plugin_environment(PluginEnvironment::new(plugin, "3.0.0"));
    }
    for plugin in [
        metaed_plugin_unified::initialize(),
        metaed_plugin_xsd::initialize(),
        metaed_plugin_odsapi::initialize(),
    ] {
        for enhancer in plugin.enhancers {
            assert!((enhancer.enhance)(&mut metaed).unwrap().success, "{}", enhancer.name);
        }
    }
    metaed
}

fn order(metaed: &MetaEdEnvironment, namespace: &str, id: &str) -> (usize, Vec<ApiOrderedElement>) {
    let order = &interchange_order_repository(metaed, namespace)
        .unwrap()
        .interchange[id];
    (order.api_order, order.api_ordered_elements.clone())
}

fn entity(builder: MetaEdTextBuilder, name: &str) -> MetaEdTextBuilder {
    builder
        .with_start_domain_entity(name)
        .with_documentation("doc")
        .with_integer_identity(&format!("{name}Id"), "doc")
}

#[test]
fn single_interchange_is_ordered_first() {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "DomainEntityName")
        .with_end_domain_entity()
        .with_start_interchange("InterchangeName")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName")
        .with_end_top_level()
        .with_end_namespace();
    let metaed = enhanced(text);
    assert_eq!(
        order(&metaed, "EdFi", "InterchangeName"),
        (10, vec![ApiOrderedElement::new("DomainEntityName", 1)])
    );
}

#[test]
fn internal_dependency_orders_referenced_element_first() {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "DomainEntityName1")
        .with_domain_entity_property("DomainEntityName2", "doc", false, false)
        .with_end_domain_entity();
    let text = entity(text, "DomainEntityName2")
        .with_end_domain_entity()
        .with_start_interchange("InterchangeName")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName1")
        .with_domain_entity_element("DomainEntityName2")
        .with_end_top_level()
        .with_end_namespace();
    let metaed = enhanced(text);
    assert_eq!(
        order(&metaed, "EdFi", "InterchangeName"),
        (
            10,
            vec![
                ApiOrderedElement::new("DomainEntityName2", 1),
                ApiOrderedElement::new("DomainEntityName1", 2),
            ]
        )
    );
}

#[test]
fn external_dependency_levels_the_dependent_interchange() {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "DomainEntityName1")
        .with_domain_entity_property("DomainEntityName2", "doc", true, false)
        .with_end_domain_entity();
    let text = entity(text, "DomainEntityName2")
        .with_end_domain_entity()
        .with_start_interchange("InterchangeName1")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName1")
        .with_end_top_level()
        .with_start_interchange("InterchangeName2")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName2")
        .with_end_top_level()
        .with_end_namespace();
    let metaed = enhanced(text);
    assert_eq!(order(&metaed, "EdFi", "InterchangeName1").0, 20);
    assert_eq!(order(&metaed, "EdFi", "InterchangeName2").0, 10);
    assert_eq!(
        order(&metaed, "EdFi", "InterchangeName1").1,
        vec![ApiOrderedElement::new("DomainEntityName1", 2)]
    );
}

fn core_with_extension_reference() -> MetaEdTextBuilder {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "DomainEntityName1")
        .with_end_domain_entity();
    entity(text, "DomainEntityName2")
        .with_end_domain_entity()
        .with_start_interchange("Two")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName1")
        .with_end_top_level()
        .with_end_namespace()
        .with_begin_namespace("Sample", Some("SAMPLE"))
        .with_start_domain_entity_extension("DomainEntityName1")
        .with_domain_entity_property("EdFi.DomainEntityName2", "doc", false, false)
        .with_end_domain_entity()
        .with_start_interchange("One")
        .with_documentation("doc")
        .with_domain_entity_element("EdFi.DomainEntityName2")
        .with_end_top_level()
        .with_end_namespace()
}

#[test]
fn extension_properties_only_affect_the_extension_namespace() {
    let metaed = enhanced(core_with_extension_reference());

    assert_eq!(
        order(&metaed, "EdFi", "Two"),
        (10, vec![ApiOrderedElement::new("DomainEntityName1", 1)])
    );
    assert_eq!(
        order(&metaed, "Sample", "One"),
        (10, vec![ApiOrderedElement::new("DomainEntityName2", 1)])
    );
    assert_eq!(
        order(&metaed, "Sample", "SAMPLE-Two"),
        (20, vec![ApiOrderedElement::new("DomainEntityName1", 2)])
    );
}

#[test]
fn extension_copy_with_the_same_element_ranks_alike() {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "DomainEntityName1")
        .with_end_domain_entity()
        .with_start_interchange("InterchangeName")
        .with_documentation("doc")
        .with_domain_entity_element("DomainEntityName1")
        .with_end_top_level()
        .with_end_namespace()
        .with_begin_namespace("Sample", Some("SAMPLE"))
        .with_start_domain_entity_extension("DomainEntityName1")
        .with_integer_property("Extra", "doc", false, false)
        .with_end_domain_entity()
        .with_end_namespace();
    let metaed = enhanced(text);
    let expected = (10, vec![ApiOrderedElement::new("DomainEntityName1", 1)]);
    assert_eq!(order(&metaed, "EdFi", "InterchangeName"), expected);
    assert_eq!(order(&metaed, "Sample", "SAMPLE-InterchangeName"), expected);
}

#[test]
fn commons_and_subclasses_contribute_required_edges() {
    let text = entity(MetaEdTextBuilder::new().with_begin_namespace("EdFi", None), "State")
        .with_end_domain_entity()
        .with_start_common("Address")
        .with_documentation("doc")
        .with_domain_entity_property("State", "doc", true, false)
        .with_end_top_level();
    let text = entity(text, "School")
        .with_common_property("Address", "doc", true, false)
        .with_end_domain_entity()
        .with_start_domain_entity_subclass("CharterSchool", "School")
        .with_documentation("doc")
        .with_integer_property("CharterNumber", "doc", true, false)
        .with_end_domain_entity()
        .with_start_interchange("EducationOrganization")
        .with_documentation("doc")
        .with_domain_entity_element("CharterSchool")
        .with_domain_entity_element("School")
        .with_domain_entity_element("State")
        .with_end_top_level()
        .with_end_namespace();
    let metaed = enhanced(text);
    assert_eq!(
        order(&metaed, "EdFi", "EducationOrganization").1,
        vec![
            ApiOrderedElement::new("State", 1),
            ApiOrderedElement::new("School", 2),
            ApiOrderedElement::new("CharterSchool", 3),
        ]
    );
}

#[test]
fn metadata_files_list_visible_interchanges_by_order() {
    let metaed = enhanced(core_with_extension_reference());
    let result = generator::generate(&metaed).unwrap();
    assert_eq!(result.generated_output.len(), 2);

    let core = &result.generated_output[0];
    assert_eq!(core.file_name, "InterchangeOrderMetadata.xml");
    assert_eq!(core.folder_name, generator::API_METADATA_FOLDER);
    assert_eq!(
        core.result_string,
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n",
            "<Interchanges>\n",
            "  <Interchange name=\"Two\" order=\"10\">\n",
            "    <Element name=\"DomainEntityName1\" />\n",
            "  </Interchange>\n",
            "</Interchanges>\n",
        )
    );

    let extension = &result.generated_output[1];
    assert_eq!(extension.file_name, "InterchangeOrderMetadata-SAMPLE.xml");
    assert_eq!(extension.namespace, "Sample");
    let one = extension.result_string.find(r#"<Interchange name="One" order="10">"#).unwrap();
    let two = extension.result_string.find(r#"<Interchange name="Two" order="20">"#).unwrap();
    assert!(one < two);
    assert_eq!(extension.result_string.matches("<Interchange ").count(), 2);
}
