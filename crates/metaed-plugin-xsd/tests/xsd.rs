use metaed_core::model::ModelType;
use metaed_core::{MetaEdEnvironment, MetaEdTextBuilder, PluginEnvironment};
use metaed_plugin_xsd::{entity_xsd, generator, merged_interchange_repository};

fn model() -> MetaEdTextBuilder {
    MetaEdTextBuilder::new()
        .with_begin_namespace("EdFi", None)
        .with_start_domain_entity("School")
        .with_documentation("doc")
        .with_integer_identity("SchoolId", "doc")
        .with_end_domain_entity()
        .with_start_domain_entity("Student")
        .with_documentation("doc")
        .with_string_identity("StudentUniqueId", "doc", "32")
        .with_domain_entity_property("School", "doc", true, false)
        .with_end_domain_entity()
        .with_start_descriptor("GradeLevel")
        .with_documentation("doc")
        .with_end_top_level()
        .with_start_interchange("EducationOrganization")
        .with_documentation("Schools & districts")
        .with_domain_entity_element("School")
        .with_descriptor_element("GradeLevel")
        .with_end_top_level()
        .with_start_interchange("StudentEnrollment")
        .with_documentation("doc")
        .with_domain_entity_identity_template("School")
        .with_domain_entity_element("Student")
        .with_end_top_level()
        .with_end_namespace()
        .with_begin_namespace("Sample", Some("SAMPLE"))
        .with_start_domain_entity_extension("School")
        .with_integer_property("Buses", "doc", false, false)
        .with_end_domain_entity()
        .with_start_domain_entity("Bus")
        .with_documentation("doc")
        .with_integer_identity("BusId", "doc")
        .with_end_domain_entity()
        .with_start_interchange_extension("StudentEnrollment")
        .with_domain_entity_element("Bus")
        .with_end_top_level()
        .with_end_namespace()
}

fn enhanced(text: MetaEdTextBuilder) -> MetaEdEnvironment {
    let mut metaed = MetaEdEnvironment::new();
    assert!(text.send_to(&mut metaed).is_empty());
    metaed.data_standard_version = "3.0.0".to_string();
    metaed.add_plugin_environment(PluginEnvironment::new(metaed_plugin_xsd::PLUGIN_NAME, "3.0.0"));
    for plugin in [
        metaed_plugin_unified::initialize(),
        metaed_plugin_xsd::initialize(),
    ] {
        for enhancer in plugin.enhancers {
            assert!((enhancer.enhance)(&mut metaed).unwrap().success, "{}", enhancer.name);
        }
    }
    metaed
}

fn repository_ids(metaed: &MetaEdEnvironment, namespace: &str) -> Vec<String> {
    merged_interchange_repository(metaed, namespace)
        .unwrap()
        .merged_interchange
        .keys()
        .cloned()
        .collect()
}

#[test]
fn rerunning_setup_keeps_enhanced_slots() {
    let mut metaed = enhanced(model());
    let school = metaed.get_entity("EdFi", ModelType::DomainEntity, "School").unwrap();
    let before = entity_xsd(&metaed, school).unwrap().clone();
    let interchanges = repository_ids(&metaed, "EdFi");

    let result = metaed_plugin_xsd::enhancer::setup_enhancer(&mut metaed).unwrap();
    assert!(result.success);
    assert_eq!(entity_xsd(&metaed, school).unwrap(), &before);
    assert_eq!(repository_ids(&metaed, "EdFi"), interchanges);
}

#[test]
fn type_names_follow_model_type_and_namespace() {
    let metaed = enhanced(model());
    let school = metaed.get_entity("EdFi", ModelType::DomainEntity, "School").unwrap();
    let xsd = entity_xsd(&metaed, school).unwrap();
    assert_eq!(xsd.complex_type_name, "School");
    assert_eq!(xsd.identity_type_name, "SchoolIdentityType");
    assert_eq!(xsd.reference_type_name, "SchoolReferenceType");

    let grade_level = metaed.get_entity("EdFi", ModelType::Descriptor, "GradeLevel").unwrap();
    assert_eq!(entity_xsd(&metaed, grade_level).unwrap().complex_type_name, "GradeLevelDescriptor");

    let extension = metaed
        .get_entity("Sample", ModelType::DomainEntityExtension, "School")
        .unwrap();
    assert_eq!(entity_xsd(&metaed, extension).unwrap().complex_type_name, "SAMPLE-SchoolExtension");

    let bus = metaed.get_entity("Sample", ModelType::DomainEntity, "Bus").unwrap();
    assert_eq!(entity_xsd(&metaed, bus).unwrap().reference_type_name, "SAMPLE-BusReferenceType");
}

#[test]
fn interchange_extension_merges_into_an_extension_copy() {
    let metaed = enhanced(model());
    assert_eq!(
        repository_ids(&metaed, "EdFi"),
        vec!["EducationOrganization", "StudentEnrollment"]
    );
    let repository = merged_interchange_repository(&metaed, "Sample").unwrap();
    let copy = &repository.merged_interchange["SAMPLE-StudentEnrollment"];
    assert!(copy.is_extension);
    assert_eq!(copy.namespace, "Sample");
    assert_eq!(copy.interchange_name, "InterchangeStudentEnrollment");
    let elements: Vec<_> = copy.elements.iter().map(|e| e.metaed_name.as_str()).collect();
    assert_eq!(elements, vec!["Student", "Bus"]);
    assert_eq!(copy.identity_templates.len(), 1);
}

#[test]
fn core_interchange_with_extended_element_is_copied_into_the_extension() {
    let metaed = enhanced(model());
    assert_eq!(
        repository_ids(&metaed, "Sample"),
        vec!["SAMPLE-EducationOrganization", "SAMPLE-StudentEnrollment"]
    );
}

#[test]
fn no_copy_without_extended_elements() {
    let metaed = enhanced(
        MetaEdTextBuilder::new()
            .with_begin_namespace("EdFi", None)
            .with_start_domain_entity("School")
            .with_documentation("doc")
            .with_integer_identity("SchoolId", "doc")
            .with_end_domain_entity()
            .with_start_interchange("EducationOrganization")
            .with_documentation("doc")
            .with_domain_entity_element("School")
            .with_end_top_level()
            .with_end_namespace()
            .with_begin_namespace("Sample", Some("SAMPLE"))
            .with_start_domain_entity("Bus")
            .with_documentation("doc")
            .with_integer_identity("BusId", "doc")
            .with_end_domain_entity()
            .with_end_namespace(),
    );
    assert!(repository_ids(&metaed, "Sample").is_empty());
}

#[test]
fn generator_writes_one_schema_per_merged_interchange() {
    let metaed = enhanced(model());
    let result = generator::generate(&metaed).unwrap();
    let files: Vec<_> = result
        .generated_output
        .iter()
        .map(|o| (o.namespace.as_str(), o.file_name.as_str()))
        .collect();
    assert_eq!(
        files,
        vec![
            ("EdFi", "Interchange-EducationOrganization.xsd"),
            ("EdFi", "Interchange-StudentEnrollment.xsd"),
            ("Sample", "SAMPLE-Interchange-EducationOrganization-Extension.xsd"),
            ("Sample", "SAMPLE-Interchange-StudentEnrollment-Extension.xsd"),
        ]
    );
    assert!(result
        .generated_output
        .iter()
        .all(|o| o.folder_name == generator::INTERCHANGE_FOLDER));

    let core = &result.generated_output[0].result_string;
    assert!(core.contains(r#"<xs:include schemaLocation="Ed-Fi-Core.xsd" />"#));
    assert!(core.contains("===== Education Organization Interchange Model ====="));
    assert!(core.contains(r#"<xs:element name="InterchangeEducationOrganization">"#));
    assert!(core.contains("<xs:documentation>Schools &amp; districts</xs:documentation>"));
    assert!(core.contains(r#"<xs:element name="School" type="School" />"#));
    assert!(core.contains(r#"<xs:element name="GradeLevel" type="GradeLevelDescriptor" />"#));
    assert!(core.contains(r#"xmlns="http://ed-fi.org/0300""#));

    let enrollment = &result.generated_output[1].result_string;
    let reference = enrollment
        .find(r#"<xs:element name="SchoolReference" type="SchoolReferenceType" />"#)
        .unwrap();
    let element = enrollment
        .find(r#"<xs:element name="Student" type="Student" />"#)
        .unwrap();
    assert!(reference < element);

    let extension = &result.generated_output[2].result_string;
    assert!(extension.contains(r#"<xs:include schemaLocation="SAMPLE-Ed-Fi-Extended-Core.xsd" />"#));
    assert!(extension.contains(r#"<xs:element name="School" type="SAMPLE-SchoolExtension" />"#));
}
