use metaed_core::{MetaEdEnvironment, MetaEdTextBuilder, PluginEnvironment};
use metaed_plugin_ods_relational::ColumnType;
use metaed_plugin_ods_sqlserver::{generator, sql_data_type, sql_table_repository};

fn enhanced(text: MetaEdTextBuilder) -> MetaEdEnvironment {
    let mut metaed = MetaEdEnvironment::new();
    let failures = text.send_to(&mut metaed);
    assert!(failures.is_empty(), "{failures:?}");
    metaed.data_standard_version = "3.0.0".to_string();
    for plugin in [
        metaed_plugin_ods_relational::PLUGIN_NAME,
        metaed_plugin_ods_sqlserver::PLUGIN_NAME,
    ] {
        metaed.add_plugin_environment(PluginEnvironment::new(plugin, "3.0.0"));
    }
    for plugin in [
        metaed_plugin_unified::initialize(),
        metaed_plugin_ods_relational::initialize(),
        metaed_plugin_ods_sqlserver::initialize(),
    ] {
        for enhancer in plugin.enhancers {
            assert!((enhancer.enhance)(&mut metaed).unwrap().success, "{}", enhancer.name);
        }
    }
    metaed
}

fn model() -> MetaEdTextBuilder {
    MetaEdTextBuilder::new()
        .with_begin_namespace("EdFi", None)
        .with_start_domain_entity("School")
        .with_documentation("doc")
        .with_integer_identity("SchoolId", "doc")
        .with_end_domain_entity()
        .with_start_domain_entity("Staff")
        .with_documentation("doc")
        .with_string_identity("StaffUniqueId", "doc", "32")
        .with_property("decimal", "YearsOfExperience", "doc", false, false)
        .with_property_modifier("total digits 5")
        .with_property_modifier("decimal places 2")
        .with_domain_entity_property("School", "doc", true, false)
        .with_role_name("Home", None)
        .with_domain_entity_property("School", "doc", false, false)
        .with_role_name("Previous", None)
        .with_end_domain_entity()
        .with_end_namespace()
        .with_begin_namespace("Sample", Some("SAMPLE"))
        .with_start_domain_entity_extension("Staff")
        .with_property("bool", "IsTenured", "doc", false, false)
        .with_end_domain_entity()
        .with_end_namespace()
}

#[test]
fn logical_types_map_to_sql_server_types() {
    let cases = [
        (ColumnType::Boolean, "BIT"),
        (ColumnType::Datetime, "DATETIME2(7)"),
        (
            ColumnType::Decimal {
                total_digits: 9,
                decimal_places: 2,
            },
            "DECIMAL(9, 2)",
        ),
        (ColumnType::Percent, "DECIMAL(5, 4)"),
        (ColumnType::String { max_length: 60 }, "NVARCHAR(60)"),
        (ColumnType::Year, "SMALLINT"),
    ];
    for (column_type, expected) in cases {
        assert_eq!(sql_data_type(&column_type), expected);
    }
}

#[test]
fn role_named_keys_to_the_same_table_get_distinct_names() {
    let metaed = enhanced(model());
    let staff = &sql_table_repository(&metaed, "EdFi").unwrap().table["Staff"];
    let names: Vec<&str> = staff.foreign_keys.iter().map(|fk| fk.name.as_str()).collect();
    assert_eq!(names, vec!["FK_Staff_School", "FK_Staff_School2"]);
    let years = staff.columns.iter().find(|c| c.name == "YearsOfExperience").unwrap();
    assert_eq!(years.data_type, "DECIMAL(5, 2)");
    assert!(years.is_nullable);
}

#[test]
fn each_namespace_gets_its_own_structure_files() {
    let metaed = enhanced(model());
    let result = generator::generate(&metaed).unwrap();
    let files: Vec<(&str, &str)> = result
        .generated_output
        .iter()
        .map(|o| (o.namespace.as_str(), o.file_name.as_str()))
        .collect();
    assert_eq!(
        files,
        vec![
            ("EdFi", generator::TABLES_FILE),
            ("EdFi", generator::FOREIGN_KEYS_FILE),
            ("Sample", generator::TABLES_FILE),
            ("Sample", generator::FOREIGN_KEYS_FILE),
        ]
    );

    let core_tables = &result.generated_output[0].result_string;
    assert!(core_tables.contains("CREATE TABLE [edfi].[School] ("));
    assert!(core_tables.contains("    [HomeSchoolId] INT NOT NULL,\n"));
    assert!(core_tables.contains("    [PreviousSchoolId] INT NULL,\n"));

    let extension_keys = &result.generated_output[3].result_string;
    assert!(extension_keys.contains(
        "ALTER TABLE [sample].[StaffExtension] WITH CHECK ADD CONSTRAINT [FK_StaffExtension_Staff] FOREIGN KEY ([StaffUniqueId])\n\
         REFERENCES [edfi].[Staff] ([StaffUniqueId])\n"
    ));
}
