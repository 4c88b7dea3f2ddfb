use metaed_core::config::MetaEdProject;
use metaed_core::pipeline::{execute_pipeline, RUN_ENHANCERS, SETUP_PLUGINS};
use metaed_core::{
    EnhancerResult, Enhancer, GeneratedOutput, Generator, GeneratorResult, MetaEdConfiguration,
    MetaEdEnvironment, MetaEdPlugin, MetaEdTextBuilder, ModelType, PipelineOptions,
    PluginCatalog, State, ValidationFailure, Validator,
};
use std::fs;
use std::path::Path;

const COUNTER: &str = "counter";

#[derive(Debug, Default)]
struct EntityCount(usize);

fn count_entities(metaed: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    let MetaEdEnvironment {
        namespace, plugin, ..
    } = metaed;
    let environment = plugin
        .get_mut(COUNTER)
        .ok_or_else(|| anyhow::anyhow!("counter environment missing"))?;
    for (name, ns) in namespace.iter() {
        environment.namespace_data_or_default::<EntityCount>(name)?.0 = ns.entity_ids().count();
    }
    Ok(EnhancerResult::success("CountEntities"))
}

fn warn_on_descriptors(metaed: &MetaEdEnvironment) -> Vec<ValidationFailure> {
    metaed
        .get_all_entities_of_type(&[ModelType::Descriptor])
        .into_iter()
        .map(|id| {
            let entity = metaed.entity(id);
            ValidationFailure::warning("DescriptorNotice", format!("descriptor {}", entity.metaed_name), entity.source_map)
        })
        .collect()
}

fn generate_counts(metaed: &MetaEdEnvironment) -> anyhow::Result<GeneratorResult> {
    let environment = metaed.plugin_environment(COUNTER)?;
    let mut generated_output = Vec::new();
    for name in metaed.namespace.keys() {
        let count = environment.namespace_data::<EntityCount>(name)?;
        generated_output.push(GeneratedOutput {
            name: "Counts".to_string(),
            namespace: name.clone(),
            folder_name: "Counts".to_string(),
            file_name: "count.txt".to_string(),
            result_string: format!("{name}: {}\n", count.0),
            result_stream: None,
        });
    }
    Ok(GeneratorResult {
        generator_name: "CountGenerator".to_string(),
        generated_output,
    })
}

fn explode(_: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    panic!("enhancer bug")
}

fn never_generated(_: &MetaEdEnvironment) -> anyhow::Result<GeneratorResult> {
    anyhow::bail!("must not run after a failed enhancer")
}

fn catalog() -> PluginCatalog {
    let mut counter = MetaEdPlugin::new(COUNTER, "1.0.0");
    counter.validators.push(Validator::new("DescriptorNotice", warn_on_descriptors));
    counter.enhancers.push(Enhancer::new("CountEntities", count_entities));
    counter.generators.push(Generator::new("CountGenerator", generate_counts));

    let mut broken = MetaEdPlugin::new("broken", "1.0.0");
    broken.enhancers.push(Enhancer::new("Explode", explode));
    broken.generators.push(Generator::new("NeverGenerated", never_generated));

    let mut downstream = MetaEdPlugin::new("downstream", "1.0.0");
    downstream.depends_on_plugins.push("broken".to_string());
    downstream.generators.push(Generator::new("NeverGenerated", never_generated));

    let mut catalog = PluginCatalog::new();
    catalog.register(counter).register(broken).register(downstream);
    catalog
}

fn write_project(root: &Path) -> MetaEdConfiguration {
    let core = root.join("core");
    fs::create_dir_all(core.join("nested")).unwrap();
    let text = MetaEdTextBuilder::new()
        .with_begin_namespace("EdFi", None)
        .with_start_domain_entity("School")
        .with_documentation("doc")
        .with_integer_identity("SchoolId", "doc")
        .with_end_domain_entity()
        .with_end_namespace()
        .to_text();
    fs::write(core.join("School.metaed"), text).unwrap();
    let text = MetaEdTextBuilder::new()
        .with_begin_namespace("EdFi", None)
        .with_start_descriptor("GradeLevel")
        .with_documentation("doc")
        .with_end_top_level()
        .with_end_namespace()
        .to_text();
    fs::write(core.join("nested").join("GradeLevel.metaed"), text).unwrap();
    fs::write(core.join("notes.txt"), "ignored").unwrap();

    MetaEdConfiguration {
        projects: vec![MetaEdProject {
            project_name: "Ed-Fi".to_string(),
            namespace_name: "EdFi".to_string(),
            project_extension: "core".to_string(),
            project_version: "3.0.0".to_string(),
            description: String::new(),
            dependencies: None,
        }],
        project_paths: vec![core],
        artifact_directory: Some(root.join("MetaEdOutput")),
        ..MetaEdConfiguration::default()
    }
}

#[test]
fn failing_plugin_is_bulkheaded_from_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = write_project(dir.path());
    let mut state = State::new(configuration, catalog());
    execute_pipeline(&mut state);

    assert!(!state.aborted);
    assert_eq!(state.metaed.data_standard_version, "3.0.0");
    assert!(state
        .enhancer_results
        .contains(&EnhancerResult::failure("Explode")));
    assert!(state
        .enhancer_results
        .contains(&EnhancerResult::success("CountEntities")));
    assert_eq!(state.generator_results.len(), 1);
    assert_eq!(state.pipeline_failure.len(), 2);
    assert!(state
        .pipeline_failure
        .iter()
        .all(|f| f.stage_name == RUN_ENHANCERS));

    let written = fs::read_to_string(
        dir.path()
            .join("MetaEdOutput")
            .join("EdFi")
            .join("Counts")
            .join("count.txt"),
    )
    .unwrap();
    assert_eq!(written, "EdFi: 2\n");
}

#[test]
fn validation_failures_are_mapped_to_their_files() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = write_project(dir.path());
    let mut state = State::new(configuration, catalog());
    execute_pipeline(&mut state);

    let notice = state
        .validation_failure
        .iter()
        .find(|f| f.validator_name == "DescriptorNotice")
        .unwrap();
    let file_map = notice.file_map.as_ref().unwrap();
    assert!(file_map.full_path.ends_with("nested/GradeLevel.metaed"));
    assert_eq!(file_map.line_number, 2);
}

#[test]
fn stop_on_validation_failure_skips_enhancement() {
    let dir = tempfile::tempdir().unwrap();
    let core = dir.path().join("core");
    fs::create_dir_all(&core).unwrap();
    fs::write(
        core.join("Broken.metaed"),
        "Begin Namespace EdFi core\nDomain Entity\nEnd Namespace\n",
    )
    .unwrap();
    let mut configuration = write_project(dir.path());
    configuration.artifact_directory = None;

    let mut state = State::new(configuration, catalog()).with_options(PipelineOptions {
        stop_on_validation_failure: true,
        ..PipelineOptions::default()
    });
    execute_pipeline(&mut state);

    assert!(state.validation_failure.iter().any(|f| f.is_error()));
    assert!(state.enhancer_results.is_empty());
    assert!(state.generator_results.is_empty());
}

#[test]
fn missing_project_directory_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut configuration = write_project(dir.path());
    configuration.project_paths = vec![dir.path().join("does-not-exist")];

    let mut state = State::new(configuration, catalog());
    execute_pipeline(&mut state);

    assert!(state.aborted);
    assert!(state.has_errors());
    assert!(state.enhancer_results.is_empty());
    assert!(!dir.path().join("MetaEdOutput").exists());
}

#[test]
fn unknown_manifest_entry_is_soft() {
    let dir = tempfile::tempdir().unwrap();
    let mut configuration = write_project(dir.path());
    configuration.plugins = Some(vec![
        metaed_core::PluginManifest::new(COUNTER),
        metaed_core::PluginManifest::new("missing"),
    ]);

    let mut state = State::new(configuration, catalog());
    execute_pipeline(&mut state);

    assert!(!state.aborted);
    assert_eq!(state.pipeline_failure.len(), 1);
    assert_eq!(state.pipeline_failure[0].stage_name, SETUP_PLUGINS);
    assert_eq!(state.generator_results.len(), 1);
}

fn missing_target(_: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    Ok(EnhancerResult::failure("MissingTarget"))
}

fn broken_patch(_: &mut MetaEdEnvironment) -> anyhow::Result<EnhancerResult> {
    anyhow::bail!("patch could not read its slot")
}

fn counter_with(first: Enhancer) -> PluginCatalog {
    let mut counter = MetaEdPlugin::new(COUNTER, "1.0.0");
    counter.enhancers.push(first);
    counter.enhancers.push(Enhancer::new("CountEntities", count_entities));
    counter.generators.push(Generator::new("CountGenerator", generate_counts));
    let mut catalog = PluginCatalog::new();
    catalog.register(counter);
    catalog
}

#[test]
fn reported_diminisher_failure_does_not_stop_the_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = write_project(dir.path());
    let catalog = counter_with(Enhancer::diminisher("MissingTarget", missing_target));
    let mut state = State::new(configuration, catalog);
    execute_pipeline(&mut state);

    assert_eq!(
        state.enhancer_results,
        vec![
            EnhancerResult::failure("MissingTarget"),
            EnhancerResult::success("CountEntities"),
        ]
    );
    assert!(state.pipeline_failure.is_empty());
    assert_eq!(state.generator_results.len(), 1);
}

#[test]
fn reported_failure_of_a_blocking_enhancer_stops_the_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = write_project(dir.path());
    let catalog = counter_with(Enhancer::new("MissingTarget", missing_target));
    let mut state = State::new(configuration, catalog);
    execute_pipeline(&mut state);

    assert_eq!(state.enhancer_results, vec![EnhancerResult::failure("MissingTarget")]);
    assert_eq!(state.pipeline_failure.len(), 1);
    assert!(state.generator_results.is_empty());
}

#[test]
fn diminisher_error_still_stops_the_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let configuration = write_project(dir.path());
    let catalog = counter_with(Enhancer::diminisher("BrokenPatch", broken_patch));
    let mut state = State::new(configuration, catalog);
    execute_pipeline(&mut state);

    assert_eq!(state.enhancer_results, vec![EnhancerResult::failure("BrokenPatch")]);
    assert_eq!(state.pipeline_failure[0].stage_name, RUN_ENHANCERS);
    assert!(state.generator_results.is_empty());
}
