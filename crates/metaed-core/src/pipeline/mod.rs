//! The compilation pipeline.
//!
//! ```text
//! setupPlugins → loadFiles → loadFileIndex → buildParseTree → walkBuilders
//!   → initializeNamespaces → per plugin: validators → enhancers → generators
//!   → fileMapForValidationFailure → writeOutput
//! ```
//!
//! Every stage takes the [`State`] by mutable reference and only appends to its result lists.
//! A fatal stage error ([`PipelineError`]) is recorded as a `PipelineFailure`, marks the state
//! aborted and skips every later stage except failure file mapping.

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::builder;
use crate::file::{load_file_sets, FileError, FileIndex};
use crate::graph::GraphError;
use crate::grammar::parse_metaed;
use crate::state::State;

mod namespace;
mod run;
mod setup;

pub use namespace::initialize_namespaces;
pub use run::{run_enhancers, run_generators, run_validators};
pub use setup::setup_plugins;

pub const SETUP_PLUGINS: &str = "setupPlugins";
pub const LOAD_FILES: &str = "loadFiles";
pub const LOAD_FILE_INDEX: &str = "loadFileIndex";
pub const BUILD_PARSE_TREE: &str = "buildParseTree";
pub const WALK_BUILDERS: &str = "walkBuilders";
pub const INITIALIZE_NAMESPACES: &str = "initializeNamespaces";
pub const RUN_VALIDATORS: &str = "runValidators";
pub const RUN_ENHANCERS: &str = "runEnhancers";
pub const RUN_GENERATORS: &str = "runGenerators";
pub const FILE_MAP: &str = "fileMapForValidationFailure";
pub const WRITE_OUTPUT: &str = "writeOutput";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Files(#[from] FileError),
    #[error("failed to read plugin manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid plugin manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("plugin dependency cycle: {}", .0.join(", "))]
    PluginCycle(Vec<String>),
    #[error("no namespaces were found in the loaded files")]
    NoNamespaces,
    #[error("namespace {namespace} depends on {dependency}, which does not exist")]
    MissingNamespaceDependency { namespace: String, dependency: String },
    #[error("namespace dependency cycle: {}", .0.join(", "))]
    NamespaceCycle(Vec<String>),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

type Stage = fn(&mut State) -> Result<(), PipelineError>;

fn run_stage(state: &mut State, name: &'static str, stage: Stage) -> bool {
    let span = tracing::info_span!("stage", name);
    let _guard = span.enter();
    match stage(state) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(error = %err, "fatal pipeline error");
            state.add_pipeline_failure(name, err.to_string());
            state.aborted = true;
            false
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Reads the configured project directories. File sets already present on the state (for
/// example supplied by an editor) are used as they are.
pub fn load_files(state: &mut State) -> Result<(), PipelineError> {
    if !state.loaded_file_set.is_empty() {
        tracing::debug!(file_sets = state.loaded_file_set.len(), "using preloaded file sets");
        return Ok(());
    }
    let loaded = load_file_sets(state.configuration.project_inputs(), &state.file_exclusions)?;
    for unreadable in &loaded.unreadable {
        state.add_pipeline_failure(
            LOAD_FILES,
            format!("Unable to read {}: {}", unreadable.path.display(), unreadable.error),
        );
    }
    state.loaded_file_set = loaded.file_sets;
    Ok(())
}

pub fn load_file_index(state: &mut State) -> Result<(), PipelineError> {
    state.file_index = FileIndex::build(&state.loaded_file_set);
    Ok(())
}

/// Parses the concatenated source. Syntax errors become validation failures; the namespace
/// block containing one contributes nothing further.
pub fn build_parse_tree(state: &mut State) -> Result<(), PipelineError> {
    state.parse_tree = parse_metaed(state.file_index.text());
    let syntax = builder::syntax_failures(&state.parse_tree);
    if !syntax.is_empty() {
        tracing::warn!(errors = syntax.len(), "syntax errors in source");
    }
    state.validation_failure.extend(syntax);
    Ok(())
}

pub fn walk_builders(state: &mut State) -> Result<(), PipelineError> {
    let failures = builder::walk_builders(&state.parse_tree, &mut state.metaed);
    state.validation_failure.extend(failures);
    Ok(())
}

fn initialize_namespaces_stage(state: &mut State) -> Result<(), PipelineError> {
    initialize_namespaces(&mut state.metaed, &state.configuration)
}

/// Validators, enhancers and generators, one plugin at a time in dependency order.
pub fn run_plugins(state: &mut State) {
    let plugins = state.plugins.clone();
    let mut failed: BTreeSet<String> = BTreeSet::new();
    let mut stopped = false;

    for plugin in &plugins {
        let span = tracing::info_span!("plugin", name = %plugin.short_name);
        let _guard = span.enter();

        if stopped {
            break;
        }
        if let Some(dependency) = plugin.depends_on_plugins.iter().find(|d| failed.contains(*d)) {
            tracing::warn!(dependency = %dependency, "skipping plugin after dependency failure");
            state.add_pipeline_failure(
                RUN_ENHANCERS,
                format!(
                    "{}: skipped because plugin {} did not complete.",
                    plugin.short_name, dependency
                ),
            );
            failed.insert(plugin.short_name.clone());
            continue;
        }

        if state.options.run_validators {
            run_validators(state, plugin);
            if state.options.stop_on_validation_failure
                && state.validation_failure.iter().any(|f| f.is_error())
            {
                tracing::warn!("stopping after validation errors");
                stopped = true;
                continue;
            }
        }
        if state.options.run_enhancers && !run_enhancers(state, plugin) {
            failed.insert(plugin.short_name.clone());
            continue;
        }
        if state.options.run_generators {
            run_generators(state, plugin);
        }
    }
}

/// Attaches `(file, line)` to every validation failure carrying a source position.
pub fn file_map_for_validation_failure(state: &mut State) {
    let State {
        validation_failure,
        file_index,
        ..
    } = state;
    for failure in validation_failure.iter_mut() {
        if failure.file_map.is_some() {
            continue;
        }
        if let Some(source_map) = failure.source_map {
            failure.file_map = file_index.lookup(source_map.line);
        }
    }
}

/// Writes every generated output to `<artifactDirectory>/<namespace>/<folderName>/<fileName>`,
/// if an artifact directory is configured.
pub fn write_output(state: &mut State) {
    let Some(root) = state.configuration.artifact_directory.clone() else {
        return;
    };
    let mut failures = Vec::new();
    let mut written = 0usize;
    for output in state.generated_outputs() {
        let dir = root.join(&output.namespace).join(&output.folder_name);
        let path = dir.join(&output.file_name);
        let bytes = output
            .result_stream
            .as_deref()
            .unwrap_or(output.result_string.as_bytes());
        let result = std::fs::create_dir_all(&dir).and_then(|()| std::fs::write(&path, bytes));
        match result {
            Ok(()) => written += 1,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to write artifact");
                failures.push(format!("Unable to write {}: {}", path.display(), err));
            }
        }
    }
    tracing::info!(root = %root.display(), written, "artifacts written");
    for message in failures {
        state.add_pipeline_failure(WRITE_OUTPUT, message);
    }
}

/// Runs the whole pipeline over `state`.
pub fn execute_pipeline(state: &mut State) {
    let stages: [(&'static str, Stage); 6] = [
        (SETUP_PLUGINS, setup_plugins),
        (LOAD_FILES, load_files),
        (LOAD_FILE_INDEX, load_file_index),
        (BUILD_PARSE_TREE, build_parse_tree),
        (WALK_BUILDERS, walk_builders),
        (INITIALIZE_NAMESPACES, initialize_namespaces_stage),
    ];
    let completed = stages
        .into_iter()
        .all(|(name, stage)| run_stage(state, name, stage));

    if completed {
        run_plugins(state);
    }
    file_map_for_validation_failure(state);
    if !state.aborted {
        write_output(state);
    }

    tracing::info!(
        validation_failures = state.validation_failure.len(),
        pipeline_failures = state.pipeline_failure.len(),
        generator_results = state.generator_results.len(),
        aborted = state.aborted,
        "pipeline finished"
    );
}
