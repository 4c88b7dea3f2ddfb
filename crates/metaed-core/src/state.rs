//! The compilation context threaded through every pipeline stage, and the result records
//! stages append to it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::MetaEdConfiguration;
use crate::environment::MetaEdEnvironment;
use crate::file::{FileIndex, FileSet};
use crate::grammar::ParseTree;
use crate::model::SourceMap;
use crate::plugin::{MetaEdPlugin, PluginCatalog};

// ============================================================================
// Result records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFailure {
    pub message: String,
    pub stage_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancerResult {
    pub enhancer_name: String,
    pub success: bool,
}

impl EnhancerResult {
    pub fn success(enhancer_name: &str) -> Self {
        Self {
            enhancer_name: enhancer_name.to_string(),
            success: true,
        }
    }

    pub fn failure(enhancer_name: &str) -> Self {
        Self {
            enhancer_name: enhancer_name.to_string(),
            success: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCategory {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMap {
    pub full_path: PathBuf,
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub validator_name: String,
    pub category: FailureCategory,
    pub message: String,
    pub source_map: Option<SourceMap>,
    pub file_map: Option<FileMap>,
}

impl ValidationFailure {
    pub fn error(validator_name: &str, message: impl Into<String>, source_map: SourceMap) -> Self {
        Self {
            validator_name: validator_name.to_string(),
            category: FailureCategory::Error,
            message: message.into(),
            source_map: Some(source_map),
            file_map: None,
        }
    }

    pub fn warning(validator_name: &str, message: impl Into<String>, source_map: SourceMap) -> Self {
        Self {
            category: FailureCategory::Warning,
            ..Self::error(validator_name, message, source_map)
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == FailureCategory::Error
    }
}

/// One artifact. Binary generators fill `result_stream` and leave `result_string` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOutput {
    pub name: String,
    pub namespace: String,
    pub folder_name: String,
    pub file_name: String,
    pub result_string: String,
    pub result_stream: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorResult {
    pub generator_name: String,
    pub generated_output: Vec<GeneratedOutput>,
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub run_validators: bool,
    pub run_enhancers: bool,
    pub run_generators: bool,
    pub stop_on_validation_failure: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            run_validators: true,
            run_enhancers: true,
            run_generators: true,
            stop_on_validation_failure: false,
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Created fresh per run; stages only append to the result lists.
#[derive(Debug, Default)]
pub struct State {
    pub configuration: MetaEdConfiguration,
    pub options: PipelineOptions,
    pub catalog: PluginCatalog,
    /// Loaded plugins in dependency order.
    pub plugins: Vec<MetaEdPlugin>,
    pub file_exclusions: BTreeSet<PathBuf>,
    pub loaded_file_set: Vec<FileSet>,
    pub file_index: FileIndex,
    pub parse_tree: ParseTree,
    pub metaed: MetaEdEnvironment,
    pub validation_failure: Vec<ValidationFailure>,
    pub enhancer_results: Vec<EnhancerResult>,
    pub generator_results: Vec<GeneratorResult>,
    pub pipeline_failure: Vec<PipelineFailure>,
    /// Set when a fatal stage error short-circuited the run.
    pub aborted: bool,
}

impl State {
    pub fn new(configuration: MetaEdConfiguration, catalog: PluginCatalog) -> Self {
        Self {
            configuration,
            catalog,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.pipeline_failure.is_empty() || self.validation_failure.iter().any(|f| f.is_error())
    }

    pub fn add_pipeline_failure(&mut self, stage_name: &str, message: impl Into<String>) {
        self.pipeline_failure.push(PipelineFailure {
            message: message.into(),
            stage_name: stage_name.to_string(),
        });
    }

    pub fn generated_outputs(&self) -> impl Iterator<Item = &GeneratedOutput> {
        self.generator_results
            .iter()
            .flat_map(|result| result.generated_output.iter())
    }
}
