//! `MetaEdConfiguration`: projects to compile and plugin settings, read from camelCase JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plugin::PluginManifest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration lists {projects} projects but {paths} project paths")]
    ProjectPathMismatch { projects: usize, paths: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaEdProject {
    pub project_name: String,
    pub namespace_name: String,
    /// `core` for the data standard itself, otherwise the extension's project prefix.
    #[serde(default = "default_project_extension")]
    pub project_extension: String,
    pub project_version: String,
    #[serde(default)]
    pub description: String,
    /// Explicit namespace dependencies. An extension without them depends on every core
    /// namespace.
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

fn default_project_extension() -> String {
    "core".to_string()
}

impl MetaEdProject {
    pub fn is_extension(&self) -> bool {
        !self.project_extension.is_empty() && self.project_extension != "core"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginTechVersion {
    pub target_technology_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaEdConfiguration {
    pub projects: Vec<MetaEdProject>,
    pub project_paths: Vec<PathBuf>,
    pub plugin_tech_version: BTreeMap<String, PluginTechVersion>,
    pub default_plugin_tech_version: Option<String>,
    /// Inline plugin selection. Takes precedence over `plugin_manifest_directory`.
    pub plugins: Option<Vec<PluginManifest>>,
    pub plugin_manifest_directory: Option<PathBuf>,
    pub artifact_directory: Option<PathBuf>,
    pub alliance_mode: bool,
    pub suppress_prerelease_version: bool,
}

impl Default for MetaEdConfiguration {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            project_paths: Vec::new(),
            plugin_tech_version: BTreeMap::new(),
            default_plugin_tech_version: None,
            plugins: None,
            plugin_manifest_directory: None,
            artifact_directory: None,
            alliance_mode: false,
            suppress_prerelease_version: true,
        }
    }
}

impl MetaEdConfiguration {
    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let mut config: MetaEdConfiguration =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if config.projects.len() != config.project_paths.len() {
            return Err(ConfigError::ProjectPathMismatch {
                projects: config.projects.len(),
                paths: config.project_paths.len(),
            });
        }
        // Relative paths resolve against the configuration file's directory.
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            for project_path in config
                .project_paths
                .iter_mut()
                .chain(config.artifact_directory.iter_mut())
                .chain(config.plugin_manifest_directory.iter_mut())
            {
                if project_path.is_relative() {
                    *project_path = base.join(&*project_path);
                }
            }
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }

    pub fn project_for_namespace(&self, namespace_name: &str) -> Option<&MetaEdProject> {
        self.projects
            .iter()
            .find(|p| p.namespace_name == namespace_name)
    }

    /// Projects paired with their source directories, in configured order.
    pub fn project_inputs(&self) -> impl Iterator<Item = (&MetaEdProject, &PathBuf)> {
        self.projects.iter().zip(self.project_paths.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_with_defaults() {
        let text = r#"{
            "projects": [
                { "projectName": "Ed-Fi", "namespaceName": "EdFi", "projectVersion": "3.0.0" },
                { "projectName": "Sample", "namespaceName": "Sample",
                  "projectExtension": "SAMPLE", "projectVersion": "1.0.0" }
            ],
            "projectPaths": ["core", "/abs/extension"],
            "pluginTechVersion": { "edfiOdsApi": { "targetTechnologyVersion": "3.1.0" } },
            "artifactDirectory": "out"
        }"#;
        let config = MetaEdConfiguration::from_json(Path::new("/work/metaed.json"), text).unwrap();

        assert_eq!(config.projects.len(), 2);
        assert!(!config.projects[0].is_extension());
        assert!(config.projects[1].is_extension());
        assert_eq!(config.project_paths[0], PathBuf::from("/work/core"));
        assert_eq!(config.project_paths[1], PathBuf::from("/abs/extension"));
        assert_eq!(config.artifact_directory, Some(PathBuf::from("/work/out")));
        assert_eq!(
            config.plugin_tech_version["edfiOdsApi"].target_technology_version,
            "3.1.0"
        );
        assert!(config.suppress_prerelease_version);
        assert!(!config.alliance_mode);
    }

    #[test]
    fn mismatched_paths_are_rejected() {
        let text = r#"{ "projects": [], "projectPaths": ["a"] }"#;
        let err = MetaEdConfiguration::from_json(Path::new("metaed.json"), text).unwrap_err();
        assert!(matches!(err, ConfigError::ProjectPathMismatch { projects: 0, paths: 1 }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = MetaEdConfiguration::from_json(Path::new("metaed.json"), "{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
