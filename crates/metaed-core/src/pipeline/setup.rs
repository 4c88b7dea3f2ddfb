use std::collections::BTreeSet;
use std::path::Path;

use crate::graph::DependencyGraph;
use crate::plugin::{MetaEdPlugin, PluginEnvironment, PluginManifest};
use crate::state::State;

use super::{PipelineError, SETUP_PLUGINS};

fn read_manifest_directory(dir: &Path) -> Result<Vec<PluginManifest>, PipelineError> {
    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.map_err(|err| PipelineError::ManifestRead {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().map_or(false, |e| e == "json") {
            paths.push(path.to_path_buf());
        }
    }

    paths
        .into_iter()
        .map(|path| {
            let text = std::fs::read_to_string(&path).map_err(|source| {
                PipelineError::ManifestRead {
                    path: path.clone(),
                    source,
                }
            })?;
            serde_json::from_str(&text).map_err(|source| PipelineError::ManifestParse { path, source })
        })
        .collect()
}

/// Manifests selecting the plugins for this run.
fn plugin_manifests(state: &State) -> Result<Vec<PluginManifest>, PipelineError> {
    if let Some(manifests) = &state.configuration.plugins {
        return Ok(manifests.clone());
    }
    if let Some(dir) = &state.configuration.plugin_manifest_directory {
        return read_manifest_directory(dir);
    }
    Ok(state.catalog.names().map(PluginManifest::new).collect())
}

fn target_technology_version(state: &State, manifest: &PluginManifest, plugin: &MetaEdPlugin) -> String {
    state
        .configuration
        .plugin_tech_version
        .get(&plugin.short_name)
        .map(|v| v.target_technology_version.clone())
        .or_else(|| manifest.target_technology_version.clone())
        .or_else(|| state.configuration.default_plugin_tech_version.clone())
        .unwrap_or_else(|| plugin.default_target_technology_version.clone())
}

/// Selects plugins from the catalog, orders them by declared dependency and creates their
/// plugin environments.
pub fn setup_plugins(state: &mut State) -> Result<(), PipelineError> {
    let manifests = plugin_manifests(state)?;

    let mut selected: Vec<(MetaEdPlugin, String)> = Vec::new();
    for manifest in manifests.iter().filter(|m| m.enabled) {
        match state.catalog.get(&manifest.short_name) {
            Some(plugin) => {
                let version = target_technology_version(state, manifest, plugin);
                selected.push((plugin.clone(), version));
            }
            None => {
                tracing::warn!(plugin = %manifest.short_name, "plugin not found in catalog");
                state.add_pipeline_failure(
                    SETUP_PLUGINS,
                    format!("Plugin {} could not be loaded.", manifest.short_name),
                );
            }
        }
    }

    // Drop plugins whose dependencies are not loaded, until nothing changes.
    loop {
        let loaded: BTreeSet<String> = selected.iter().map(|(p, _)| p.short_name.clone()).collect();
        let Some(pos) = selected.iter().position(|(plugin, _)| {
            plugin
                .depends_on_plugins
                .iter()
                .any(|dependency| !loaded.contains(dependency))
        }) else {
            break;
        };
        let (plugin, _) = selected.remove(pos);
        let missing: Vec<&str> = plugin
            .depends_on_plugins
            .iter()
            .filter(|d| !loaded.contains(*d))
            .map(String::as_str)
            .collect();
        tracing::warn!(plugin = %plugin.short_name, missing = ?missing, "plugin dependency not loaded");
        state.add_pipeline_failure(
            SETUP_PLUGINS,
            format!(
                "Plugin {} depends on {} which is not loaded.",
                plugin.short_name,
                missing.join(", ")
            ),
        );
    }

    let mut graph = DependencyGraph::new();
    for (plugin, _) in &selected {
        graph.add_node(&plugin.short_name);
        for dependency in &plugin.depends_on_plugins {
            graph.add_edge(&plugin.short_name, dependency, true);
        }
    }
    let resolution = graph.resolve()?;
    if let Some(cycle) = resolution.groups.iter().find(|g| g.len() > 1) {
        return Err(PipelineError::PluginCycle(cycle.clone()));
    }

    for name in resolution.dependency_order() {
        let Some(pos) = selected.iter().position(|(p, _)| p.short_name == name) else {
            continue;
        };
        let (plugin, version) = selected.swap_remove(pos);
        tracing::info!(plugin = %plugin.short_name, target_technology_version = %version, "plugin loaded");
        state
            .metaed
            .add_plugin_environment(PluginEnvironment::new(&plugin.short_name, &version));
        state.plugins.push(plugin);
    }
    Ok(())
}
