use crate::config::MetaEdConfiguration;
use crate::environment::MetaEdEnvironment;
use crate::graph::DependencyGraph;
use crate::version::format_version_with_suppress_prerelease;

use super::PipelineError;

/// Attaches project metadata to the namespaces the builders created and wires their
/// dependencies.
///
/// Configured namespaces take their project name, version and extension from configuration.
/// A project's explicit `dependencies` are used as given; otherwise an extension namespace
/// depends on every core namespace, in configured order. Safe to run more than once.
pub fn initialize_namespaces(
    metaed: &mut MetaEdEnvironment,
    configuration: &MetaEdConfiguration,
) -> Result<(), PipelineError> {
    if metaed.namespace.is_empty() {
        return Err(PipelineError::NoNamespaces);
    }

    for project in &configuration.projects {
        let Some(namespace) = metaed.namespace.get_mut(&project.namespace_name) else {
            tracing::warn!(
                project = %project.project_name,
                namespace = %project.namespace_name,
                "configured project declares no namespace in its source files"
            );
            continue;
        };
        if namespace.is_extension != project.is_extension() {
            tracing::warn!(
                namespace = %namespace.namespace_name,
                "project extension in configuration overrides source declaration"
            );
        }
        namespace.project_name = project.project_name.clone();
        namespace.project_version = project.project_version.clone();
        namespace.is_extension = project.is_extension();
        namespace.project_extension = if namespace.is_extension {
            project.project_extension.clone()
        } else {
            String::new()
        };
    }

    // Core namespaces in configured order, then any unconfigured ones by name.
    let mut core: Vec<String> = configuration
        .projects
        .iter()
        .map(|p| p.namespace_name.clone())
        .filter(|name| metaed.namespace.get(name).map_or(false, |ns| !ns.is_extension))
        .collect();
    for (name, namespace) in &metaed.namespace {
        if !namespace.is_extension && !core.contains(name) {
            core.push(name.clone());
        }
    }

    let names: Vec<String> = metaed.namespace.keys().cloned().collect();
    for name in &names {
        let explicit = configuration
            .project_for_namespace(name)
            .and_then(|p| p.dependencies.clone());
        let is_extension = metaed.namespace[name].is_extension;
        let dependencies = match explicit {
            Some(dependencies) => dependencies,
            None if is_extension => core.clone(),
            None => Vec::new(),
        };
        if let Some(missing) = dependencies
            .iter()
            .find(|d| !metaed.namespace.contains_key(d.as_str()))
        {
            return Err(PipelineError::MissingNamespaceDependency {
                namespace: name.clone(),
                dependency: missing.clone(),
            });
        }
        if let Some(namespace) = metaed.namespace.get_mut(name) {
            namespace.dependencies = dependencies;
        }
    }

    let mut graph = DependencyGraph::new();
    for (name, namespace) in &metaed.namespace {
        graph.add_node(name);
        for dependency in &namespace.dependencies {
            if dependency == name {
                return Err(PipelineError::NamespaceCycle(vec![name.clone()]));
            }
            graph.add_edge(name, dependency, true);
        }
    }
    let resolution = graph.resolve()?;
    if let Some(cycle) = resolution.groups.iter().find(|g| g.len() > 1) {
        return Err(PipelineError::NamespaceCycle(cycle.clone()));
    }

    if let Some(core_project) = configuration.projects.iter().find(|p| !p.is_extension()) {
        metaed.data_standard_version = format_version_with_suppress_prerelease(
            &core_project.project_version,
            configuration.suppress_prerelease_version,
        );
    }

    tracing::info!(
        namespaces = metaed.namespace.len(),
        data_standard_version = %metaed.data_standard_version,
        "namespaces initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaEdProject;
    use crate::model::Namespace;

    fn project(namespace: &str, extension: &str, version: &str) -> MetaEdProject {
        MetaEdProject {
            project_name: namespace.to_string(),
            namespace_name: namespace.to_string(),
            project_extension: extension.to_string(),
            project_version: version.to_string(),
            description: String::new(),
            dependencies: None,
        }
    }

    fn environment() -> MetaEdEnvironment {
        let mut metaed = MetaEdEnvironment::new();
        metaed.add_namespace(Namespace::new("EdFi"));
        metaed.add_namespace(Namespace::extension("Sample", "SAMPLE"));
        metaed
    }

    #[test]
    fn extension_depends_on_core_and_version_is_taken_from_core_project() {
        let mut metaed = environment();
        let configuration = MetaEdConfiguration {
            projects: vec![
                project("EdFi", "core", "3.1.0-pre.2"),
                project("Sample", "SAMPLE", "1.0.0"),
            ],
            ..MetaEdConfiguration::default()
        };
        initialize_namespaces(&mut metaed, &configuration).unwrap();

        assert_eq!(metaed.namespace["Sample"].dependencies, vec!["EdFi"]);
        assert!(metaed.namespace["EdFi"].dependencies.is_empty());
        assert_eq!(metaed.namespace["Sample"].project_version, "1.0.0");
        assert_eq!(metaed.data_standard_version, "3.1.0");
    }

    #[test]
    fn missing_declared_dependency_is_fatal() {
        let mut metaed = environment();
        let mut sample = project("Sample", "SAMPLE", "1.0.0");
        sample.dependencies = Some(vec!["Nope".to_string()]);
        let configuration = MetaEdConfiguration {
            projects: vec![project("EdFi", "core", "3.0.0"), sample],
            ..MetaEdConfiguration::default()
        };
        let err = initialize_namespaces(&mut metaed, &configuration).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingNamespaceDependency { ref dependency, .. } if dependency == "Nope"
        ));
    }

    #[test]
    fn dependency_cycle_is_fatal() {
        let mut metaed = environment();
        let mut core = project("EdFi", "core", "3.0.0");
        core.dependencies = Some(vec!["Sample".to_string()]);
        let configuration = MetaEdConfiguration {
            projects: vec![core, project("Sample", "SAMPLE", "1.0.0")],
            ..MetaEdConfiguration::default()
        };
        assert!(matches!(
            initialize_namespaces(&mut metaed, &configuration),
            Err(PipelineError::NamespaceCycle(_))
        ));
    }

    #[test]
    fn no_namespaces_is_fatal() {
        let mut metaed = MetaEdEnvironment::new();
        assert!(matches!(
            initialize_namespaces(&mut metaed, &MetaEdConfiguration::default()),
            Err(PipelineError::NoNamespaces)
        ));
    }
}
