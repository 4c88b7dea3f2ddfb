//! MetaEd CLI
//!
//! Compiles MetaEd projects through the plugin pipeline:
//! - `build` runs validators, enhancers and generators and writes artifacts
//! - `validate` stops before generation and reports failures
//! - `plugins` lists the built-in plugins and their dependencies

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use metaed_core::{
    execute_pipeline, MetaEdConfiguration, PipelineOptions, PluginCatalog, State,
};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "metaed")]
#[command(author, version, about = "MetaEd: Ed-Fi metamodel compiler")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the configured projects and write generated artifacts.
    Build {
        /// MetaEd configuration file (JSON)
        #[arg(short, long, default_value = "metaed.json")]
        config: PathBuf,
        /// Artifact directory, overriding `artifactDirectory` in the configuration
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Skip enhancement and generation once a validator reports an error
        #[arg(long)]
        stop_on_validation_failure: bool,
    },

    /// Validate the configured projects without generating artifacts.
    Validate {
        /// MetaEd configuration file (JSON)
        #[arg(short, long, default_value = "metaed.json")]
        config: PathBuf,
        /// Print validation failures as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List the built-in plugins.
    Plugins,
}

fn catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog
        .register(metaed_plugin_unified::initialize())
        .register(metaed_plugin_xsd::initialize())
        .register(metaed_plugin_odsapi::initialize())
        .register(metaed_plugin_ods_relational::initialize())
        .register(metaed_plugin_ods_sqlserver::initialize());
    catalog
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_configuration(path: &Path) -> Result<MetaEdConfiguration> {
    let configuration = MetaEdConfiguration::load(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        projects = configuration.projects.len(),
        "configuration loaded"
    );
    Ok(configuration)
}

fn cmd_build(config: &Path, out: Option<PathBuf>, stop_on_validation_failure: bool) -> Result<bool> {
    let mut configuration = load_configuration(config)?;
    if out.is_some() {
        configuration.artifact_directory = out;
    }
    let artifact_directory = configuration.artifact_directory.clone();

    let options = PipelineOptions {
        stop_on_validation_failure,
        ..PipelineOptions::default()
    };
    let mut state = State::new(configuration, catalog()).with_options(options);
    execute_pipeline(&mut state);

    report::print_validation_failures(&state);
    report::print_pipeline_failures(&state);
    if let (Some(dir), false) = (artifact_directory, state.aborted) {
        eprintln!("{} {}", "wrote".green().bold(), dir.display().to_string().bold());
    }
    report::print_summary(&state);
    Ok(!state.has_errors())
}

fn cmd_validate(config: &Path, json: bool) -> Result<bool> {
    let mut configuration = load_configuration(config)?;
    configuration.artifact_directory = None;
    let options = PipelineOptions {
        run_generators: false,
        ..PipelineOptions::default()
    };
    let mut state = State::new(configuration, catalog()).with_options(options);
    execute_pipeline(&mut state);

    if json {
        println!("{}", serde_json::to_string_pretty(&state.validation_failure)?);
    } else {
        report::print_validation_failures(&state);
    }
    report::print_pipeline_failures(&state);
    report::print_summary(&state);
    Ok(!state.has_errors())
}

fn cmd_plugins() {
    for plugin in catalog().iter() {
        let depends = if plugin.depends_on_plugins.is_empty() {
            String::new()
        } else {
            format!(" (depends on {})", plugin.depends_on_plugins.join(", "))
        };
        println!(
            "{} {}{}",
            plugin.short_name.bold(),
            plugin.default_target_technology_version,
            depends.dimmed()
        );
        println!(
            "  {} {} validator(s), {} enhancer(s), {} generator(s)",
            "→".yellow(),
            plugin.validators.len(),
            plugin.enhancers.len(),
            plugin.generators.len()
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            config,
            out,
            stop_on_validation_failure,
        } => cmd_build(&config, out, stop_on_validation_failure),
        Commands::Validate { config, json } => cmd_validate(&config, json),
        Commands::Plugins => {
            cmd_plugins();
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn catalog_has_every_builtin_plugin() {
        let catalog = catalog();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(
            names,
            vec![
                "edfiOdsApi",
                "edfiOdsRelational",
                "edfiOdsSqlServer",
                "edfiUnified",
                "edfiXsd"
            ]
        );
    }

    #[test]
    fn verbosity_flags_count() {
        let cli = Cli::parse_from(["metaed", "-vv", "validate", "--config", "m.json", "--json"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Validate { json: true, .. }));
    }
}
