//! Terminal reporting of a finished pipeline run.

use colored::Colorize;
use metaed_core::state::FailureCategory;
use metaed_core::{State, ValidationFailure};

fn location(failure: &ValidationFailure) -> String {
    match (&failure.file_map, &failure.source_map) {
        (Some(file), _) => format!("{}:{}", file.full_path.display(), file.line_number),
        (None, Some(source)) => format!("line {}", source.line),
        (None, None) => String::new(),
    }
}

pub fn print_validation_failures(state: &State) {
    for failure in &state.validation_failure {
        let marker = match failure.category {
            FailureCategory::Error => "error:".red().bold(),
            FailureCategory::Warning => "warning:".yellow().bold(),
        };
        eprintln!(
            "{} {} {}",
            marker,
            failure.message,
            format!("[{}] {}", failure.validator_name, location(failure)).dimmed()
        );
    }
}

pub fn print_pipeline_failures(state: &State) {
    for failure in &state.pipeline_failure {
        eprintln!(
            "{} {} {}",
            "failed:".red().bold(),
            failure.message,
            format!("[{}]", failure.stage_name).dimmed()
        );
    }
    for result in state.enhancer_results.iter().filter(|r| !r.success) {
        eprintln!("{} enhancer {}", "failed:".red().bold(), result.enhancer_name);
    }
}

pub fn print_summary(state: &State) {
    let errors = state.validation_failure.iter().filter(|f| f.is_error()).count();
    let warnings = state.validation_failure.len() - errors;
    let outputs = state.generated_outputs().count();
    if state.has_errors() {
        eprintln!(
            "{} {} error(s), {} warning(s), {} pipeline failure(s)",
            "failed".red().bold(),
            errors,
            warnings,
            state.pipeline_failure.len()
        );
    } else {
        eprintln!(
            "{} {} plugin(s), {} warning(s), {} artifact(s)",
            "ok".green().bold(),
            state.plugins.len(),
            warnings,
            outputs
        );
    }
}
