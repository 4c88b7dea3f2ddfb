//! Per-plugin stage runners.
//!
//! Plugin code is isolated at this boundary: an `Err` or a panic from one enhancer, validator
//! or generator is recorded on the `State` and never propagates.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::plugin::MetaEdPlugin;
use crate::state::{EnhancerResult, State};

use super::{RUN_ENHANCERS, RUN_GENERATORS, RUN_VALIDATORS};

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub fn run_validators(state: &mut State, plugin: &MetaEdPlugin) {
    for validator in &plugin.validators {
        let metaed = &state.metaed;
        match catch_unwind(AssertUnwindSafe(|| (validator.validate)(metaed))) {
            Ok(failures) => {
                if !failures.is_empty() {
                    tracing::debug!(
                        plugin = %plugin.short_name,
                        validator = validator.name,
                        failures = failures.len(),
                        "validator reported failures"
                    );
                }
                state.validation_failure.extend(failures);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(plugin = %plugin.short_name, validator = validator.name, panic = %message, "validator panicked");
                state.add_pipeline_failure(
                    RUN_VALIDATORS,
                    format!("{}: validator {} panicked: {}", plugin.short_name, validator.name, message),
                );
            }
        }
    }
}

/// Runs the plugin's enhancers in declared order. Stops at the first failed blocking enhancer,
/// since later enhancers build on its output, and returns whether the plugin may go on to its
/// generators.
///
/// A non-blocking enhancer that reports `success: false` is recorded and skipped over. An `Err`
/// or a panic always stops the plugin.
pub fn run_enhancers(state: &mut State, plugin: &MetaEdPlugin) -> bool {
    for enhancer in &plugin.enhancers {
        let metaed = &mut state.metaed;
        let (result, faulted) = match catch_unwind(AssertUnwindSafe(|| (enhancer.enhance)(metaed))) {
            Ok(Ok(result)) => (result, false),
            Ok(Err(err)) => {
                tracing::warn!(
                    plugin = %plugin.short_name,
                    enhancer = enhancer.name,
                    error = %format!("{err:#}"),
                    "enhancer failed"
                );
                (EnhancerResult::failure(enhancer.name), true)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(plugin = %plugin.short_name, enhancer = enhancer.name, panic = %message, "enhancer panicked");
                (EnhancerResult::failure(enhancer.name), true)
            }
        };
        let success = result.success;
        state.enhancer_results.push(result);
        if success {
            continue;
        }
        if !faulted && !enhancer.blocking {
            tracing::warn!(
                plugin = %plugin.short_name,
                enhancer = enhancer.name,
                "non-blocking enhancer reported failure"
            );
            continue;
        }
        state.add_pipeline_failure(
            RUN_ENHANCERS,
            format!(
                "{}: enhancer {} did not succeed; remaining enhancers and generators of this plugin are skipped.",
                plugin.short_name, enhancer.name
            ),
        );
        return false;
    }
    true
}

pub fn run_generators(state: &mut State, plugin: &MetaEdPlugin) {
    for generator in &plugin.generators {
        let metaed = &state.metaed;
        match catch_unwind(AssertUnwindSafe(|| (generator.generate)(metaed))) {
            Ok(Ok(result)) => {
                tracing::info!(
                    plugin = %plugin.short_name,
                    generator = generator.name,
                    outputs = result.generated_output.len(),
                    "generator finished"
                );
                state.generator_results.push(result);
            }
            Ok(Err(err)) => {
                tracing::warn!(plugin = %plugin.short_name, generator = generator.name, error = %format!("{err:#}"), "generator failed");
                state.add_pipeline_failure(
                    RUN_GENERATORS,
                    format!("{}: generator {} failed: {err:#}", plugin.short_name, generator.name),
                );
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(plugin = %plugin.short_name, generator = generator.name, panic = %message, "generator panicked");
                state.add_pipeline_failure(
                    RUN_GENERATORS,
                    format!("{}: generator {} panicked: {}", plugin.short_name, generator.name, message),
                );
            }
        }
    }
}
