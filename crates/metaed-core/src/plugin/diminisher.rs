//! Version-gated corrective enhancers.
//!
//! A diminisher patches one named structure for a range of data standard versions. Outside
//! that range it is a successful no-op. Inside the range, a missing patch target is reported
//! as a failed result rather than skipped, since it means the model no longer looks the way
//! the patch expects.

use crate::environment::MetaEdEnvironment;
use crate::state::EnhancerResult;
use crate::version::version_satisfies;

/// Outcome of a diminisher's patch closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    Applied,
    TargetNotFound,
}

pub fn run_diminisher<F>(
    metaed: &mut MetaEdEnvironment,
    enhancer_name: &str,
    target_versions: &str,
    patch: F,
) -> anyhow::Result<EnhancerResult>
where
    F: FnOnce(&mut MetaEdEnvironment) -> anyhow::Result<Patch>,
{
    if !version_satisfies(&metaed.data_standard_version, target_versions) {
        tracing::debug!(
            enhancer = enhancer_name,
            version = %metaed.data_standard_version,
            target = target_versions,
            "diminisher does not apply"
        );
        return Ok(EnhancerResult::success(enhancer_name));
    }

    match patch(metaed)? {
        Patch::Applied => Ok(EnhancerResult::success(enhancer_name)),
        Patch::TargetNotFound => {
            tracing::warn!(enhancer = enhancer_name, "diminisher target not found");
            Ok(EnhancerResult::failure(enhancer_name))
        }
    }
}
