//! Initialization pipeline for a single observed workload
//!
//! Runs the gate check, the annotation decision, the mount injection and the patch
//! synthesis in that order. Everything here is synchronous and free of I/O; submitting
//! the result is the controller's job.

pub mod annotation;
pub mod gate;
pub mod mutate;
pub mod patch;

use json_patch::Patch;
use tracing::{debug, info};

use crate::config::InitializerConfig;
use crate::workload::WorkloadObject;
use crate::Result;

pub use gate::GateDecision;

/// What the controller should submit for an observed workload
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// No pending initializers; nothing to do
    Inactive,
    /// Another initializer is at the head of the queue
    Deferred {
        /// Initializer that runs next
        next: String,
    },
    /// Gate removed, mutation skipped; submit the object as a full update
    PassThrough(Box<WorkloadObject>),
    /// Gate removed and mounts injected; submit the patch
    Patch(Patch),
}

/// Decide what to do with an observed workload
///
/// The gate is always released once this controller owns it, whether or not the workload
/// opted into mutation, so opted-out workloads are never left blocked.
pub fn initialize(workload: &WorkloadObject, config: &InitializerConfig) -> Result<Outcome> {
    match gate::evaluate(workload, &config.initializer_name) {
        GateDecision::Inactive => return Ok(Outcome::Inactive),
        GateDecision::Deferred { next } => {
            return Ok(Outcome::Deferred {
                next: next.to_string(),
            })
        }
        GateDecision::Owned => {}
    }

    info!(
        namespace = %workload.namespace(),
        name = %workload.name(),
        "Initializing deployment"
    );

    let mut candidate = workload.clone();
    gate::release(&mut candidate);

    if !annotation::should_mutate(&candidate, config) {
        info!(
            namespace = %workload.namespace(),
            name = %workload.name(),
            annotation = %config.annotation_key,
            "Required annotation missing; skipping lxcfs injection"
        );
        return Ok(Outcome::PassThrough(Box::new(candidate)));
    }

    mutate::apply(&mut candidate, &config.policy);

    let patch = patch::synthesize(workload, &candidate)?;
    debug!(
        namespace = %workload.namespace(),
        name = %workload.name(),
        operations = patch.0.len(),
        "Synthesized initialization patch"
    );

    Ok(Outcome::Patch(patch))
}
