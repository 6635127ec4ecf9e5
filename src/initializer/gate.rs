//! Pending-initializer gate handling
//!
//! Initializers run strictly in queue order: a controller may only act when its own name
//! is at the head of `metadata.initializers.pending`.

use crate::workload::WorkloadObject;

/// Outcome of inspecting a workload's initializer queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision<'a> {
    /// No pending initializers; the object is already active or never required gating
    Inactive,
    /// Another initializer runs first
    Deferred {
        /// Name at the head of the queue
        next: &'a str,
    },
    /// This controller is next in line
    Owned,
}

/// Decide whether `initializer_name` owns the next initialization step
pub fn evaluate<'a>(workload: &'a WorkloadObject, initializer_name: &str) -> GateDecision<'a> {
    match workload.pending_initializers().first() {
        None => GateDecision::Inactive,
        Some(head) if head.name == initializer_name => GateDecision::Owned,
        Some(head) => GateDecision::Deferred { next: &head.name },
    }
}

/// Remove the head of the pending queue
///
/// The remaining initializers keep their order. When the queue empties the whole
/// `initializers` attribute is cleared so readers see "gating satisfied" rather than an
/// empty list.
pub fn release(workload: &mut WorkloadObject) {
    let Some(initializers) = workload.metadata.initializers.as_mut() else {
        return;
    };

    if !initializers.pending.is_empty() {
        initializers.pending.remove(0);
    }
    if initializers.pending.is_empty() {
        workload.metadata.initializers = None;
    }
}
