//! Opt-in annotation check

use crate::config::InitializerConfig;
use crate::workload::WorkloadObject;

/// Whether the workload should be mutated
///
/// With `require_annotation` off every owned workload is mutated. Otherwise only the
/// presence of the configured key matters; its value is ignored.
pub fn should_mutate(workload: &WorkloadObject, config: &InitializerConfig) -> bool {
    !config.require_annotation || workload.has_annotation(&config.annotation_key)
}
