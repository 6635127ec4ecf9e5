//! Mount injection
//!
//! Appends the policy's mounts to every container and its volumes to the pod template.
//! Nothing pre-existing is removed or reordered, and same-named entries are not
//! deduplicated.

use crate::policy::MutationPolicy;
use crate::workload::WorkloadObject;

/// Apply `policy` to the workload's pod template in place
///
/// A Deployment without a pod spec is left unchanged.
pub fn apply(workload: &mut WorkloadObject, policy: &MutationPolicy) {
    let Some(pod) = workload.pod_spec_mut() else {
        return;
    };

    let mounts = policy.volume_mounts();
    for container in &mut pod.containers {
        container
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .extend(mounts.iter().cloned());
    }

    pod.volumes
        .get_or_insert_with(Vec::new)
        .extend(policy.volumes());
}
