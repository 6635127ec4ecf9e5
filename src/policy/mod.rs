//! Mutation policy: the host-backed mounts injected into every container
//!
//! A policy is an ordered list of [`PolicyEntry`] values, each pairing a container mount
//! with the host-path volume that backs it. The pair shares one name, so the mount always
//! resolves to the volume added alongside it.

use k8s_openapi::api::core::v1::{HostPathVolumeSource, Volume, VolumeMount};

/// Host directory where lxcfs exposes its virtualized `/proc` files
pub const LXCFS_ROOT: &str = "/var/lib/lxcfs";

/// `/proc` files served by lxcfs, in injection order
const LXCFS_PROC_FILES: [&str; 6] = ["cpuinfo", "meminfo", "diskstats", "stat", "swaps", "uptime"];

/// Where a policy volume is mounted inside each container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountSpec {
    /// Mount name, equal to the backing volume's name
    pub name: String,
    /// Absolute path inside the container
    pub container_path: String,
}

/// Host path backing a policy volume
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Volume name
    pub name: String,
    /// Absolute path on the node
    pub host_path: String,
}

/// A mount and the volume that backs it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyEntry {
    /// Container side
    pub mount: MountSpec,
    /// Pod side
    pub volume: VolumeSpec,
}

impl PolicyEntry {
    /// Pair a host file with a container path under a single name
    pub fn host_file(
        name: impl Into<String>,
        host_path: impl Into<String>,
        container_path: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            mount: MountSpec {
                name: name.clone(),
                container_path: container_path.into(),
            },
            volume: VolumeSpec {
                name,
                host_path: host_path.into(),
            },
        }
    }

    /// Kubernetes volume mount for this entry
    pub fn volume_mount(&self) -> VolumeMount {
        VolumeMount {
            name: self.mount.name.clone(),
            mount_path: self.mount.container_path.clone(),
            ..Default::default()
        }
    }

    /// Kubernetes host-path volume for this entry
    pub fn volume(&self) -> Volume {
        Volume {
            name: self.volume.name.clone(),
            host_path: Some(HostPathVolumeSource {
                path: self.volume.host_path.clone(),
                type_: None,
            }),
            ..Default::default()
        }
    }
}

/// Fixed, ordered set of mounts applied to every mutated workload
///
/// Built once at startup and shared read-only; there is no way to modify a policy after
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationPolicy {
    entries: Vec<PolicyEntry>,
}

impl MutationPolicy {
    /// Build a policy from entries in the order they should be appended
    pub fn new(entries: Vec<PolicyEntry>) -> Self {
        Self { entries }
    }

    /// The lxcfs policy: six `/proc` files bind-mounted from [`LXCFS_ROOT`]
    pub fn lxcfs() -> Self {
        Self::new(
            LXCFS_PROC_FILES
                .iter()
                .map(|file| {
                    PolicyEntry::host_file(
                        format!("lxcfs-proc-{file}"),
                        format!("{LXCFS_ROOT}/proc/{file}"),
                        format!("/proc/{file}"),
                    )
                })
                .collect(),
        )
    }

    /// Entries in policy order
    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// Number of mount/volume pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the policy injects nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Volume mounts in policy order
    pub fn volume_mounts(&self) -> Vec<VolumeMount> {
        self.entries.iter().map(PolicyEntry::volume_mount).collect()
    }

    /// Volumes in policy order
    pub fn volumes(&self) -> Vec<Volume> {
        self.entries.iter().map(PolicyEntry::volume).collect()
    }
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self::lxcfs()
    }
}
