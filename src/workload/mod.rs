//! Workload types observed by the initializer
//!
//! A [`WorkloadObject`] is an `apps/v1` Deployment as the API server returns it while it is
//! still uninitialized. `metadata.initializers` is not part of the `k8s-openapi` ObjectMeta,
//! so metadata is modelled here; the spec and status reuse the `k8s-openapi` types.
//!
//! Metadata fields the initializer does not interpret (labels, timestamps, owner references,
//! managed fields, ...) are kept verbatim in [`WorkloadMetadata::other`] so that a full
//! replace round-trips them.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{ObjectReference, PodSpec};
use kube::core::ApiResource;
use serde::{Deserialize, Serialize};

/// API version of the watched workload kind
pub const WORKLOAD_API_VERSION: &str = "apps/v1";

/// Kind of the watched workload
pub const WORKLOAD_KIND: &str = "Deployment";

/// Object metadata including the pending initializer queue
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadMetadata {
    /// Object name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Server-assigned UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Optimistic-concurrency token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// Pending initializers; absent once every gate has been satisfied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializers: Option<Initializers>,
    /// Every other metadata field, passed through untouched
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Ordered queue of initializers that still have to run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initializers {
    /// Pending initializers in activation order; the head runs next
    #[serde(default)]
    pub pending: Vec<Initializer>,
    /// Failure status set by an initializer that rejected the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// A single pending initializer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initializer {
    /// Name of the controller responsible for this gate
    pub name: String,
}

impl Initializer {
    /// Create a pending initializer entry
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A Deployment decoded with its pending initializer queue
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadObject {
    /// API version (usually omitted on list items)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Kind (usually omitted on list items)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Object metadata
    #[serde(default)]
    pub metadata: WorkloadMetadata,
    /// Deployment spec holding the pod template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<DeploymentSpec>,
    /// Deployment status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeploymentStatus>,
}

impl WorkloadObject {
    /// API resource descriptor used to build request paths
    pub fn api_resource() -> ApiResource {
        ApiResource::erase::<Deployment>(&())
    }

    /// Object name, empty when unset
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Object namespace, empty when unset
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Pending initializer names in order; empty when the queue is absent
    pub fn pending_initializers(&self) -> &[Initializer] {
        self.metadata
            .initializers
            .as_ref()
            .map(|i| i.pending.as_slice())
            .unwrap_or_default()
    }

    /// Whether any initializer is still pending
    pub fn is_gated(&self) -> bool {
        !self.pending_initializers().is_empty()
    }

    /// Whether the given annotation key is present, regardless of its value
    pub fn has_annotation(&self, key: &str) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(key))
    }

    /// Pod spec of the template, if the Deployment carries one
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        self.spec.as_ref().and_then(|s| s.template.spec.as_ref())
    }

    /// Mutable pod spec of the template
    pub fn pod_spec_mut(&mut self) -> Option<&mut PodSpec> {
        self.spec.as_mut().and_then(|s| s.template.spec.as_mut())
    }

    /// Reference used when publishing Kubernetes Events about this object
    pub fn object_ref(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some(WORKLOAD_API_VERSION.to_string()),
            kind: Some(WORKLOAD_KIND.to_string()),
            name: self.metadata.name.clone(),
            namespace: self.metadata.namespace.clone(),
            uid: self.metadata.uid.clone(),
            resource_version: self.metadata.resource_version.clone(),
            ..Default::default()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn decodes_uninitialized_deployment() {
        let raw = serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "web",
                "namespace": "shop",
                "resourceVersion": "77",
                "labels": {"app": "web"},
                "initializers": {"pending": [{"name": "lxcfs.initializer.kubernetes.io"}]}
            },
            "spec": {
                "selector": {"matchLabels": {"app": "web"}},
                "template": {"spec": {"containers": [{"name": "web", "image": "nginx"}]}}
            }
        });

        let workload: WorkloadObject = serde_json::from_value(raw).unwrap();
        assert_eq!(workload.name(), "web");
        assert_eq!(workload.namespace(), "shop");
        assert!(workload.is_gated());
        assert_eq!(
            workload.pending_initializers()[0].name,
            "lxcfs.initializer.kubernetes.io"
        );
        assert_eq!(workload.pod_spec().unwrap().containers.len(), 1);
        assert!(workload.metadata.other.contains_key("labels"));
    }

    #[test]
    fn unknown_metadata_round_trips() {
        let raw = serde_json::json!({
            "metadata": {
                "name": "web",
                "labels": {"tier": "frontend"},
                "creationTimestamp": "2026-01-01T00:00:00Z"
            }
        });

        let workload: WorkloadObject = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&workload).unwrap();
        assert_eq!(back["metadata"], raw["metadata"]);
    }

    #[test]
    fn empty_pending_list_is_not_gated() {
        let mut workload = make_workload(&[], &["app"]);
        workload.metadata.initializers = Some(Initializers::default());
        assert!(!workload.is_gated());
    }

    #[test]
    fn annotation_presence_ignores_value() {
        let workload = with_annotation(make_workload(&[], &["app"]), "example.com/flag", "");
        assert!(workload.has_annotation("example.com/flag"));
        assert!(!workload.has_annotation("example.com/other"));
    }

    #[test]
    fn object_ref_identifies_deployment() {
        let reference = make_workload(&["a"], &["app"]).object_ref();
        assert_eq!(reference.kind.as_deref(), Some("Deployment"));
        assert_eq!(reference.api_version.as_deref(), Some("apps/v1"));
        assert_eq!(reference.name.as_deref(), Some("web"));
        assert_eq!(reference.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn api_resource_targets_deployments() {
        let resource = WorkloadObject::api_resource();
        assert_eq!(resource.plural, "deployments");
        assert_eq!(resource.group, "apps");
    }
}
