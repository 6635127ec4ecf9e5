//! Resource store: where initialized workloads are written back

use async_trait::async_trait;
use json_patch::Patch;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{DynamicObject, Patch as KubePatch, PatchParams, PostParams};
use kube::core::{ApiResource, Request};
use kube::{Client, Resource};
use tracing::trace;

#[cfg(test)]
use mockall::automock;

use crate::workload::WorkloadObject;
use crate::Result;

/// Write operations against the API server
///
/// Each call is a single attempt; retry behaviour belongs to the
/// [`FailurePolicy`](super::FailurePolicy).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Apply a JSON Patch to the named workload
    async fn patch(&self, namespace: &str, name: &str, patch: &Patch) -> Result<WorkloadObject>;

    /// Replace the named workload; the object's resourceVersion guards the write
    async fn update(
        &self,
        namespace: &str,
        name: &str,
        object: &WorkloadObject,
    ) -> Result<WorkloadObject>;
}

/// Payload of a [`Write`]
#[derive(Clone, Debug, PartialEq)]
pub enum WriteBody {
    /// Field-level patch (gate removal plus injected mounts)
    Patch(Patch),
    /// Full replace (gate removal only)
    Update(Box<WorkloadObject>),
}

/// A pending write for one workload
#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    /// Object the write targets
    pub target: ObjectReference,
    /// What to send
    pub body: WriteBody,
}

impl Write {
    /// Patch the observed workload
    pub fn patch(observed: &WorkloadObject, patch: Patch) -> Self {
        Self {
            target: observed.object_ref(),
            body: WriteBody::Patch(patch),
        }
    }

    /// Replace the observed workload with `candidate`
    pub fn update(observed: &WorkloadObject, candidate: WorkloadObject) -> Self {
        Self {
            target: observed.object_ref(),
            body: WriteBody::Update(Box::new(candidate)),
        }
    }

    /// Target namespace
    pub fn namespace(&self) -> &str {
        self.target.namespace.as_deref().unwrap_or_default()
    }

    /// Target name
    pub fn name(&self) -> &str {
        self.target.name.as_deref().unwrap_or_default()
    }

    /// Short label for logs
    pub fn verb(&self) -> &'static str {
        match self.body {
            WriteBody::Patch(_) => "patch",
            WriteBody::Update(_) => "update",
        }
    }

    /// Send this write to the store once
    pub async fn submit(&self, store: &dyn ResourceStore) -> Result<WorkloadObject> {
        match &self.body {
            WriteBody::Patch(patch) => store.patch(self.namespace(), self.name(), patch).await,
            WriteBody::Update(object) => store.update(self.namespace(), self.name(), object).await,
        }
    }
}

/// Resource store backed by the Kubernetes API
pub struct KubeResourceStore {
    client: Client,
    resource: ApiResource,
}

impl KubeResourceStore {
    /// Create a store for Deployments using the given client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resource: WorkloadObject::api_resource(),
        }
    }

    fn request(&self, namespace: &str) -> Request {
        Request::new(DynamicObject::url_path(&self.resource, Some(namespace)))
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn patch(&self, namespace: &str, name: &str, patch: &Patch) -> Result<WorkloadObject> {
        let req = self
            .request(namespace)
            .patch(
                name,
                &PatchParams::default(),
                &KubePatch::<()>::Json(patch.clone()),
            )
            .map_err(kube::Error::BuildRequest)?;
        trace!(namespace = %namespace, name = %name, uri = %req.uri(), "Patching deployment");

        Ok(self.client.request::<WorkloadObject>(req).await?)
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        object: &WorkloadObject,
    ) -> Result<WorkloadObject> {
        let body = serde_json::to_vec(object)?;
        let req = self
            .request(namespace)
            .replace(name, &PostParams::default(), body)
            .map_err(kube::Error::BuildRequest)?;
        trace!(namespace = %namespace, name = %name, uri = %req.uri(), "Replacing deployment");

        Ok(self.client.request::<WorkloadObject>(req).await?)
    }
}
