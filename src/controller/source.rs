//! Event source: delivers newly created, still-gated workloads
//!
//! The Kubernetes implementation performs an initial listing (startup sync) and then
//! watches from the listing's resourceVersion. Only `ADDED` events are consumed; modified
//! and deleted objects just advance the resume point. Payloads are decoded into
//! [`WorkloadObject`] here so the pipeline never sees untyped JSON.

use std::time::Duration;

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use kube::api::{DynamicObject, ListParams, WatchParams};
use kube::core::{ApiResource, ObjectList, Request, WatchEvent};
use kube::{Client, Resource};
use tracing::{debug, info};

use crate::workload::WorkloadObject;
use crate::{Error, Result};

/// Server-side watch timeout; the watch is re-established from the last seen version
const WATCH_TIMEOUT_SECS: u32 = 290;

/// HTTP status the API server uses for an expired resourceVersion
const GONE: u16 = 410;

/// Stream of creation notifications for gated workloads
#[cfg_attr(test, mockall::automock)]
pub trait EventSource: Send + Sync {
    /// Subscribe to creation notifications
    ///
    /// The stream first yields the gated objects that already exist, then every newly
    /// created gated object. It ends with an error when listing or watching fails; the
    /// caller resubscribes, which relists.
    fn subscribe(&self) -> BoxStream<'static, Result<WorkloadObject>>;
}

/// Event source backed by list+watch against the Kubernetes API
pub struct KubeEventSource {
    client: Client,
    resource: ApiResource,
    namespace: Option<String>,
    watch_timeout: Duration,
}

impl KubeEventSource {
    /// Watch Deployments in `namespace`, or in every namespace when `None`
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            client,
            resource: WorkloadObject::api_resource(),
            namespace,
            watch_timeout: Duration::from_secs(WATCH_TIMEOUT_SECS.into()),
        }
    }

    fn url_path(&self) -> String {
        DynamicObject::url_path(&self.resource, self.namespace.as_deref())
    }
}

impl EventSource for KubeEventSource {
    fn subscribe(&self) -> BoxStream<'static, Result<WorkloadObject>> {
        let client = self.client.clone();
        let request = Request::new(self.url_path());
        let timeout = self.watch_timeout.as_secs() as u32;

        async_stream::try_stream! {
            let mut resume: Option<String> = None;
            loop {
                let version = match resume.take() {
                    Some(version) => version,
                    None => {
                        let list = list_workloads(&client, &request).await?;
                        info!(count = list.items.len(), "Listed deployments");
                        for workload in list.items.into_iter().filter(WorkloadObject::is_gated) {
                            yield workload;
                        }
                        list.metadata.resource_version.unwrap_or_else(|| "0".to_string())
                    }
                };

                let req = request
                    .watch(&WatchParams::default().timeout(timeout), &version)
                    .map_err(kube::Error::BuildRequest)?;
                let req = include_uninitialized(req)?;
                let mut events = Box::pin(client.request_events::<WorkloadObject>(req).await?);
                let mut last_seen = version;
                let mut expired = false;

                while let Some(event) = events.try_next().await? {
                    match event {
                        WatchEvent::Added(workload) => {
                            if let Some(version) = &workload.metadata.resource_version {
                                last_seen = version.clone();
                            }
                            if workload.is_gated() {
                                yield workload;
                            }
                        }
                        WatchEvent::Modified(workload) | WatchEvent::Deleted(workload) => {
                            if let Some(version) = workload.metadata.resource_version {
                                last_seen = version;
                            }
                        }
                        WatchEvent::Bookmark(bookmark) => {
                            last_seen = bookmark.metadata.resource_version;
                        }
                        WatchEvent::Error(e) if e.code == GONE => {
                            debug!(version = %last_seen, "Watch version expired; relisting");
                            expired = true;
                            break;
                        }
                        WatchEvent::Error(e) => {
                            Err::<(), Error>(kube::Error::Api(e).into())?;
                        }
                    }
                }

                if !expired {
                    resume = Some(last_seen);
                }
            }
        }
        .boxed()
    }
}

async fn list_workloads(client: &Client, request: &Request) -> Result<ObjectList<WorkloadObject>> {
    let req = request
        .list(&ListParams::default())
        .map_err(kube::Error::BuildRequest)?;
    let req = include_uninitialized(req)?;
    Ok(client.request::<ObjectList<WorkloadObject>>(req).await?)
}

/// Ask the API server to return objects whose initializers are still pending
fn include_uninitialized(mut req: http::Request<Vec<u8>>) -> Result<http::Request<Vec<u8>>> {
    let uri = req.uri().to_string();
    let separator = match uri.find('?') {
        None => "?",
        Some(idx) if idx + 1 == uri.len() => "",
        Some(_) => "&",
    };
    *req.uri_mut() = format!("{uri}{separator}includeUninitialized=true")
        .parse()
        .map_err(|e: http::uri::InvalidUri| Error::request(e.to_string()))?;
    Ok(req)
}
