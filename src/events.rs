//! Kubernetes Event publishing
//!
//! Used by the dead-letter failure policy to surface workloads that could not be
//! initialized. Publishing is fire-and-forget: a failed publish is logged and never turns
//! into an error for the caller.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Reason shown on Warning events for workloads whose write failed
pub const REASON_INITIALIZATION_FAILED: &str = "InitializationFailed";

/// Action shown on events emitted by this controller
pub const ACTION_INITIALIZE: &str = "Initialize";

/// Publishes Events about workloads
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a Warning event on `target`
    async fn warn(&self, target: &ObjectReference, reason: &str, note: String);
}

/// Publisher backed by `kube::runtime::events::Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn warn(&self, target: &ObjectReference, reason: &str, note: String) {
        let event = Event {
            type_: EventType::Warning,
            reason: reason.to_string(),
            note: Some(note),
            action: ACTION_INITIALIZE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, target).await {
            warn!(
                reason,
                name = ?target.name,
                namespace = ?target.namespace,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}
