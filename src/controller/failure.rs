//! Failure policies for workload writes
//!
//! The pipeline never retries on its own. What happens when a write fails is decided by
//! the [`FailurePolicy`] injected into the controller [`Context`](super::Context).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::events::{EventPublisher, REASON_INITIALIZATION_FAILED};
use crate::retry::{retry_with_backoff, BackoffConfig};
use crate::workload::WorkloadObject;
use crate::{Error, Result};

use super::store::{ResourceStore, Write};

/// Strategy for submitting a write and reacting to its failure
#[async_trait]
pub trait FailurePolicy: Send + Sync {
    /// Submit `write` to `store`, returning the stored object or the final error
    async fn submit(&self, store: &dyn ResourceStore, write: &Write) -> Result<WorkloadObject>;
}
/// Single attempt; the event loop logs the returned error and drops the event
/// Single attempt; a failure is returned for the event loop to log, and the event dropped
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAndDrop;

#[async_trait]
impl FailurePolicy for LogAndDrop {
    async fn submit(&self, store: &dyn ResourceStore, write: &Write) -> Result<WorkloadObject> {
        write.submit(store).await
    }
}

/// Bounded retry with exponential backoff
///
/// Conflicts are not retried: the write was computed from a stale object and would fail
/// the same way again.
#[derive(Clone, Debug, Default)]
pub struct RetryWithBackoff {
    backoff: BackoffConfig,
}

impl RetryWithBackoff {
    /// Create a policy with the given backoff schedule
    pub fn new(backoff: BackoffConfig) -> Self {
        Self { backoff }
    }
}

#[async_trait]
impl FailurePolicy for RetryWithBackoff {
    async fn submit(&self, store: &dyn ResourceStore, write: &Write) -> Result<WorkloadObject> {
        let operation = format!("{} {}/{}", write.verb(), write.namespace(), write.name());
        retry_with_backoff(
            &self.backoff,
            &operation,
            |e: &Error| !e.is_conflict(),
            || write.submit(store),
        )
        .await
    }
}

/// Single attempt; a failure is recorded as a Warning event on the workload
pub struct DeadLetter {
    publisher: Arc<dyn EventPublisher>,
}

impl DeadLetter {
    /// Create a policy publishing through `publisher`
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl FailurePolicy for DeadLetter {
    async fn submit(&self, store: &dyn ResourceStore, write: &Write) -> Result<WorkloadObject> {
        match write.submit(store).await {
            Ok(object) => Ok(object),
            Err(e) => {
                debug!(
                    namespace = %write.namespace(),
                    name = %write.name(),
                    write = write.verb(),
                    "Recording dead letter"
                );
                self.publisher
                    .warn(
                        &write.target,
                        REASON_INITIALIZATION_FAILED,
                        format!("lxcfs initializer {} failed: {e}", write.verb()),
                    )
                    .await;
                Err(e)
            }
        }
    }
}
