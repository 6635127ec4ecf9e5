//! Lifecycle of the initializer controller
//!
//! Pulls notifications from an [`EventSource`] one at a time, runs the initialization
//! pipeline on each, and hands the resulting write to the configured [`FailurePolicy`].
//! Shutdown is cooperative: once the cancellation token fires no new notification is
//! taken, and the one being processed runs to completion.

mod failure;
mod source;
mod store;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::InitializerConfig;
use crate::initializer::{self, patch::guard_resource_version, Outcome};
use crate::workload::WorkloadObject;
use crate::Result;

pub use failure::{DeadLetter, FailurePolicy, LogAndDrop, RetryWithBackoff};
pub use source::{EventSource, KubeEventSource};
pub use store::{KubeResourceStore, ResourceStore, Write, WriteBody};

#[cfg(test)]
pub use source::MockEventSource;
#[cfg(test)]
pub use store::MockResourceStore;

/// Pause before resubscribing after the event stream fails or ends
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Shared state for the event loop
///
/// Everything here is read-only after construction.
pub struct Context {
    /// Gate, annotation and mutation settings
    pub config: Arc<InitializerConfig>,
    /// Where writes are sent
    pub store: Arc<dyn ResourceStore>,
    /// What to do when a write fails
    pub failure_policy: Arc<dyn FailurePolicy>,
}

impl Context {
    /// Create a context that logs and drops failed writes
    pub fn new(config: Arc<InitializerConfig>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            config,
            store,
            failure_policy: Arc::new(LogAndDrop),
        }
    }

    /// Replace the failure policy
    pub fn with_failure_policy(mut self, failure_policy: Arc<dyn FailurePolicy>) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

/// Process one observed workload
///
/// Returns the stored object when a write was made, `None` when the workload was not
/// this controller's to handle.
#[instrument(skip(workload, ctx), fields(namespace = %workload.namespace(), name = %workload.name()))]
pub async fn handle_event(workload: &WorkloadObject, ctx: &Context) -> Result<Option<WorkloadObject>> {
    let write = match initializer::initialize(workload, &ctx.config)? {
        Outcome::Inactive => {
            debug!("No pending initializers");
            return Ok(None);
        }
        Outcome::Deferred { next } => {
            debug!(next = %next, "Another initializer is next in line");
            return Ok(None);
        }
        Outcome::PassThrough(candidate) => Write::update(workload, *candidate),
        Outcome::Patch(patch) => Write::patch(
            workload,
            guard_resource_version(patch, workload.metadata.resource_version.as_deref()),
        ),
    };

    let stored = ctx
        .failure_policy
        .submit(ctx.store.as_ref(), &write)
        .await?;
    info!(write = write.verb(), "Initialized deployment");
    Ok(Some(stored))
}

/// Run the event loop until `shutdown` is cancelled
pub async fn run(source: Arc<dyn EventSource>, ctx: Arc<Context>, shutdown: CancellationToken) {
    info!(
        initializer = %ctx.config.initializer_name,
        "Starting initializer event loop"
    );

    'subscriptions: loop {
        let mut events = source.subscribe();

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break 'subscriptions,
                next = events.next() => next,
            };

            match next {
                Some(Ok(workload)) => {
                    if let Err(e) = handle_event(&workload, &ctx).await {
                        error!(
                            namespace = %workload.namespace(),
                            name = %workload.name(),
                            error = %e,
                            "Failed to initialize deployment"
                        );
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Event stream failed; resubscribing");
                    break;
                }
                None => {
                    warn!("Event stream ended; resubscribing");
                    break;
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
        }
    }

    info!("Initializer event loop stopped");
}
