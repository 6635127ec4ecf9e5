//! lxcfs initializer - injects lxcfs /proc mounts into newly created Deployments

use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

use lxcfs_initializer::config::InitializerConfig;
use lxcfs_initializer::controller::{
    self, Context, DeadLetter, FailurePolicy, KubeEventSource, KubeResourceStore, LogAndDrop,
    RetryWithBackoff,
};
use lxcfs_initializer::events::KubeEventPublisher;
use lxcfs_initializer::policy::MutationPolicy;
use lxcfs_initializer::retry::BackoffConfig;
use lxcfs_initializer::telemetry::{init_telemetry, LogFormat};
use lxcfs_initializer::{CONTROLLER_NAME, DEFAULT_ANNOTATION, DEFAULT_INITIALIZER_NAME};

/// Kubernetes initializer that mounts lxcfs-virtualized /proc files into Deployments
#[derive(Parser, Debug)]
#[command(name = "lxcfs-initializer", version, about, long_about = None)]
struct Cli {
    /// Initializer name this controller removes from `metadata.initializers`
    #[arg(long, env = "INITIALIZER_NAME", default_value = DEFAULT_INITIALIZER_NAME)]
    initializer_name: String,

    /// Annotation that opts a Deployment into lxcfs injection
    #[arg(long, env = "INITIALIZER_ANNOTATION", default_value = DEFAULT_ANNOTATION)]
    annotation: String,

    /// Only inject into Deployments carrying the annotation
    #[arg(
        long,
        env = "REQUIRE_ANNOTATION",
        default_value_t = true,
        action = ArgAction::Set
    )]
    require_annotation: bool,

    /// Restrict the watch to one namespace (default: all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// What to do when writing a Deployment back fails
    #[arg(long, env = "FAILURE_POLICY", value_enum, default_value_t = FailurePolicyKind::Drop)]
    failure_policy: FailurePolicyKind,

    /// Attempts per write under the retry failure policy
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value_t = 5)]
    retry_max_attempts: u32,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FailurePolicyKind {
    /// Log the failure and move on
    Drop,
    /// Retry with exponential backoff
    Retry,
    /// Record a Warning event on the Deployment
    DeadLetter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(cli.log_format)?;

    info!("Starting the Kubernetes initializer");
    info!(initializer = %cli.initializer_name, "Initializer name set");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {e}"))?;

    let config = InitializerConfig::new(
        cli.initializer_name,
        cli.annotation,
        cli.require_annotation,
        MutationPolicy::lxcfs(),
    )?;

    let failure_policy: Arc<dyn FailurePolicy> = match cli.failure_policy {
        FailurePolicyKind::Drop => Arc::new(LogAndDrop),
        FailurePolicyKind::Retry => Arc::new(RetryWithBackoff::new(
            BackoffConfig::with_max_attempts(cli.retry_max_attempts),
        )),
        FailurePolicyKind::DeadLetter => Arc::new(DeadLetter::new(Arc::new(
            KubeEventPublisher::new(client.clone(), CONTROLLER_NAME),
        ))),
    };

    let ctx = Context::new(
        Arc::new(config),
        Arc::new(KubeResourceStore::new(client.clone())),
    )
    .with_failure_policy(failure_policy);
    let source = KubeEventSource::new(client, cli.namespace);

    let shutdown = CancellationToken::new();
    let event_loop = tokio::spawn(controller::run(
        Arc::new(source),
        Arc::new(ctx),
        shutdown.clone(),
    ));

    wait_for_signal().await?;
    info!("Shutdown signal received, shutting down...");
    shutdown.cancel();
    event_loop.await?;

    Ok(())
}

async fn wait_for_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
