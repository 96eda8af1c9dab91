//! # Initialization
//!
//! Process startup: rustls, logging, metrics, the probe server, the New Relic
//! client, the optional dashboard sweep and the Kubernetes client.

use crate::adapter::{ManagedResource, ResourceKind};
use crate::config::{ControllerConfig, NewRelicConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::{AlertChannel, AlertPolicy, Dashboard, Label, Monitor};
use crate::newrelic::{MonitoringApi, NewRelicClient};
use crate::observability;
use crate::runtime::cleanup::sweep_owned_dashboards;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything the watch loops need
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install rustls crypto provider");
    }

    let config = ControllerConfig::from_env();
    observability::init_logging(&config.log_format)?;

    info!("Starting New Relic Operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let state = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, state).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let newrelic_config = NewRelicConfig::from_env().context("New Relic configuration")?;
    let api: Arc<dyn MonitoringApi> = Arc::new(
        NewRelicClient::new(&newrelic_config).context("Failed to build New Relic client")?,
    );

    if let Some(owner) = config.cleanup_owner.as_deref() {
        info!("Cleanup requested for dashboards owned by {}", owner);
        sweep_owned_dashboards(api.as_ref(), owner).await;
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    for kind in &config.enabled_kinds {
        log_existing_resources(&client, *kind).await;
    }

    let reconciler = Arc::new(Reconciler::new(client.clone(), api, config));
    info!("Operator initialized, starting watch loops...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait until `start_server` has bound its port
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > SERVER_STARTUP_TIMEOUT {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                SERVER_STARTUP_TIMEOUT.as_secs()
            ));
        }

        tokio::time::sleep(SERVER_POLL_INTERVAL).await;
    }
}

/// Startup summary per kind; also tells the operator early when a CRD is missing
async fn log_existing_resources(client: &Client, kind: ResourceKind) {
    let result = match kind {
        ResourceKind::Policy => count_resources::<AlertPolicy>(client).await,
        ResourceKind::Channel => count_resources::<AlertChannel>(client).await,
        ResourceKind::Dashboard => count_resources::<Dashboard>(client).await,
        ResourceKind::Monitor => count_resources::<Monitor>(client).await,
        ResourceKind::Label => count_resources::<Label>(client).await,
    };

    match result {
        Ok((total, namespaces)) => {
            info!(
                "Found {} existing {} resources across {} namespaces",
                total, kind, namespaces
            );
        }
        Err(e) => {
            error!("{} CRD is not queryable: {}. Is the CRD installed?", kind, e);
            warn!("Continuing; the {} controller will retry", kind);
        }
    }
}

async fn count_resources<R: ManagedResource>(
    client: &Client,
) -> Result<(usize, usize), kube::Error> {
    let api: Api<R> = Api::all(client.clone());
    let list = api.list(&ListParams::default()).await?;

    let mut namespaces: Vec<String> = list
        .items
        .iter()
        .filter_map(kube::ResourceExt::namespace)
        .collect();
    namespaces.sort();
    namespaces.dedup();

    Ok((list.items.len(), namespaces.len()))
}
