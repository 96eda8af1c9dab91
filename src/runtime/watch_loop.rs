//! # Watch Loop
//!
//! One `kube-runtime` controller per enabled kind, all running concurrently
//! until a shutdown signal arrives.

use crate::adapter::{ManagedResource, ResourceKind};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{AlertChannel, AlertPolicy, Dashboard, Label, Monitor};
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::api::Api;
use kube::Client;
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

/// Run every enabled controller until shutdown
pub async fn run_watch_loops(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let kinds = reconciler.config.enabled_kinds.clone();
    if kinds.is_empty() {
        anyhow::bail!("no resource kinds enabled");
    }

    // Readiness drops and every restart loop stops once a shutdown signal arrives
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, waiting for in-flight reconciliations to complete...");
        server_state.set_ready(false);
        shutdown_tx.send_replace(true);
    });

    let loops: Vec<BoxFuture<'static, ()>> = kinds
        .iter()
        .map(|kind| {
            let client = client.clone();
            let reconciler = Arc::clone(&reconciler);
            let shutdown = shutdown_rx.clone();
            match kind {
                ResourceKind::Policy => run_kind::<AlertPolicy>(client, reconciler, shutdown).boxed(),
                ResourceKind::Channel => {
                    run_kind::<AlertChannel>(client, reconciler, shutdown).boxed()
                }
                ResourceKind::Dashboard => run_kind::<Dashboard>(client, reconciler, shutdown).boxed(),
                ResourceKind::Monitor => run_kind::<Monitor>(client, reconciler, shutdown).boxed(),
                ResourceKind::Label => run_kind::<Label>(client, reconciler, shutdown).boxed(),
            }
        })
        .collect();

    info!(
        "Starting controllers for: {}",
        kinds
            .iter()
            .map(ResourceKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    futures::future::join_all(loops).await;

    info!("Controllers stopped gracefully");
    Ok(())
}

/// Resolves on SIGTERM or ctrl-c
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Sleep for `delay` unless shutdown is requested first; true means shut down
pub(crate) async fn wait_restart_or_shutdown(
    shutdown: &mut watch::Receiver<bool>,
    delay: Duration,
) -> bool {
    tokio::select! {
        result = shutdown.wait_for(|stop| *stop) => result.is_ok(),
        () = tokio::time::sleep(delay) => false,
    }
}

/// Watch one kind, restarting the controller if its stream ends before shutdown
async fn run_kind<R: ManagedResource>(
    client: Client,
    reconciler: Arc<Reconciler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = R::KIND.as_str();
    let restart_delay = reconciler.config.watch_restart_delay();
    let concurrency = reconciler.config.max_concurrent_reconciliations;

    loop {
        info!("Starting {} controller (concurrency {})", kind, concurrency);

        let api: Api<R> = Api::all(client.clone());
        Controller::new(api, watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(
                reconcile::<R>,
                handle_reconciliation_error::<R>,
                Arc::clone(&reconciler),
            )
            .for_each(move |result| async move {
                match result {
                    Ok((object, action)) => {
                        debug!(object = %object, action = ?action, "watch.event.reconciled");
                    }
                    Err(e) => {
                        handle_watch_stream_error(kind, &format!("{e:?}"), restart_delay).await;
                    }
                }
            })
            .instrument(tracing::info_span!("controller.watch", resource.kind = kind))
            .await;

        if *shutdown.borrow() {
            info!("{} controller stopped", kind);
            break;
        }

        warn!(
            "{} watch stream ended, restarting in {}s...",
            kind,
            restart_delay.as_secs()
        );
        if wait_restart_or_shutdown(&mut shutdown, restart_delay).await {
            info!("{} controller stopped", kind);
            break;
        }
    }
}
