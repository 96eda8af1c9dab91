//! # Startup Cleanup
//!
//! One-shot sweep of dashboards owned by a given account, enabled through
//! `NEW_RELIC_OPERATOR_CLEANUP`. Used to clear out dashboards left behind by
//! test clusters. Nothing here is fatal.

use crate::newrelic::MonitoringApi;
use tracing::{error, info, warn, Instrument};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Delete every remote dashboard whose owner email is exactly `owner`
pub async fn sweep_owned_dashboards(api: &dyn MonitoringApi, owner: &str) -> CleanupReport {
    let span = tracing::info_span!("controller.startup.cleanup", owner = owner);
    sweep(api, owner).instrument(span).await
}

async fn sweep(api: &dyn MonitoringApi, owner: &str) -> CleanupReport {
    let mut report = CleanupReport::default();
    let dashboards = match api.list_dashboards().await {
        Ok(dashboards) => dashboards,
        Err(e) => {
            error!("Dashboard cleanup skipped, listing failed: {}", e);
            return report;
        }
    };

    let owned: Vec<_> = dashboards
        .into_iter()
        .filter(|d| {
            d.owner_email
                .as_deref()
                .is_some_and(|email| email == owner)
        })
        .collect();
    info!("Found {} dashboards owned by {}", owned.len(), owner);

    for dashboard in owned {
        match api.delete_dashboard(dashboard.id).await {
            Ok(()) => report.deleted += 1,
            Err(e) if e.is_not_found() => report.deleted += 1,
            Err(e) => {
                warn!(dashboard.id = dashboard.id, "Failed to delete dashboard: {}", e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Dashboard cleanup finished: {} deleted, {} failed",
        report.deleted, report.failed
    );
    report
}
