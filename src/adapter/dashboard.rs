use super::{numeric_id, Applied, ManagedResource, ResourceKind, SyncError, SyncResult};
use crate::crd::{Dashboard, DashboardSpec, SyncStatus};
use crate::newrelic::{DashboardEntity, MonitoringApi};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Parse `spec.data` into the bare dashboard document
///
/// Accepts either `{"dashboard": {...}}` or the document itself; anything
/// that is not a JSON object is a validation error.
pub fn parse_dashboard(data: &str) -> SyncResult<Value> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| SyncError::validation(format!("dashboard data is not valid JSON: {e}")))?;

    let document = match value {
        Value::Object(mut map) if map.get("dashboard").is_some_and(Value::is_object) => map
            .remove("dashboard")
            .unwrap_or(Value::Null),
        other => other,
    };

    if document.is_object() {
        Ok(document)
    } else {
        Err(SyncError::validation("dashboard data must be a JSON object"))
    }
}

fn title_of(document: &Value) -> Option<String> {
    document
        .get("title")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

impl Dashboard {
    fn record_title(&mut self, entity: &DashboardEntity, document: &Value) {
        let title = entity.title.clone().or_else(|| title_of(document));
        self.status.get_or_insert_with(Default::default).title = title;
    }
}

#[async_trait]
impl ManagedResource for Dashboard {
    const KIND: ResourceKind = ResourceKind::Dashboard;

    type Spec = DashboardSpec;

    fn desired(&self) -> &DashboardSpec {
        &self.spec
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref().map(|s| &s.sync)
    }

    fn sync_status_mut(&mut self) -> &mut SyncStatus {
        &mut self.status.get_or_insert_with(Default::default).sync
    }

    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied> {
        let document = parse_dashboard(&self.spec.data)?;

        let existing = match title_of(&document) {
            Some(title) => api
                .list_dashboards()
                .await?
                .into_iter()
                .find(|d| d.title.as_deref() == Some(title.as_str())),
            None => None,
        };

        let (entity, note) = match existing {
            Some(found) => {
                info!(dashboard_id = found.id, "adopting existing dashboard");
                (
                    api.update_dashboard(found.id, &document).await?,
                    Some("adopted existing dashboard".to_string()),
                )
            }
            None => (api.create_dashboard(&document).await?, None),
        };

        self.record_title(&entity, &document);
        Ok(Applied::new(entity.id.to_string()).with_note(note))
    }

    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied> {
        let document = parse_dashboard(&self.spec.data)?;
        let entity = api.update_dashboard(numeric_id(id)?, &document).await?;
        self.record_title(&entity, &document);
        Ok(Applied::new(entity.id.to_string()))
    }

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()> {
        api.delete_dashboard(numeric_id(id)?).await?;
        Ok(())
    }
}
