use super::{Applied, ManagedResource, ResourceKind, SyncResult};
use crate::crd::{Label, LabelSpec, SyncStatus};
use crate::newrelic::{label_key, LabelLinks, LabelRequest, MonitoringApi};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::warn;

impl Label {
    fn to_request(&self) -> LabelRequest {
        LabelRequest {
            category: self.spec.category.clone(),
            name: self.spec.name.clone().unwrap_or_else(|| self.name_any()),
            links: LabelLinks {
                applications: self.spec.applications.clone(),
                servers: self.spec.servers.clone(),
            },
        }
    }
}

#[async_trait]
impl ManagedResource for Label {
    const KIND: ResourceKind = ResourceKind::Label;

    type Spec = LabelSpec;

    fn desired(&self) -> &LabelSpec {
        &self.spec
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    fn sync_status_mut(&mut self) -> &mut SyncStatus {
        self.status.get_or_insert_with(Default::default)
    }

    /// Labels are upserted by key, so an existing label is simply taken over
    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied> {
        let request = self.to_request();
        let label = api.upsert_label(&request).await?;
        Ok(Applied::new(label.key()))
    }

    /// Upsert under the current key; a renamed label also drops the old key
    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied> {
        let request = self.to_request();
        let key = label_key(&request.category, &request.name);
        api.upsert_label(&request).await?;

        if key != id {
            match api.delete_label(id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(old_key = id, error = %e, "failed to delete renamed label");
                    return Ok(Applied::new(key)
                        .with_note(Some(format!("old label {id} not deleted: {e}"))));
                }
            }
        }
        Ok(Applied::new(key))
    }

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()> {
        api.delete_label(id).await?;
        Ok(())
    }
}
