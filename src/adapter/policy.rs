use super::links::link_channels;
use super::{numeric_id, Applied, ManagedResource, ResourceKind, SyncResult};
use crate::crd::{AlertPolicy, AlertPolicySpec, SyncStatus};
use crate::newrelic::{MonitoringApi, PolicyRequest};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

impl AlertPolicy {
    fn to_request(&self) -> PolicyRequest {
        PolicyRequest {
            name: self.name_any(),
            incident_preference: self.spec.incident_preference.unwrap_or_default(),
        }
    }

    /// Link channels and record the outcome in status
    async fn sync_links(&mut self, api: &dyn MonitoringApi, policy_id: i64) -> SyncResult<Option<String>> {
        let previous = self
            .status
            .as_ref()
            .map(|s| s.linked_channels.clone())
            .unwrap_or_default();
        let resolution = link_channels(api, policy_id, &self.spec.channels, &previous).await?;
        let note = resolution.note();
        let status = self.status.get_or_insert_with(Default::default);
        status.linked_channels = resolution.ids;
        status.unresolved_channels = resolution.unresolved;
        Ok(note)
    }
}

#[async_trait]
impl ManagedResource for AlertPolicy {
    const KIND: ResourceKind = ResourceKind::Policy;

    type Spec = AlertPolicySpec;

    fn desired(&self) -> &AlertPolicySpec {
        &self.spec
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref().map(|s| &s.sync)
    }

    fn sync_status_mut(&mut self) -> &mut SyncStatus {
        &mut self.status.get_or_insert_with(Default::default).sync
    }

    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied> {
        let request = self.to_request();

        let existing = api
            .list_policies(Some(&request.name))
            .await?
            .into_iter()
            .find(|p| p.name == request.name);

        let (policy, adopted) = match existing {
            Some(found) => {
                info!(policy_id = found.id, name = request.name.as_str(), "adopting existing alert policy");
                (api.update_policy(found.id, &request).await?, true)
            }
            None => (api.create_policy(&request).await?, false),
        };

        let links_note = self.sync_links(api, policy.id).await?;
        let note = match (adopted, links_note) {
            (true, Some(links)) => Some(format!("adopted existing policy; {links}")),
            (true, None) => Some("adopted existing policy".to_string()),
            (false, links) => links,
        };
        Ok(Applied::new(policy.id.to_string()).with_note(note))
    }

    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied> {
        let policy_id = numeric_id(id)?;
        let policy = api.update_policy(policy_id, &self.to_request()).await?;
        let note = self.sync_links(api, policy.id).await?;
        Ok(Applied::new(policy.id.to_string()).with_note(note))
    }

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()> {
        api.delete_policy(numeric_id(id)?).await?;
        Ok(())
    }
}
