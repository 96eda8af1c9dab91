use super::{numeric_id, Applied, ManagedResource, ResourceKind, SyncError, SyncResult};
use crate::crd::{AlertChannel, AlertChannelSpec, SyncStatus};
use crate::newrelic::{ChannelEntity, ChannelRequest, MonitoringApi};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Configuration keys New Relic requires per channel type
fn required_keys(channel_type: &str) -> Option<&'static [&'static str]> {
    match channel_type {
        "slack" => Some(&["url", "channel"]),
        "email" => Some(&["recipients"]),
        "webhook" => Some(&["base_url"]),
        "pagerduty" => Some(&["service_key"]),
        "opsgenie" => Some(&["api_key"]),
        "victorops" => Some(&["key", "route_key"]),
        "user" => Some(&["user_id"]),
        _ => None,
    }
}

/// Reject unknown channel types and configurations missing required keys
pub fn validate_channel(spec: &AlertChannelSpec) -> SyncResult<()> {
    let channel_type = spec.channel_type.trim().to_lowercase();
    let required = required_keys(&channel_type).ok_or_else(|| {
        SyncError::validation(format!("unsupported channel type '{}'", spec.channel_type))
    })?;

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| {
            spec.configuration
                .get(*key)
                .map_or(true, |v| v.trim().is_empty())
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SyncError::validation(format!(
            "{channel_type} channel is missing configuration: {}",
            missing.join(", ")
        )))
    }
}

impl AlertChannel {
    fn to_request(&self) -> ChannelRequest {
        ChannelRequest {
            name: self.name_any(),
            channel_type: self.spec.channel_type.trim().to_lowercase(),
            configuration: self.spec.configuration.clone(),
        }
    }
}

/// Channel ids currently linked to each policy, with `old` swapped for `new`
fn relinked_policies(
    channels: &[ChannelEntity],
    old: i64,
    new: i64,
) -> BTreeMap<i64, Vec<i64>> {
    let Some(old_channel) = channels.iter().find(|c| c.id == old) else {
        return BTreeMap::new();
    };

    old_channel
        .links
        .policy_ids
        .iter()
        .map(|&policy_id| {
            let mut ids: Vec<i64> = channels
                .iter()
                .filter(|c| c.id != old && c.id != new && c.links.policy_ids.contains(&policy_id))
                .map(|c| c.id)
                .collect();
            ids.push(new);
            (policy_id, ids)
        })
        .collect()
}

#[async_trait]
impl ManagedResource for AlertChannel {
    const KIND: ResourceKind = ResourceKind::Channel;

    type Spec = AlertChannelSpec;

    fn desired(&self) -> &AlertChannelSpec {
        &self.spec
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    fn sync_status_mut(&mut self) -> &mut SyncStatus {
        self.status.get_or_insert_with(Default::default)
    }

    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied> {
        validate_channel(&self.spec)?;
        let request = self.to_request();

        let existing = api
            .list_channels()
            .await?
            .into_iter()
            .find(|c| {
                c.name == request.name
                    && c.channel_type.as_deref() == Some(request.channel_type.as_str())
            });
        if let Some(found) = existing {
            info!(channel_id = found.id, name = request.name.as_str(), "adopting existing alert channel");
            return Ok(Applied::new(found.id.to_string())
                .with_note(Some("adopted existing channel".to_string())));
        }

        let channel = api.create_channel(&request).await?;
        Ok(Applied::new(channel.id.to_string()))
    }

    /// Channels cannot be edited remotely: create a replacement, move the
    /// policy links over, then delete the old channel
    ///
    /// Once the replacement exists, relink and delete failures only end up
    /// in the note; the new id is what status must point at.
    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied> {
        validate_channel(&self.spec)?;
        let old_id = numeric_id(id)?;

        let channels = api.list_channels().await?;
        if !channels.iter().any(|c| c.id == old_id) {
            return Err(SyncError {
                class: super::ErrorClass::RemoteNotFound,
                message: format!("alert channel {old_id} not found"),
            });
        }

        let replacement = api.create_channel(&self.to_request()).await?;
        let mut problems = Vec::new();

        for (policy_id, ids) in relinked_policies(&channels, old_id, replacement.id) {
            if let Err(e) = api.update_policy_channels(policy_id, &ids).await {
                warn!(policy_id, error = %e, "failed to relink policy to replacement channel");
                problems.push(format!("relink policy {policy_id}: {e}"));
            }
        }

        match api.delete_channel(old_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(channel_id = old_id, error = %e, "failed to delete replaced channel");
                problems.push(format!("delete old channel {old_id}: {e}"));
            }
        }

        let note = if problems.is_empty() {
            Some(format!("replaced channel {old_id}"))
        } else {
            Some(format!("replaced channel {old_id} with problems: {}", problems.join("; ")))
        };
        Ok(Applied::new(replacement.id.to_string()).with_note(note))
    }

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()> {
        api.delete_channel(numeric_id(id)?).await?;
        Ok(())
    }
}
