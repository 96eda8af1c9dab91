//! # Channel Links
//!
//! Resolves the channel names an AlertPolicy references into New Relic
//! channel ids and pushes the result onto the policy.

use super::SyncResult;
use crate::newrelic::{ChannelEntity, MonitoringApi};
use tracing::warn;

/// Outcome of resolving channel names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Ids of resolved channels, in reference order
    pub ids: Vec<i64>,
    /// Names that matched no channel
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// Human readable summary of unresolved names, if any
    #[must_use]
    pub fn note(&self) -> Option<String> {
        if self.unresolved.is_empty() {
            None
        } else {
            Some(format!(
                "unresolved channels: {}",
                self.unresolved.join(", ")
            ))
        }
    }
}

/// Match requested names against remote channels by exact name
///
/// The first channel with a given name wins. Repeated names resolve once.
#[must_use]
pub fn resolve_channel_ids(requested: &[String], remote: &[ChannelEntity]) -> Resolution {
    let mut resolution = Resolution::default();
    for name in requested {
        match remote.iter().find(|c| &c.name == name) {
            Some(channel) => {
                if !resolution.ids.contains(&channel.id) {
                    resolution.ids.push(channel.id);
                }
            }
            None => {
                if !resolution.unresolved.contains(name) {
                    resolution.unresolved.push(name.clone());
                }
            }
        }
    }
    resolution
}

/// Resolve `requested` and overwrite the policy's channel association
///
/// `previous` holds the ids linked at the last sync. When both lists are
/// empty no remote call is made; otherwise the resolved set replaces the
/// association even when it is empty, so dropped or unresolvable channels
/// are unlinked. Unresolved names are logged and skipped; only listing or
/// linking failures are errors.
pub async fn link_channels(
    api: &dyn MonitoringApi,
    policy_id: i64,
    requested: &[String],
    previous: &[i64],
) -> SyncResult<Resolution> {
    if requested.is_empty() && previous.is_empty() {
        return Ok(Resolution::default());
    }

    let resolution = if requested.is_empty() {
        Resolution::default()
    } else {
        let remote = api.list_channels().await?;
        resolve_channel_ids(requested, &remote)
    };

    for name in &resolution.unresolved {
        warn!(policy_id, channel = name.as_str(), "alert channel not found in New Relic");
    }

    api.update_policy_channels(policy_id, &resolution.ids).await?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newrelic::ChannelLinks;

    fn channel(id: i64, name: &str) -> ChannelEntity {
        ChannelEntity {
            id,
            name: name.to_string(),
            channel_type: Some("slack".to_string()),
            links: ChannelLinks::default(),
        }
    }

    #[test]
    fn test_partial_resolution_keeps_reference_order() {
        let remote = vec![channel(2, "ops-email"), channel(1, "ops-slack")];
        let requested = vec![
            "ops-slack".to_string(),
            "does-not-exist".to_string(),
            "ops-email".to_string(),
        ];
        let resolution = resolve_channel_ids(&requested, &remote);
        assert_eq!(resolution.ids, vec![1, 2]);
        assert_eq!(resolution.unresolved, vec!["does-not-exist".to_string()]);
        assert_eq!(
            resolution.note().as_deref(),
            Some("unresolved channels: does-not-exist")
        );
    }

    #[test]
    fn test_exact_name_match_only() {
        let remote = vec![channel(1, "ops-slack-old")];
        let resolution = resolve_channel_ids(&["ops-slack".to_string()], &remote);
        assert!(resolution.ids.is_empty());
        assert_eq!(resolution.unresolved.len(), 1);
    }

    #[test]
    fn test_duplicates_resolve_once() {
        let remote = vec![channel(1, "a")];
        let resolution = resolve_channel_ids(&["a".to_string(), "a".to_string()], &remote);
        assert_eq!(resolution.ids, vec![1]);
        assert!(resolution.note().is_none());
    }
}
