use super::{Applied, ManagedResource, ResourceKind, SyncError, SyncResult};
use crate::constants::{
    DEFAULT_MONITOR_FREQUENCY, DEFAULT_MONITOR_LOCATION, DEFAULT_MONITOR_TYPE,
    MONITOR_CONDITION_NAME,
};
use crate::crd::{Monitor, MonitorCondition, MonitorSpec, SyncStatus};
use crate::newrelic::{ApiError, MonitorRequest, MonitorType, MonitoringApi, SyntheticsCondition};
use async_trait::async_trait;
use base64::Engine;
use kube::ResourceExt;
use tracing::{debug, info};

impl Monitor {
    /// Build the Synthetics request, filling in defaults for unset fields
    ///
    /// `remote_status` replaces the desired status when the monitor's
    /// status is managed in New Relic (`manageUpdates`).
    pub fn to_remote_request(&self, remote_status: Option<String>) -> SyncResult<MonitorRequest> {
        let spec = &self.spec;
        let (monitor_type, kind) = match spec.monitor_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => (
                raw.to_string(),
                raw.parse::<MonitorType>().map_err(SyncError::validation)?,
            ),
            _ => (DEFAULT_MONITOR_TYPE.to_string(), MonitorType::Simple),
        };

        let locations = match &spec.locations {
            Some(locations) if !locations.is_empty() => locations.clone(),
            _ => vec![DEFAULT_MONITOR_LOCATION.to_string()],
        };

        let status = remote_status
            .unwrap_or_else(|| spec.status.unwrap_or_default().as_str().to_string());

        Ok(MonitorRequest {
            name: self.name_any(),
            monitor_type,
            kind,
            frequency: spec.frequency.unwrap_or(DEFAULT_MONITOR_FREQUENCY),
            uri: spec.uri.clone(),
            locations,
            status,
            sla_threshold: spec.sla_threshold,
            options: spec.options.clone(),
        })
    }

    /// Upload the script and attach alert conditions once the monitor exists
    async fn sync_extras(
        &mut self,
        api: &dyn MonitoringApi,
        monitor_id: &str,
        monitor_type: MonitorType,
    ) -> SyncResult<()> {
        if let Some(script) = self.spec.script.as_ref().and_then(|s| s.script_text.as_deref()) {
            if monitor_type.is_scripted() {
                let encoded = base64::engine::general_purpose::STANDARD.encode(script);
                api.update_monitor_script(monitor_id, &encoded)
                    .await
                    .map_err(dependent)?;
            } else {
                debug!(monitor_id, "ignoring script for non-scripted monitor");
            }
        }

        let mut policies = Vec::with_capacity(self.spec.conditions.len());
        for condition in &self.spec.conditions {
            policies.push(ensure_condition(api, monitor_id, condition).await?);
        }
        self.status.get_or_insert_with(Default::default).condition_policies = policies;
        Ok(())
    }
}

/// 404s on a monitor's script or conditions never mean the monitor vanished
fn dependent(err: ApiError) -> SyncError {
    if err.is_not_found() {
        SyncError::transient(err.to_string())
    } else {
        err.into()
    }
}

/// Make sure the named policy holds a condition for this monitor; returns the policy id
async fn ensure_condition(
    api: &dyn MonitoringApi,
    monitor_id: &str,
    condition: &MonitorCondition,
) -> SyncResult<i64> {
    let matches: Vec<_> = api
        .list_policies(Some(&condition.policy_name))
        .await
        .map_err(dependent)?
        .into_iter()
        .filter(|p| p.name == condition.policy_name)
        .collect();

    let policy = match matches.as_slice() {
        [policy] => policy,
        [] => {
            return Err(SyncError::validation(format!(
                "no alert policy named '{}'",
                condition.policy_name
            )))
        }
        _ => {
            return Err(SyncError::validation(format!(
                "{} alert policies are named '{}'",
                matches.len(),
                condition.policy_name
            )))
        }
    };

    let exists = api
        .list_synthetics_conditions(policy.id)
        .await
        .map_err(dependent)?
        .iter()
        .any(|c| c.monitor_id == monitor_id);
    if !exists {
        api.create_synthetics_condition(
            policy.id,
            &SyntheticsCondition {
                id: None,
                name: MONITOR_CONDITION_NAME.to_string(),
                monitor_id: monitor_id.to_string(),
                runbook_url: condition.runbook_url.clone(),
                enabled: true,
            },
        )
        .await
        .map_err(dependent)?;
        info!(monitor_id, policy_id = policy.id, "created synthetics alert condition");
    }
    Ok(policy.id)
}

#[async_trait]
impl ManagedResource for Monitor {
    const KIND: ResourceKind = ResourceKind::Monitor;

    type Spec = MonitorSpec;

    fn desired(&self) -> &MonitorSpec {
        &self.spec
    }

    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref().map(|s| &s.sync)
    }

    fn sync_status_mut(&mut self) -> &mut SyncStatus {
        &mut self.status.get_or_insert_with(Default::default).sync
    }

    async fn remote_create(&mut self, api: &dyn MonitoringApi) -> SyncResult<Applied> {
        let request = self.to_remote_request(None)?;

        let existing = api
            .list_monitors()
            .await?
            .into_iter()
            .find(|m| m.name == request.name);

        let (id, note) = match existing {
            Some(found) => {
                info!(monitor_id = found.id.as_str(), "adopting existing monitor");
                let request = if self.spec.manage_updates.unwrap_or(false) {
                    self.to_remote_request(found.status.clone())?
                } else {
                    request.clone()
                };
                api.update_monitor(&found.id, &request).await?;
                (found.id, Some("adopted existing monitor".to_string()))
            }
            None => (api.create_monitor(&request).await?, None),
        };

        self.sync_extras(api, &id, request.kind).await?;
        Ok(Applied::new(id).with_note(note))
    }

    async fn remote_update(&mut self, api: &dyn MonitoringApi, id: &str) -> SyncResult<Applied> {
        let remote_status = if self.spec.manage_updates.unwrap_or(false) {
            api.get_monitor(id).await?.status
        } else {
            None
        };
        let request = self.to_remote_request(remote_status)?;
        api.update_monitor(id, &request).await?;
        self.sync_extras(api, id, request.kind).await?;
        Ok(Applied::new(id))
    }

    async fn remote_delete(&self, api: &dyn MonitoringApi, id: &str) -> SyncResult<()> {
        api.delete_monitor(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ErrorClass;
    use crate::crd::MonitorState;

    fn monitor(spec: MonitorSpec) -> Monitor {
        let mut monitor = Monitor::new("storefront-ping", spec);
        monitor.metadata.namespace = Some("default".to_string());
        monitor
    }

    #[test]
    fn test_defaults_applied() {
        let request = monitor(MonitorSpec::default()).to_remote_request(None).unwrap();
        assert_eq!(request.name, "storefront-ping");
        assert_eq!(request.monitor_type, "simple");
        assert_eq!(request.kind, MonitorType::Simple);
        assert_eq!(request.frequency, 10);
        assert_eq!(request.locations, vec!["AWS_US_WEST_1".to_string()]);
        assert_eq!(request.status, "enabled");
    }

    #[test]
    fn test_lowercase_simple_type_accepted() {
        let request = monitor(MonitorSpec {
            monitor_type: Some("simple".to_string()),
            ..Default::default()
        })
        .to_remote_request(None)
        .unwrap();
        assert_eq!(request.kind, MonitorType::Simple);
    }

    #[test]
    fn test_default_type_on_the_wire_is_lowercase_simple() {
        let request = monitor(MonitorSpec::default()).to_remote_request(None).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "simple");
        assert_eq!(json["frequency"], 10);
        assert_eq!(json["locations"], serde_json::json!(["AWS_US_WEST_1"]));
        assert_eq!(json["status"], "enabled");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_explicit_type_is_sent_as_written() {
        let request = monitor(MonitorSpec {
            monitor_type: Some(" SCRIPT_API ".to_string()),
            ..Default::default()
        })
        .to_remote_request(None)
        .unwrap();
        assert_eq!(request.kind, MonitorType::ScriptApi);
        assert_eq!(serde_json::to_value(&request).unwrap()["type"], "SCRIPT_API");
    }

    #[test]
    fn test_explicit_values_and_remote_status() {
        let m = monitor(MonitorSpec {
            monitor_type: Some("SCRIPT_API".to_string()),
            frequency: Some(5),
            locations: Some(vec!["AWS_EU_WEST_1".to_string()]),
            status: Some(MonitorState::Disabled),
            ..Default::default()
        });
        let request = m.to_remote_request(None).unwrap();
        assert_eq!(request.frequency, 5);
        assert_eq!(request.status, "disabled");
        assert_eq!(request.locations, vec!["AWS_EU_WEST_1".to_string()]);

        let request = m.to_remote_request(Some("MUTED".to_string())).unwrap();
        assert_eq!(request.status, "MUTED");
    }

    #[test]
    fn test_unknown_type_is_validation_error() {
        let err = monitor(MonitorSpec {
            monitor_type: Some("smoke-signal".to_string()),
            ..Default::default()
        })
        .to_remote_request(None)
        .unwrap_err();
        assert_eq!(err.class, ErrorClass::Validation);
    }
}
