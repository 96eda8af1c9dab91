//! Common test utilities
//!
//! In-memory stand-ins for New Relic ([`FakeApi`]) and the Kubernetes API
//! server ([`MemoryStore`]) so the reconciliation engine can be driven
//! end to end without a cluster or network.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use newrelic_operator::adapter::ManagedResource;
use newrelic_operator::controller::reconciler::{ObjectStore, ReconcilerError};
use newrelic_operator::newrelic::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: i64,
    pub policies: BTreeMap<i64, PolicyEntity>,
    pub channels: BTreeMap<i64, ChannelEntity>,
    pub dashboards: BTreeMap<i64, (DashboardEntity, Value)>,
    pub monitors: BTreeMap<String, (MonitorEntity, MonitorRequest)>,
    pub scripts: BTreeMap<String, String>,
    pub conditions: BTreeMap<i64, Vec<SyntheticsCondition>>,
    pub labels: BTreeMap<String, LabelEntity>,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Channel ids linked to a policy, ascending
    pub fn policy_channels(&self, policy_id: i64) -> Vec<i64> {
        self.channels
            .values()
            .filter(|c| c.links.policy_ids.contains(&policy_id))
            .map(|c| c.id)
            .collect()
    }
}

/// In-memory New Relic account
///
/// Every call is appended to a call log. `fail` makes an operation answer
/// with the given HTTP status until `clear_failures` is called.
#[derive(Debug, Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u16>>,
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: r#"{"error":{"title":"Not Found"}}"#.to_string(),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), status);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == operation)
            .count()
    }

    /// Calls that change remote state
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list_") && !c.starts_with("get_"))
            .collect()
    }

    fn record(&self, operation: &str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        match self.failures.lock().unwrap().get(operation) {
            Some(&status) => Err(ApiError::Status {
                status,
                body: format!("injected failure for {operation}"),
            }),
            None => Ok(()),
        }
    }

    pub fn seed_channel(&self, name: &str, channel_type: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.channels.insert(
            id,
            ChannelEntity {
                id,
                name: name.to_string(),
                channel_type: Some(channel_type.to_string()),
                links: ChannelLinks::default(),
            },
        );
        id
    }

    pub fn seed_policy(&self, name: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.policies.insert(
            id,
            PolicyEntity {
                id,
                name: name.to_string(),
                incident_preference: Some("PER_POLICY".to_string()),
            },
        );
        id
    }

    pub fn seed_dashboard(&self, title: &str, owner_email: Option<&str>) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.dashboards.insert(
            id,
            (
                DashboardEntity {
                    id,
                    title: Some(title.to_string()),
                    owner_email: owner_email.map(ToString::to_string),
                },
                serde_json::json!({ "title": title }),
            ),
        );
        id
    }

    /// Remove an object behind the operator's back
    pub fn forget_dashboard(&self, id: i64) {
        self.state.lock().unwrap().dashboards.remove(&id);
    }

    pub fn dashboard_titles(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .dashboards
            .values()
            .filter_map(|(d, _)| d.title.clone())
            .collect()
    }
}

#[async_trait]
impl MonitoringApi for FakeApi {
    async fn list_policies(&self, name: Option<&str>) -> ApiResult<Vec<PolicyEntity>> {
        self.record("list_policies")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .policies
            .values()
            .filter(|p| name.map_or(true, |n| p.name.contains(n)))
            .cloned()
            .collect())
    }

    async fn create_policy(&self, policy: &PolicyRequest) -> ApiResult<PolicyEntity> {
        self.record("create_policy")?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let entity = PolicyEntity {
            id,
            name: policy.name.clone(),
            incident_preference: Some(
                serde_json::to_value(policy.incident_preference)
                    .ok()
                    .and_then(|v| v.as_str().map(ToString::to_string))
                    .unwrap_or_default(),
            ),
        };
        state.policies.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update_policy(&self, id: i64, policy: &PolicyRequest) -> ApiResult<PolicyEntity> {
        self.record("update_policy")?;
        let mut state = self.state.lock().unwrap();
        let entity = state.policies.get_mut(&id).ok_or_else(not_found)?;
        entity.name = policy.name.clone();
        Ok(entity.clone())
    }

    async fn delete_policy(&self, id: i64) -> ApiResult<()> {
        self.record("delete_policy")?;
        let mut state = self.state.lock().unwrap();
        state.policies.remove(&id).map(|_| ()).ok_or_else(not_found)
    }

    async fn update_policy_channels(&self, policy_id: i64, channel_ids: &[i64]) -> ApiResult<()> {
        self.record("update_policy_channels")?;
        let mut state = self.state.lock().unwrap();
        if !state.policies.contains_key(&policy_id) {
            return Err(not_found());
        }
        for channel in state.channels.values_mut() {
            channel.links.policy_ids.retain(|p| *p != policy_id);
            if channel_ids.contains(&channel.id) {
                channel.links.policy_ids.push(policy_id);
            }
        }
        Ok(())
    }

    async fn list_channels(&self) -> ApiResult<Vec<ChannelEntity>> {
        self.record("list_channels")?;
        Ok(self.state.lock().unwrap().channels.values().cloned().collect())
    }

    async fn create_channel(&self, channel: &ChannelRequest) -> ApiResult<ChannelEntity> {
        self.record("create_channel")?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let entity = ChannelEntity {
            id,
            name: channel.name.clone(),
            channel_type: Some(channel.channel_type.clone()),
            links: ChannelLinks::default(),
        };
        state.channels.insert(id, entity.clone());
        Ok(entity)
    }

    async fn delete_channel(&self, id: i64) -> ApiResult<()> {
        self.record("delete_channel")?;
        let mut state = self.state.lock().unwrap();
        state.channels.remove(&id).map(|_| ()).ok_or_else(not_found)
    }

    async fn list_dashboards(&self) -> ApiResult<Vec<DashboardEntity>> {
        self.record("list_dashboards")?;
        let state = self.state.lock().unwrap();
        Ok(state.dashboards.values().map(|(d, _)| d.clone()).collect())
    }

    async fn create_dashboard(&self, dashboard: &Value) -> ApiResult<DashboardEntity> {
        self.record("create_dashboard")?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let entity = DashboardEntity {
            id,
            title: dashboard
                .get("title")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            owner_email: Some("operator@example.com".to_string()),
        };
        state.dashboards.insert(id, (entity.clone(), dashboard.clone()));
        Ok(entity)
    }

    async fn update_dashboard(&self, id: i64, dashboard: &Value) -> ApiResult<DashboardEntity> {
        self.record("update_dashboard")?;
        let mut state = self.state.lock().unwrap();
        let (entity, document) = state.dashboards.get_mut(&id).ok_or_else(not_found)?;
        entity.title = dashboard
            .get("title")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        *document = dashboard.clone();
        Ok(entity.clone())
    }

    async fn delete_dashboard(&self, id: i64) -> ApiResult<()> {
        self.record("delete_dashboard")?;
        let mut state = self.state.lock().unwrap();
        state.dashboards.remove(&id).map(|_| ()).ok_or_else(not_found)
    }

    async fn list_monitors(&self) -> ApiResult<Vec<MonitorEntity>> {
        self.record("list_monitors")?;
        let state = self.state.lock().unwrap();
        Ok(state.monitors.values().map(|(m, _)| m.clone()).collect())
    }

    async fn get_monitor(&self, id: &str) -> ApiResult<MonitorEntity> {
        self.record("get_monitor")?;
        let state = self.state.lock().unwrap();
        state
            .monitors
            .get(id)
            .map(|(m, _)| m.clone())
            .ok_or_else(not_found)
    }

    async fn create_monitor(&self, monitor: &MonitorRequest) -> ApiResult<String> {
        self.record("create_monitor")?;
        let mut state = self.state.lock().unwrap();
        let id = format!("monitor-{}", state.next_id());
        let entity = MonitorEntity {
            id: id.clone(),
            name: monitor.name.clone(),
            monitor_type: Some(monitor.monitor_type.clone()),
            status: Some(monitor.status.clone()),
        };
        state.monitors.insert(id.clone(), (entity, monitor.clone()));
        Ok(id)
    }

    async fn update_monitor(&self, id: &str, monitor: &MonitorRequest) -> ApiResult<()> {
        self.record("update_monitor")?;
        let mut state = self.state.lock().unwrap();
        let (entity, request) = state.monitors.get_mut(id).ok_or_else(not_found)?;
        entity.status = Some(monitor.status.clone());
        *request = monitor.clone();
        Ok(())
    }

    async fn delete_monitor(&self, id: &str) -> ApiResult<()> {
        self.record("delete_monitor")?;
        let mut state = self.state.lock().unwrap();
        state.monitors.remove(id).map(|_| ()).ok_or_else(not_found)
    }

    async fn update_monitor_script(&self, id: &str, script_base64: &str) -> ApiResult<()> {
        self.record("update_monitor_script")?;
        let mut state = self.state.lock().unwrap();
        if !state.monitors.contains_key(id) {
            return Err(not_found());
        }
        state.scripts.insert(id.to_string(), script_base64.to_string());
        Ok(())
    }

    async fn list_synthetics_conditions(
        &self,
        policy_id: i64,
    ) -> ApiResult<Vec<SyntheticsCondition>> {
        self.record("list_synthetics_conditions")?;
        let state = self.state.lock().unwrap();
        Ok(state.conditions.get(&policy_id).cloned().unwrap_or_default())
    }

    async fn create_synthetics_condition(
        &self,
        policy_id: i64,
        condition: &SyntheticsCondition,
    ) -> ApiResult<SyntheticsCondition> {
        self.record("create_synthetics_condition")?;
        let mut state = self.state.lock().unwrap();
        let mut created = condition.clone();
        created.id = Some(state.next_id());
        state
            .conditions
            .entry(policy_id)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn list_labels(&self) -> ApiResult<Vec<LabelEntity>> {
        self.record("list_labels")?;
        Ok(self.state.lock().unwrap().labels.values().cloned().collect())
    }

    async fn upsert_label(&self, label: &LabelRequest) -> ApiResult<LabelEntity> {
        self.record("upsert_label")?;
        let key = label_key(&label.category, &label.name);
        let entity = LabelEntity {
            key: Some(key.clone()),
            category: label.category.clone(),
            name: label.name.clone(),
            links: label.links.clone(),
        };
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(key, entity.clone());
        Ok(entity)
    }

    async fn delete_label(&self, key: &str) -> ApiResult<()> {
        self.record("delete_label")?;
        let mut state = self.state.lock().unwrap();
        state.labels.remove(key).map(|_| ()).ok_or_else(not_found)
    }
}

/// Object store that records what would have been written to the API server
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub status_writes: Mutex<Vec<Value>>,
    pub finalizer_writes: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_write_count(&self) -> usize {
        self.status_writes.lock().unwrap().len()
    }

    pub fn last_status(&self) -> Option<Value> {
        self.status_writes.lock().unwrap().last().cloned()
    }

    pub fn last_finalizers(&self) -> Option<Vec<String>> {
        self.finalizer_writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl<R: ManagedResource> ObjectStore<R> for MemoryStore {
    async fn save_status(&self, resource: &R) -> Result<(), ReconcilerError> {
        let status = serde_json::to_value(resource)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);
        self.status_writes.lock().unwrap().push(status);
        Ok(())
    }

    async fn save_finalizers(&self, resource: &R) -> Result<(), ReconcilerError> {
        self.finalizer_writes
            .lock()
            .unwrap()
            .push(resource.finalizers().to_vec());
        Ok(())
    }
}

/// Give `resource` a namespace, as the API server would
pub fn namespaced<R: ManagedResource>(mut resource: R) -> R {
    resource.meta_mut().namespace = Some("default".to_string());
    resource
}

/// Mark `resource` for deletion, as `kubectl delete` would
pub fn mark_deleted<R: ManagedResource>(resource: &mut R) {
    let timestamp = serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z"))
        .expect("valid RFC3339 timestamp");
    resource.meta_mut().deletion_timestamp = Some(timestamp);
}
