//! # New Relic
//!
//! The remote monitoring API, expressed as the [`MonitoringApi`] trait.
//!
//! - `client`: REST v2 / Synthetics v3 implementation over `reqwest`
//! - `error`: [`ApiError`] for everything that can go wrong on the wire
//! - `types`: request and response payloads
//!
//! Adapters only ever see `Arc<dyn MonitoringApi>`, so tests can swap in an
//! in-memory fake.

mod client;
mod error;
mod types;

pub use client::NewRelicClient;
pub use error::{ApiError, ApiResult};
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

/// Operations against New Relic used by the resource adapters
///
/// Policy, channel and dashboard ids are New Relic's numeric ids; monitor
/// ids are UUID strings; labels are addressed by their `category:name` key.
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    // Alert policies

    /// List policies, optionally filtered server-side by exact name
    async fn list_policies(&self, name: Option<&str>) -> ApiResult<Vec<PolicyEntity>>;
    async fn create_policy(&self, policy: &PolicyRequest) -> ApiResult<PolicyEntity>;
    async fn update_policy(&self, id: i64, policy: &PolicyRequest) -> ApiResult<PolicyEntity>;
    async fn delete_policy(&self, id: i64) -> ApiResult<()>;
    /// Replace the channels associated with a policy
    async fn update_policy_channels(&self, policy_id: i64, channel_ids: &[i64]) -> ApiResult<()>;

    // Alert channels

    async fn list_channels(&self) -> ApiResult<Vec<ChannelEntity>>;
    async fn create_channel(&self, channel: &ChannelRequest) -> ApiResult<ChannelEntity>;
    async fn delete_channel(&self, id: i64) -> ApiResult<()>;

    // Dashboards

    async fn list_dashboards(&self) -> ApiResult<Vec<DashboardEntity>>;
    /// `dashboard` is the bare document, without the `{"dashboard": ...}` envelope
    async fn create_dashboard(&self, dashboard: &Value) -> ApiResult<DashboardEntity>;
    async fn update_dashboard(&self, id: i64, dashboard: &Value) -> ApiResult<DashboardEntity>;
    async fn delete_dashboard(&self, id: i64) -> ApiResult<()>;

    // Synthetics

    async fn list_monitors(&self) -> ApiResult<Vec<MonitorEntity>>;
    async fn get_monitor(&self, id: &str) -> ApiResult<MonitorEntity>;
    /// Returns the id of the new monitor
    async fn create_monitor(&self, monitor: &MonitorRequest) -> ApiResult<String>;
    async fn update_monitor(&self, id: &str, monitor: &MonitorRequest) -> ApiResult<()>;
    async fn delete_monitor(&self, id: &str) -> ApiResult<()>;
    /// Upload a base64-encoded script for a scripted monitor
    async fn update_monitor_script(&self, id: &str, script_base64: &str) -> ApiResult<()>;
    async fn list_synthetics_conditions(&self, policy_id: i64)
        -> ApiResult<Vec<SyntheticsCondition>>;
    async fn create_synthetics_condition(
        &self,
        policy_id: i64,
        condition: &SyntheticsCondition,
    ) -> ApiResult<SyntheticsCondition>;

    // Labels

    async fn list_labels(&self) -> ApiResult<Vec<LabelEntity>>;
    /// Create or replace a label and its links
    async fn upsert_label(&self, label: &LabelRequest) -> ApiResult<LabelEntity>;
    async fn delete_label(&self, key: &str) -> ApiResult<()>;
}
