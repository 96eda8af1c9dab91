//! # REST Client
//!
//! [`MonitoringApi`] over New Relic's REST v2 and Synthetics v3 endpoints.
//!
//! Every call carries the `X-Api-Key` header and is bounded by the client
//! timeout. Each call is recorded in the remote operation metrics with its
//! outcome (`success`, `not_found`, `error`).

use super::error::{ApiError, ApiResult};
use super::types::{
    ChannelEntity, ChannelRequest, DashboardEntity, LabelEntity, LabelRequest, MonitorEntity,
    MonitorRequest, PolicyEntity, PolicyRequest, SyntheticsCondition,
};
use super::MonitoringApi;
use crate::config::NewRelicConfig;
use crate::constants::MAX_LIST_PAGES;
use crate::observability::metrics;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, LINK, LOCATION};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Synthetics v3 caps list pages at 100 monitors
const MONITOR_PAGE_SIZE: usize = 100;

/// New Relic REST client
#[derive(Clone)]
pub struct NewRelicClient {
    http: reqwest::Client,
    api_url: String,
    synthetics_url: String,
}

impl std::fmt::Debug for NewRelicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewRelicClient")
            .field("api_url", &self.api_url)
            .field("synthetics_url", &self.synthetics_url)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Envelopes
// ----------------------------------------------------------------------------

#[derive(Serialize)]
struct PolicyEnvelope<'a> {
    policy: &'a PolicyRequest,
}

#[derive(Deserialize)]
struct PolicyResponse {
    policy: PolicyEntity,
}

#[derive(Deserialize)]
struct PoliciesResponse {
    #[serde(default)]
    policies: Vec<PolicyEntity>,
}

#[derive(Serialize)]
struct ChannelEnvelope<'a> {
    channel: &'a ChannelRequest,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    channels: Vec<ChannelEntity>,
}

#[derive(Serialize)]
struct DashboardEnvelope<'a> {
    dashboard: &'a Value,
}

#[derive(Deserialize)]
struct DashboardResponse {
    dashboard: DashboardEntity,
}

#[derive(Deserialize)]
struct DashboardsResponse {
    #[serde(default)]
    dashboards: Vec<DashboardEntity>,
}

#[derive(Deserialize)]
struct MonitorsResponse {
    #[serde(default)]
    monitors: Vec<MonitorEntity>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptEnvelope<'a> {
    script_text: &'a str,
}

#[derive(Serialize)]
struct ConditionEnvelope<'a> {
    synthetics_condition: &'a SyntheticsCondition,
}

#[derive(Deserialize)]
struct ConditionResponse {
    synthetics_condition: SyntheticsCondition,
}

#[derive(Deserialize)]
struct ConditionsResponse {
    #[serde(default)]
    synthetics_conditions: Vec<SyntheticsCondition>,
}

#[derive(Serialize)]
struct LabelEnvelope<'a> {
    label: &'a LabelRequest,
}

#[derive(Deserialize)]
struct LabelResponse {
    label: LabelEntity,
}

#[derive(Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<LabelEntity>,
}

impl NewRelicClient {
    /// Build the client; fails only if the TLS backend or API key header is unusable
    pub fn new(config: &NewRelicConfig) -> ApiResult<Self> {
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ApiError::InvalidUrl(format!("api key is not a valid header: {e}")))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("newrelic-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            synthetics_url: config.synthetics_url.clone(),
        })
    }

    fn v2(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn synthetics(&self, path: &str) -> String {
        format!("{}/{}", self.synthetics_url, path)
    }

    /// Send a request, turning non-2xx answers into [`ApiError::Status`]
    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> ApiResult<Response> {
        let start = Instant::now();
        let result = match request.send().await {
            Err(e) => Err(ApiError::Transport(e)),
            Ok(rsp) if rsp.status().is_success() => Ok(rsp),
            Ok(rsp) => {
                let status = rsp.status().as_u16();
                let body = rsp.text().await.unwrap_or_default();
                Err(ApiError::Status { status, body })
            }
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        };
        metrics::record_remote_operation(operation, outcome, start.elapsed().as_secs_f64());
        debug!(operation, outcome, "newrelic.request");
        result
    }

    async fn decode<T: DeserializeOwned>(rsp: Response) -> ApiResult<T> {
        let bytes = rsp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Walk a paginated REST v2 list, following `Link: rel="next"`
    async fn list_paged<T, F>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
        extract: F,
    ) -> ApiResult<Vec<T>>
    where
        F: Fn(Value) -> ApiResult<Vec<T>>,
    {
        let mut items = Vec::new();
        for page in 1..=MAX_LIST_PAGES {
            let request = self
                .http
                .get(self.v2(path))
                .query(query)
                .query(&[("page", page)]);
            let rsp = self.execute(operation, request).await?;
            let has_next = rsp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("rel=\"next\""));
            let body: Value = Self::decode(rsp).await?;
            items.extend(extract(body)?);
            if !has_next {
                break;
            }
        }
        Ok(items)
    }

    fn label_url(&self, key: &str) -> ApiResult<Url> {
        let mut url =
            Url::parse(&self.api_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .push("labels")
            .push(&format!("{key}.json"));
        Ok(url)
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl MonitoringApi for NewRelicClient {
    async fn list_policies(&self, name: Option<&str>) -> ApiResult<Vec<PolicyEntity>> {
        let query: Vec<(&str, String)> = name
            .map(|n| vec![("filter[name]", n.to_string())])
            .unwrap_or_default();
        self.list_paged("list_policies", "alerts_policies.json", &query, |v| {
            from_value::<PoliciesResponse>(v).map(|r| r.policies)
        })
        .await
    }

    async fn create_policy(&self, policy: &PolicyRequest) -> ApiResult<PolicyEntity> {
        let request = self
            .http
            .post(self.v2("alerts_policies.json"))
            .json(&PolicyEnvelope { policy });
        let rsp = self.execute("create_policy", request).await?;
        Ok(Self::decode::<PolicyResponse>(rsp).await?.policy)
    }

    async fn update_policy(&self, id: i64, policy: &PolicyRequest) -> ApiResult<PolicyEntity> {
        let request = self
            .http
            .put(self.v2(&format!("alerts_policies/{id}.json")))
            .json(&PolicyEnvelope { policy });
        let rsp = self.execute("update_policy", request).await?;
        Ok(Self::decode::<PolicyResponse>(rsp).await?.policy)
    }

    async fn delete_policy(&self, id: i64) -> ApiResult<()> {
        let request = self
            .http
            .delete(self.v2(&format!("alerts_policies/{id}.json")));
        self.execute("delete_policy", request).await?;
        Ok(())
    }

    /// `PUT alerts_policy_channels` only adds links, so channels linked to the
    /// policy but absent from `channel_ids` are unlinked one by one
    async fn update_policy_channels(&self, policy_id: i64, channel_ids: &[i64]) -> ApiResult<()> {
        if !channel_ids.is_empty() {
            let ids = channel_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let request = self
                .http
                .put(self.v2("alerts_policy_channels.json"))
                .query(&[("policy_id", policy_id.to_string()), ("channel_ids", ids)]);
            self.execute("update_policy_channels", request).await?;
        }

        let stale: Vec<i64> = self
            .list_channels()
            .await?
            .into_iter()
            .filter(|c| c.links.policy_ids.contains(&policy_id) && !channel_ids.contains(&c.id))
            .map(|c| c.id)
            .collect();

        for channel_id in stale {
            let request = self.http.delete(self.v2("alerts_policy_channels.json")).query(&[
                ("policy_id", policy_id.to_string()),
                ("channel_id", channel_id.to_string()),
            ]);
            match self.execute("unlink_policy_channel", request).await {
                Ok(_) => debug!(policy_id, channel_id, "unlinked alert channel"),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn list_channels(&self) -> ApiResult<Vec<ChannelEntity>> {
        self.list_paged("list_channels", "alerts_channels.json", &[], |v| {
            from_value::<ChannelsResponse>(v).map(|r| r.channels)
        })
        .await
    }

    async fn create_channel(&self, channel: &ChannelRequest) -> ApiResult<ChannelEntity> {
        let request = self
            .http
            .post(self.v2("alerts_channels.json"))
            .json(&ChannelEnvelope { channel });
        let rsp = self.execute("create_channel", request).await?;
        Self::decode::<ChannelsResponse>(rsp)
            .await?
            .channels
            .into_iter()
            .next()
            .ok_or(ApiError::MissingField("channels[0]"))
    }

    async fn delete_channel(&self, id: i64) -> ApiResult<()> {
        let request = self
            .http
            .delete(self.v2(&format!("alerts_channels/{id}.json")));
        self.execute("delete_channel", request).await?;
        Ok(())
    }

    async fn list_dashboards(&self) -> ApiResult<Vec<DashboardEntity>> {
        self.list_paged("list_dashboards", "dashboards.json", &[], |v| {
            from_value::<DashboardsResponse>(v).map(|r| r.dashboards)
        })
        .await
    }

    async fn create_dashboard(&self, dashboard: &Value) -> ApiResult<DashboardEntity> {
        let request = self
            .http
            .post(self.v2("dashboards.json"))
            .json(&DashboardEnvelope { dashboard });
        let rsp = self.execute("create_dashboard", request).await?;
        Ok(Self::decode::<DashboardResponse>(rsp).await?.dashboard)
    }

    async fn update_dashboard(&self, id: i64, dashboard: &Value) -> ApiResult<DashboardEntity> {
        let request = self
            .http
            .put(self.v2(&format!("dashboards/{id}.json")))
            .json(&DashboardEnvelope { dashboard });
        let rsp = self.execute("update_dashboard", request).await?;
        Ok(Self::decode::<DashboardResponse>(rsp).await?.dashboard)
    }

    async fn delete_dashboard(&self, id: i64) -> ApiResult<()> {
        let request = self.http.delete(self.v2(&format!("dashboards/{id}.json")));
        self.execute("delete_dashboard", request).await?;
        Ok(())
    }

    async fn list_monitors(&self) -> ApiResult<Vec<MonitorEntity>> {
        let mut monitors = Vec::new();
        for _ in 0..MAX_LIST_PAGES {
            let request = self.http.get(self.synthetics("monitors")).query(&[
                ("offset", monitors.len()),
                ("limit", MONITOR_PAGE_SIZE),
            ]);
            let rsp = self.execute("list_monitors", request).await?;
            let page = Self::decode::<MonitorsResponse>(rsp).await?.monitors;
            let done = page.len() < MONITOR_PAGE_SIZE;
            monitors.extend(page);
            if done {
                break;
            }
        }
        Ok(monitors)
    }

    async fn get_monitor(&self, id: &str) -> ApiResult<MonitorEntity> {
        let request = self.http.get(self.synthetics(&format!("monitors/{id}")));
        let rsp = self.execute("get_monitor", request).await?;
        Self::decode(rsp).await
    }

    async fn create_monitor(&self, monitor: &MonitorRequest) -> ApiResult<String> {
        let request = self.http.post(self.synthetics("monitors")).json(monitor);
        let rsp = self.execute("create_monitor", request).await?;
        rsp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .ok_or(ApiError::MissingField("location header"))
    }

    async fn update_monitor(&self, id: &str, monitor: &MonitorRequest) -> ApiResult<()> {
        let request = self
            .http
            .put(self.synthetics(&format!("monitors/{id}")))
            .json(monitor);
        self.execute("update_monitor", request).await?;
        Ok(())
    }

    async fn delete_monitor(&self, id: &str) -> ApiResult<()> {
        let request = self.http.delete(self.synthetics(&format!("monitors/{id}")));
        self.execute("delete_monitor", request).await?;
        Ok(())
    }

    async fn update_monitor_script(&self, id: &str, script_base64: &str) -> ApiResult<()> {
        let request = self
            .http
            .put(self.synthetics(&format!("monitors/{id}/script")))
            .json(&ScriptEnvelope {
                script_text: script_base64,
            });
        self.execute("update_monitor_script", request).await?;
        Ok(())
    }

    async fn list_synthetics_conditions(
        &self,
        policy_id: i64,
    ) -> ApiResult<Vec<SyntheticsCondition>> {
        let query = [("policy_id", policy_id.to_string())];
        self.list_paged(
            "list_synthetics_conditions",
            "alerts_synthetics_conditions.json",
            &query,
            |v| from_value::<ConditionsResponse>(v).map(|r| r.synthetics_conditions),
        )
        .await
    }

    async fn create_synthetics_condition(
        &self,
        policy_id: i64,
        condition: &SyntheticsCondition,
    ) -> ApiResult<SyntheticsCondition> {
        let request = self
            .http
            .post(self.v2(&format!(
                "alerts_synthetics_conditions/policies/{policy_id}.json"
            )))
            .json(&ConditionEnvelope {
                synthetics_condition: condition,
            });
        let rsp = self.execute("create_synthetics_condition", request).await?;
        Ok(Self::decode::<ConditionResponse>(rsp)
            .await?
            .synthetics_condition)
    }

    async fn list_labels(&self) -> ApiResult<Vec<LabelEntity>> {
        self.list_paged("list_labels", "labels.json", &[], |v| {
            from_value::<LabelsResponse>(v).map(|r| r.labels)
        })
        .await
    }

    async fn upsert_label(&self, label: &LabelRequest) -> ApiResult<LabelEntity> {
        let request = self
            .http
            .put(self.v2("labels.json"))
            .json(&LabelEnvelope { label });
        let rsp = self.execute("upsert_label", request).await?;
        Ok(Self::decode::<LabelResponse>(rsp).await?.label)
    }

    async fn delete_label(&self, key: &str) -> ApiResult<()> {
        let request = self.http.delete(self.label_url(key)?);
        self.execute("delete_label", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::IncidentPreference;
    use crate::newrelic::{LabelLinks, MonitorType};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NewRelicClient {
        let config = NewRelicConfig::for_base_url("test-key", &server.uri());
        NewRelicClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_create_policy_sends_api_key_and_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts_policies.json"))
            .and(header("X-Api-Key", "test-key"))
            .and(body_json(json!({
                "policy": {"name": "checkout", "incident_preference": "PER_POLICY"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "policy": {"id": 42, "name": "checkout", "incident_preference": "PER_POLICY"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_policy(&PolicyRequest {
                name: "checkout".to_string(),
                incident_preference: IncidentPreference::PerPolicy,
            })
            .await
            .unwrap();
        assert_eq!(created.id, 42);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/alerts_policies/7.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"error\":\"gone\"}"))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_policy(7).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("gone"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts_channels.json"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_channels().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_channels_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts_channels.json"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", "<https://api.newrelic.com/v2/alerts_channels.json?page=2>; rel=\"next\"")
                    .set_body_json(json!({"channels": [
                        {"id": 1, "name": "ops-slack", "type": "slack", "links": {"policy_ids": [9]}}
                    ]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alerts_channels.json"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"channels": [
                {"id": 2, "name": "ops-email", "type": "email"}
            ]})))
            .mount(&server)
            .await;

        let channels = client_for(&server).list_channels().await.unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].links.policy_ids, vec![9]);
        assert!(channels[1].links.policy_ids.is_empty());
    }

    #[tokio::test]
    async fn test_update_policy_channels_query() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/alerts_policy_channels.json"))
            .and(query_param("policy_id", "5"))
            .and(query_param("channel_ids", "1,3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"policy": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alerts_channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"channels": [
                {"id": 1, "name": "a", "type": "slack", "links": {"policy_ids": [5]}},
                {"id": 3, "name": "c", "type": "email", "links": {"policy_ids": [5]}}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/alerts_policy_channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        client_for(&server)
            .update_policy_channels(5, &[1, 3])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_policy_channels_unlinks_dropped_channels() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/alerts_policy_channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"policy": {}})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alerts_channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"channels": [
                {"id": 1, "name": "a", "type": "slack", "links": {"policy_ids": [5, 6]}},
                {"id": 2, "name": "b", "type": "slack", "links": {"policy_ids": [6]}}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/alerts_policy_channels.json"))
            .and(query_param("policy_id", "5"))
            .and(query_param("channel_id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"channel": {}})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .update_policy_channels(5, &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_monitor_reads_location_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/monitors"))
            .and(body_partial_json(json!({"type": "simple", "frequency": 10})))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "Location",
                "https://synthetics.newrelic.com/synthetics/api/v3/monitors/abc-123",
            ))
            .mount(&server)
            .await;

        let id = client_for(&server)
            .create_monitor(&MonitorRequest {
                name: "ping".to_string(),
                monitor_type: "simple".to_string(),
                kind: MonitorType::Simple,
                frequency: 10,
                uri: Some("https://example.com".to_string()),
                locations: vec!["AWS_US_WEST_1".to_string()],
                status: "enabled".to_string(),
                sla_threshold: None,
                options: crate::crd::MonitorOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(id, "abc-123");
    }

    #[tokio::test]
    async fn test_create_monitor_without_location_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/monitors"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_monitor(&MonitorRequest {
                name: "ping".to_string(),
                monitor_type: "simple".to_string(),
                kind: MonitorType::Simple,
                frequency: 10,
                uri: None,
                locations: vec![],
                status: "enabled".to_string(),
                sla_threshold: None,
                options: crate::crd::MonitorOptions::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_upsert_and_delete_label() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/labels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"label": {
                "key": "Team:Payments",
                "category": "Team",
                "name": "Payments",
                "links": {"applications": [12], "servers": []}
            }})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/labels/Team:Payments.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let label = client
            .upsert_label(&LabelRequest {
                category: "Team".to_string(),
                name: "Payments".to_string(),
                links: LabelLinks {
                    applications: vec![12],
                    servers: vec![],
                },
            })
            .await
            .unwrap();
        assert_eq!(label.key(), "Team:Payments");
        client.delete_label("Team:Payments").await.unwrap();
    }
}
