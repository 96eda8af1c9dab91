//! # New Relic Wire Types
//!
//! Request and response payloads for the REST v2 and Synthetics v3 APIs.
//! Only the fields the operator reads or writes are modelled; unknown
//! fields in responses are ignored.

use crate::crd::{IncidentPreference, MonitorOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Alert policies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRequest {
    pub name: String,
    pub incident_preference: IncidentPreference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub incident_preference: Option<String>,
}

// ============================================================================
// Alert channels
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub configuration: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntity {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub links: ChannelLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLinks {
    #[serde(default)]
    pub policy_ids: Vec<i64>,
}

// ============================================================================
// Dashboards
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntity {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
}

// ============================================================================
// Synthetics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorType {
    Simple,
    Browser,
    ScriptBrowser,
    ScriptApi,
}

impl MonitorType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Simple => "SIMPLE",
            MonitorType::Browser => "BROWSER",
            MonitorType::ScriptBrowser => "SCRIPT_BROWSER",
            MonitorType::ScriptApi => "SCRIPT_API",
        }
    }

    /// Scripted monitors carry a script that is uploaded separately
    #[must_use]
    pub fn is_scripted(&self) -> bool {
        matches!(self, MonitorType::ScriptBrowser | MonitorType::ScriptApi)
    }
}

impl std::str::FromStr for MonitorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SIMPLE" | "PING" => Ok(MonitorType::Simple),
            "BROWSER" => Ok(MonitorType::Browser),
            "SCRIPT_BROWSER" => Ok(MonitorType::ScriptBrowser),
            "SCRIPT_API" => Ok(MonitorType::ScriptApi),
            other => Err(format!("unknown monitor type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRequest {
    pub name: String,
    /// Type exactly as the resource spelled it, or `simple`
    #[serde(rename = "type")]
    pub monitor_type: String,
    /// Parsed form of `monitor_type`; never sent
    #[serde(skip)]
    pub kind: MonitorType,
    pub frequency: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub locations: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_threshold: Option<f64>,
    pub options: MonitorOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub monitor_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticsCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub monitor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

// ============================================================================
// Labels
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRequest {
    pub category: String,
    pub name: String,
    pub links: LabelLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntity {
    #[serde(default)]
    pub key: Option<String>,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub links: LabelLinks,
}

impl LabelEntity {
    /// `category:name`, New Relic's identifier for a label
    #[must_use]
    pub fn key(&self) -> String {
        self.key
            .clone()
            .unwrap_or_else(|| label_key(&self.category, &self.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLinks {
    #[serde(default)]
    pub applications: Vec<i64>,
    #[serde(default)]
    pub servers: Vec<i64>,
}

#[must_use]
pub fn label_key(category: &str, name: &str) -> String {
    format!("{category}:{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_type_parse_is_case_insensitive() {
        assert_eq!("simple".parse::<MonitorType>(), Ok(MonitorType::Simple));
        assert_eq!("Script_Api".parse::<MonitorType>(), Ok(MonitorType::ScriptApi));
        assert!("carrier-pigeon".parse::<MonitorType>().is_err());
    }

    #[test]
    fn test_monitor_request_wire_format() {
        let request = MonitorRequest {
            name: "ping".to_string(),
            monitor_type: "SCRIPT_BROWSER".to_string(),
            kind: MonitorType::ScriptBrowser,
            frequency: 5,
            uri: None,
            locations: vec!["AWS_US_WEST_1".to_string()],
            status: "enabled".to_string(),
            sla_threshold: Some(7.0),
            options: MonitorOptions::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "SCRIPT_BROWSER");
        assert_eq!(json["slaThreshold"], 7.0);
        assert_eq!(json["options"]["verifySSL"], false);
        assert!(json.get("uri").is_none());
    }

    #[test]
    fn test_label_key_prefers_remote_key() {
        let label = LabelEntity {
            key: None,
            category: "Team".to_string(),
            name: "Payments".to_string(),
            links: LabelLinks::default(),
        };
        assert_eq!(label.key(), "Team:Payments");
    }
}
