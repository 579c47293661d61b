//! Hierarchical record schema grouping fields into semantic namespaces.
//!
//! Every group except `http` is materialized even when empty so that the
//! document shape stays stable for downstream index mappings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::AdditionalInfo;

/// Root document of the hierarchical schema.
#[derive(Debug, Clone, Serialize)]
pub struct EcsLogRecord {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub labels: EcsLabels,
    pub tags: Vec<String>,
    pub client: EcsClient,
    pub container: EcsContainer,
    pub error: EcsError,
    pub event: EcsEvent,
    pub host: EcsHost,
    pub kubernetes: EcsKubernetes,
    pub log: EcsLog,
    pub performance: EcsPerformance,
    pub tracing: EcsTracing,
    pub user: EcsUser,
    pub user_agent: EcsUserAgent,
    pub custom_info: AdditionalInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<EcsHttp>,
}

impl EcsLogRecord {
    /// Empty record stamped with the given creation time. All groups are
    /// present and empty.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        EcsLogRecord {
            timestamp,
            message: None,
            labels: EcsLabels::default(),
            tags: Vec::new(),
            client: EcsClient::default(),
            container: EcsContainer::default(),
            error: EcsError::default(),
            event: EcsEvent::default(),
            host: EcsHost::default(),
            kubernetes: EcsKubernetes::default(),
            log: EcsLog::default(),
            performance: EcsPerformance::default(),
            tracing: EcsTracing::default(),
            user: EcsUser::default(),
            user_agent: EcsUserAgent::default(),
            custom_info: AdditionalInfo::new(),
            http: None,
        }
    }
}

/// Meta information about the emitting application.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsLabels {
    pub application_name: String,
    pub application_layer: String,
    pub application_location: String,
}

/// Client side of the network connection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsClient {
    pub ip: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsContainer {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsError {
    pub code: String,
    pub id: String,
    pub message: String,
    pub stack_trace: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsEvent {
    /// Which of the per-category streams this document belongs to.
    pub dataset: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsHost {
    pub hostname: String,
    pub host: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsKubernetes {
    pub pod: EcsKubernetesPod,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsKubernetesPod {
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsLog {
    pub file: EcsLogFile,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsLogFile {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsPerformance {
    pub elapsed_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsTracing {
    pub transaction: EcsTransaction,
}

/// The highest level of work measured within a service, such as one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsTransaction {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsUser {
    pub id: String,
    pub name: String,
    pub email_address: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

/// Parsed browser user-agent. `original` keeps the unparsed header value;
/// the parsed fields stay `None` when the header cannot be interpreted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsUserAgent {
    pub name: Option<String>,
    pub version: Option<String>,
    pub original: String,
    pub device: EcsUserAgentDevice,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsUserAgentDevice {
    pub name: Option<String>,
}

/// Captured request/response pair, present only when an HTTP boundary
/// captured something.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsHttp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<EcsHttpRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<EcsHttpResponse>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsHttpRequest {
    pub method: String,
    pub mime_type: String,
    pub referrer: String,
    pub body: EcsHttpBody,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsHttpResponse {
    pub status_code: u16,
    pub mime_type: String,
    pub body: EcsHttpBody,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EcsHttpBody {
    pub bytes: Option<u64>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_serializes_all_groups() {
        let record = EcsLogRecord::new(Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "@timestamp",
            "labels",
            "tags",
            "client",
            "container",
            "error",
            "event",
            "host",
            "kubernetes",
            "log",
            "performance",
            "tracing",
            "user",
            "user_agent",
            "custom_info",
        ] {
            assert!(obj.contains_key(key), "missing group {key}");
        }
        assert!(!obj.contains_key("http"));
        assert!(!obj.contains_key("message"));
    }

    #[test]
    fn nested_groups_keep_their_shape_when_empty() {
        let record = EcsLogRecord::new(Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["kubernetes"]["pod"]["uid"], "");
        assert_eq!(json["tracing"]["transaction"]["id"], "");
        assert_eq!(json["log"]["file"]["path"], "");
        assert_eq!(json["custom_info"], serde_json::json!({}));
        assert!(json["performance"]["elapsed_milliseconds"].is_null());
    }

    #[test]
    fn error_group_renames_type_field() {
        let mut record = EcsLogRecord::new(Utc::now());
        record.error.type_name = "panic".to_string();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["error"]["type"], "panic");
    }
}
