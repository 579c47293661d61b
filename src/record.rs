use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::ecs::EcsLogRecord;

/// Open-ended enrichment mapping attached to every record. Keys are unique;
/// a later insert for the same key wins.
pub type AdditionalInfo = BTreeMap<String, serde_json::Value>;

/// Semantic category of an emitted event. Routing, console labels, file
/// names and the ECS `event.dataset` value all key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Usage,
    Diagnostic,
    Error,
    Performance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Usage,
        Category::Diagnostic,
        Category::Error,
        Category::Performance,
    ];

    /// Console line prefix.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Usage => "USAGE",
            Category::Diagnostic => "DIAGNOSTIC",
            Category::Error => "ERROR",
            Category::Performance => "PERF",
        }
    }

    /// Lowercase name used for file naming and `event.dataset`.
    pub fn dataset(&self) -> &'static str {
        match self {
            Category::Usage => "usage",
            Category::Diagnostic => "diagnostic",
            Category::Error => "error",
            Category::Performance => "performance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dataset())
    }
}

/// Captured failure detail attached to Error records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ErrorDetail {
    /// Capture a typed error. The message is the outermost `Display`; the
    /// full `source()` chain is rendered into `stack_trace` one frame per
    /// line, outermost first, so the innermost message is the last line.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let mut frames = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            frames.push(cause.to_string());
            source = cause.source();
        }

        ErrorDetail {
            code: None,
            message: frames[0].clone(),
            stack_trace: Some(frames.join("\n")),
            type_name: std::any::type_name::<E>().to_string(),
        }
    }

    /// Detail for a failure that only carries a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        ErrorDetail {
            code: None,
            message: message.into(),
            stack_trace: None,
            type_name: String::new(),
        }
    }

    /// Detail for a caught panic payload.
    pub fn from_panic(message: impl Into<String>) -> Self {
        ErrorDetail {
            code: None,
            message: message.into(),
            stack_trace: None,
            type_name: "panic".to_string(),
        }
    }
}

/// Flat record schema: a single level of well-known fields plus the
/// `additionalInfo` enrichment mapping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: Uuid,
    pub application_name: String,
    pub application_layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub hostname: String,
    pub correlation_id: String,
    pub system_generated_correlation_id: bool,
    pub creation_timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub additional_info: AdditionalInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_elapsed_milliseconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// One record in either of the two supported shapes. A single build call
/// produces exactly one variant; the shape never changes after building.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ShapedRecord {
    Flat(LogRecord),
    Ecs(EcsLogRecord),
}

impl ShapedRecord {
    pub fn message(&self) -> Option<&str> {
        match self {
            ShapedRecord::Flat(r) => r.message.as_deref(),
            ShapedRecord::Ecs(r) => r.message.as_deref(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            ShapedRecord::Flat(r) => &r.correlation_id,
            ShapedRecord::Ecs(r) => &r.tracing.transaction.id,
        }
    }

    /// Elapsed milliseconds, when this is a performance record.
    pub fn elapsed_milliseconds(&self) -> Option<u64> {
        match self {
            ShapedRecord::Flat(r) => r.performance_elapsed_milliseconds,
            ShapedRecord::Ecs(r) => r.performance.elapsed_milliseconds,
        }
    }

    /// Message of the captured error detail, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ShapedRecord::Flat(r) => r.error.as_ref().map(|e| e.message.as_str()),
            ShapedRecord::Ecs(r) => {
                if r.error.message.is_empty() {
                    None
                } else {
                    Some(r.error.message.as_str())
                }
            }
        }
    }

    /// Enrichment mapping (`additionalInfo` / `custom_info`).
    pub fn info(&self) -> &AdditionalInfo {
        match self {
            ShapedRecord::Flat(r) => &r.additional_info,
            ShapedRecord::Ecs(r) => &r.custom_info,
        }
    }

    pub fn insert_info(&mut self, key: impl Into<String>, value: serde_json::Value) {
        match self {
            ShapedRecord::Flat(r) => r.additional_info.insert(key.into(), value),
            ShapedRecord::Ecs(r) => r.custom_info.insert(key.into(), value),
        };
    }

    /// Freeze elapsed milliseconds onto the record.
    pub fn set_elapsed(&mut self, elapsed_ms: u64) {
        match self {
            ShapedRecord::Flat(r) => r.performance_elapsed_milliseconds = Some(elapsed_ms),
            ShapedRecord::Ecs(r) => r.performance.elapsed_milliseconds = Some(elapsed_ms),
        }
    }

    /// Attach failure detail.
    pub fn set_error(&mut self, detail: ErrorDetail) {
        match self {
            ShapedRecord::Flat(r) => r.error = Some(detail),
            ShapedRecord::Ecs(r) => {
                r.error.id = Uuid::new_v4().to_string();
                r.error.code = detail.code.unwrap_or_default();
                r.error.message = detail.message;
                r.error.stack_trace = detail.stack_trace.unwrap_or_default();
                r.error.type_name = detail.type_name;
            }
        }
    }

    /// Short line forwarded to the console writer:
    /// `"{LABEL}: {message-or-error-message}"`, with elapsed milliseconds
    /// appended for performance records.
    pub fn console_line(&self, category: Category) -> String {
        let text = self
            .error_message()
            .or_else(|| self.message())
            .unwrap_or_default();

        match category {
            Category::Performance => format!(
                "{}: {} - {} ms",
                category.label(),
                text,
                self.elapsed_milliseconds().unwrap_or_default()
            ),
            _ => format!("{}: {}", category.label(), text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_record() -> LogRecord {
        LogRecord {
            id: Uuid::new_v4(),
            application_name: "app".to_string(),
            application_layer: "api".to_string(),
            application_location: None,
            message: Some("hello".to_string()),
            hostname: "box-1".to_string(),
            correlation_id: "corr-1".to_string(),
            system_generated_correlation_id: false,
            creation_timestamp: Utc::now(),
            user_id: String::new(),
            user_name: String::new(),
            additional_info: AdditionalInfo::new(),
            performance_elapsed_milliseconds: None,
            error: None,
        }
    }

    #[test]
    fn flat_serialization_uses_camel_case_names() {
        let json = serde_json::to_value(ShapedRecord::Flat(flat_record())).unwrap();
        let obj = json.as_object().unwrap();

        for key in [
            "id",
            "applicationName",
            "applicationLayer",
            "message",
            "hostname",
            "correlationId",
            "systemGeneratedCorrelationId",
            "creationTimestamp",
            "userId",
            "userName",
            "additionalInfo",
        ] {
            assert!(obj.contains_key(key), "missing field {key}");
        }
        assert!(!obj.contains_key("error"));
        assert!(!obj.contains_key("performanceElapsedMilliseconds"));
    }

    #[test]
    fn additional_info_is_always_present_even_when_empty() {
        let json = serde_json::to_value(flat_record()).unwrap();
        assert_eq!(json["additionalInfo"], serde_json::json!({}));
    }

    #[test]
    fn error_detail_renders_full_source_chain() {
        let root = std::io::Error::new(std::io::ErrorKind::Other, "disk offline");
        let wrapped = std::io::Error::new(std::io::ErrorKind::BrokenPipe, root);

        let detail = ErrorDetail::from_error(&wrapped);
        assert_eq!(detail.message, "disk offline");
        let chain = detail.stack_trace.unwrap();
        assert_eq!(chain.lines().last(), Some("disk offline"));
    }

    #[test]
    fn error_detail_serializes_type_field() {
        let detail = ErrorDetail::from_panic("boom");
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["type"], "panic");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn console_line_prefers_error_message() {
        let mut record = ShapedRecord::Flat(flat_record());
        record.set_error(ErrorDetail::from_message("boom"));
        assert_eq!(record.console_line(Category::Error), "ERROR: boom");
    }

    #[test]
    fn console_line_appends_elapsed_for_performance() {
        let mut record = ShapedRecord::Flat(flat_record());
        record.set_elapsed(42);
        assert_eq!(
            record.console_line(Category::Performance),
            "PERF: hello - 42 ms"
        );
    }

    #[test]
    fn insert_info_last_write_wins() {
        let mut record = ShapedRecord::Flat(flat_record());
        record.insert_info("k", serde_json::json!("first"));
        record.insert_info("k", serde_json::json!("second"));
        assert_eq!(record.info()["k"], "second");
        assert_eq!(record.info().len(), 1);
    }
}
