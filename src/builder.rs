use chrono::Utc;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::context::{self, RequestContext};
use crate::correlation::CorrelationStore;
use crate::ecs::{EcsHttp, EcsHttpBody, EcsHttpRequest, EcsHttpResponse, EcsLogRecord};
use crate::record::{AdditionalInfo, Category, LogRecord, ShapedRecord};
use crate::useragent;

/// Assembles one record per call from category, message, request context and
/// caller-supplied extra info. The shape (flat vs hierarchical) is selected
/// once per call from the configuration; a single call never produces both.
pub struct RecordBuilder<'a> {
    config: &'a RelayConfig,
    correlation: &'a CorrelationStore,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(config: &'a RelayConfig, correlation: &'a CorrelationStore) -> Self {
        RecordBuilder {
            config,
            correlation,
        }
    }

    pub fn build(
        &self,
        category: Category,
        message: Option<&str>,
        ctx: Option<&RequestContext>,
        extra: Option<AdditionalInfo>,
    ) -> ShapedRecord {
        let (correlation_id, system_generated) = self
            .correlation
            .resolve(ctx.and_then(|c| c.trace_identifier.as_deref()));

        let enrichment = ctx.map(context::extract);

        // Caller-supplied info is seeded first; automatic extraction runs
        // after it, so an exact key collision resolves to the extracted
        // value.
        let mut info = extra.unwrap_or_default();
        if let Some(enrichment) = &enrichment {
            for (key, value) in &enrichment.entries {
                info.insert(key.clone(), value.clone());
            }
        }

        if self.config.map_to_ecs {
            self.build_ecs(category, message, ctx, enrichment, info, correlation_id)
        } else {
            self.build_flat(
                message,
                enrichment,
                info,
                correlation_id,
                system_generated,
            )
        }
    }

    fn build_flat(
        &self,
        message: Option<&str>,
        enrichment: Option<context::Enrichment>,
        info: AdditionalInfo,
        correlation_id: String,
        system_generated: bool,
    ) -> ShapedRecord {
        let enrichment = enrichment.unwrap_or_default();

        ShapedRecord::Flat(LogRecord {
            id: Uuid::new_v4(),
            application_name: self.config.application_name.clone(),
            application_layer: self.config.application_layer.clone(),
            application_location: enrichment.location,
            message: message.map(str::to_string),
            hostname: machine_name(),
            correlation_id,
            system_generated_correlation_id: system_generated,
            creation_timestamp: Utc::now(),
            user_id: enrichment.user_id,
            user_name: enrichment.user_name,
            additional_info: info,
            performance_elapsed_milliseconds: None,
            error: None,
        })
    }

    fn build_ecs(
        &self,
        category: Category,
        message: Option<&str>,
        ctx: Option<&RequestContext>,
        enrichment: Option<context::Enrichment>,
        info: AdditionalInfo,
        correlation_id: String,
    ) -> ShapedRecord {
        let enrichment = enrichment.unwrap_or_default();
        let mut record = EcsLogRecord::new(Utc::now());

        record.message = message.map(str::to_string);
        record.labels.application_name = self.config.application_name.clone();
        record.labels.application_layer = self.config.application_layer.clone();
        record.labels.application_location = enrichment.location.unwrap_or_default();
        record.event.dataset = category.dataset().to_string();
        record.tracing.transaction.id = correlation_id;
        record.user.id = enrichment.user_id;
        record.user.name = enrichment.user_name;
        record.custom_info = info;

        let host = machine_name();
        record.host.hostname = host.clone();
        record.host.host = host;

        if let Some(ctx) = ctx {
            record.client.ip = ctx.client_ip.clone().unwrap_or_default();

            if let Some(original) = &ctx.user_agent {
                let parsed = useragent::parse(original);
                record.user_agent.original = original.clone();
                record.user_agent.name = parsed.name;
                record.user_agent.version = parsed.version;
                record.user_agent.device.name = parsed.device;
            }

            record.http = build_http(ctx);
        }

        ShapedRecord::Ecs(record)
    }
}

/// The `http` group is attached only when the boundary captured something.
fn build_http(ctx: &RequestContext) -> Option<EcsHttp> {
    let request = ctx.request_body.as_ref().map(|body| EcsHttpRequest {
        method: ctx.method.clone().unwrap_or_default(),
        mime_type: ctx.request_mime.clone().unwrap_or_default(),
        referrer: ctx.referrer.clone().unwrap_or_default(),
        body: EcsHttpBody {
            bytes: body.bytes,
            content: body.content.clone(),
        },
    });

    let response = ctx.response.as_ref().map(|capture| EcsHttpResponse {
        status_code: capture.status_code,
        mime_type: capture.mime_type.clone().unwrap_or_default(),
        body: capture
            .body
            .as_ref()
            .map(|body| EcsHttpBody {
                bytes: body.bytes,
                content: body.content.clone(),
            })
            .unwrap_or_default(),
    });

    if request.is_none() && response.is_none() {
        return None;
    }
    Some(EcsHttp { request, response })
}

fn machine_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Claim;

    fn config(map_to_ecs: bool) -> RelayConfig {
        RelayConfig {
            application_name: "app".to_string(),
            application_layer: "api".to_string(),
            map_to_ecs,
            ..RelayConfig::default()
        }
    }

    #[test]
    fn unset_correlation_is_synthesized_and_flagged() {
        let config = config(false);
        let store = CorrelationStore::new();
        let builder = RecordBuilder::new(&config, &store);

        let record = builder.build(Category::Usage, Some("hi"), None, None);
        match record {
            ShapedRecord::Flat(flat) => {
                assert!(!flat.correlation_id.is_empty());
                assert!(flat.system_generated_correlation_id);
            }
            ShapedRecord::Ecs(_) => panic!("expected flat shape"),
        }
    }

    #[test]
    fn caller_set_correlation_is_used_and_not_flagged() {
        let config = config(false);
        let store = CorrelationStore::new();
        store.set("op-42");
        let builder = RecordBuilder::new(&config, &store);

        let record = builder.build(Category::Usage, Some("hi"), None, None);
        match record {
            ShapedRecord::Flat(flat) => {
                assert_eq!(flat.correlation_id, "op-42");
                assert!(!flat.system_generated_correlation_id);
            }
            ShapedRecord::Ecs(_) => panic!("expected flat shape"),
        }
    }

    #[test]
    fn context_trace_identifier_is_the_correlation_fallback() {
        let config = config(false);
        let store = CorrelationStore::new();
        let builder = RecordBuilder::new(&config, &store);

        let mut ctx = RequestContext::new();
        ctx.trace_identifier = Some("req-9".to_string());

        let record = builder.build(Category::Error, None, Some(&ctx), None);
        assert_eq!(record.correlation_id(), "req-9");
    }

    #[test]
    fn extracted_entries_overwrite_caller_supplied_on_same_key() {
        let config = config(false);
        let store = CorrelationStore::new();
        let builder = RecordBuilder::new(&config, &store);

        let mut ctx = RequestContext::new();
        ctx.user_agent = Some("agent/2.0".to_string());

        let mut extra = AdditionalInfo::new();
        extra.insert(
            crate::context::USER_AGENT_KEY.to_string(),
            serde_json::json!("caller-value"),
        );
        extra.insert("Step".to_string(), serde_json::json!("checkout"));

        let record = builder.build(Category::Usage, Some("hi"), Some(&ctx), Some(extra));
        assert_eq!(record.info()[crate::context::USER_AGENT_KEY], "agent/2.0");
        assert_eq!(record.info()["Step"], "checkout");
    }

    #[test]
    fn shape_selection_is_exhaustive_and_exclusive() {
        let store = CorrelationStore::new();

        let flat_config = config(false);
        let flat = RecordBuilder::new(&flat_config, &store).build(
            Category::Usage,
            Some("hi"),
            None,
            None,
        );
        assert!(matches!(flat, ShapedRecord::Flat(_)));

        let ecs_config = config(true);
        let ecs = RecordBuilder::new(&ecs_config, &store).build(
            Category::Usage,
            Some("hi"),
            None,
            None,
        );
        assert!(matches!(ecs, ShapedRecord::Ecs(_)));
    }

    #[test]
    fn ecs_record_carries_identity_and_dataset() {
        let config = config(true);
        let store = CorrelationStore::new();
        store.set("op-1");
        let builder = RecordBuilder::new(&config, &store);

        let mut ctx = RequestContext::new();
        ctx.path = Some("/orders".to_string());
        ctx.claims = vec![Claim::new(crate::context::CLAIM_NAME_IDENTIFIER, "u1")];
        ctx.user_agent =
            Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".to_string());

        let record = builder.build(Category::Diagnostic, Some("probe"), Some(&ctx), None);
        match record {
            ShapedRecord::Ecs(ecs) => {
                assert_eq!(ecs.labels.application_name, "app");
                assert_eq!(ecs.labels.application_location, "/orders");
                assert_eq!(ecs.event.dataset, "diagnostic");
                assert_eq!(ecs.tracing.transaction.id, "op-1");
                assert_eq!(ecs.user.id, "u1");
                assert_eq!(ecs.user_agent.name.as_deref(), Some("Firefox"));
                assert!(ecs.http.is_none());
            }
            ShapedRecord::Flat(_) => panic!("expected ecs shape"),
        }
    }

    #[test]
    fn captured_bodies_surface_in_the_http_group() {
        let config = config(true);
        let store = CorrelationStore::new();
        let builder = RecordBuilder::new(&config, &store);

        let mut ctx = RequestContext::new();
        ctx.method = Some("POST".to_string());
        ctx.request_mime = Some("application/json".to_string());
        ctx.request_body = Some(crate::context::CapturedBody {
            bytes: Some(2),
            content: "{}".to_string(),
        });
        ctx.response = Some(crate::context::ResponseCapture {
            status_code: 201,
            mime_type: Some("application/json".to_string()),
            body: None,
        });

        let record = builder.build(Category::Usage, Some("create"), Some(&ctx), None);
        match record {
            ShapedRecord::Ecs(ecs) => {
                let http = ecs.http.expect("http group");
                let request = http.request.expect("request capture");
                assert_eq!(request.method, "POST");
                assert_eq!(request.body.content, "{}");
                assert_eq!(http.response.expect("response capture").status_code, 201);
            }
            ShapedRecord::Flat(_) => panic!("expected ecs shape"),
        }
    }
}
