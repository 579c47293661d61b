use std::sync::Arc;

use crate::builder::RecordBuilder;
use crate::config::RelayConfig;
use crate::context::RequestContext;
use crate::correlation::CorrelationStore;
use crate::perf::PerformanceTracker;
use crate::record::{AdditionalInfo, Category, ErrorDetail, ShapedRecord};
use crate::router::{EmitError, Router};
use crate::sink::RecordSink;

/// Caller-facing facade: owns the configuration, the correlation store and
/// the router, and turns semantic events into routed records.
///
/// Every Error emission clears the correlation store, regardless of whether
/// any destination was active, so an error's correlation id cannot leak
/// into unrelated subsequent events.
pub struct Relay {
    config: Arc<RelayConfig>,
    correlation: CorrelationStore,
    router: Arc<Router>,
}

impl Relay {
    /// Relay with the default destinations: dated per-category files under
    /// the configured directory, plus stdout.
    pub fn new(config: RelayConfig) -> Self {
        let config = Arc::new(config);
        let router = Arc::new(Router::new(config.clone()));
        Relay {
            config,
            correlation: CorrelationStore::new(),
            router,
        }
    }

    /// Relay with injected destinations, for callers that ship records
    /// elsewhere (or tests that record them).
    pub fn with_sinks(
        config: RelayConfig,
        file: Arc<dyn RecordSink>,
        console: Arc<dyn RecordSink>,
    ) -> Self {
        let config = Arc::new(config);
        let router = Arc::new(Router::with_sinks(config.clone(), file, console));
        Relay {
            config,
            correlation: CorrelationStore::new(),
            router,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn correlation(&self) -> &CorrelationStore {
        &self.correlation
    }

    /// Link subsequent events to one logical operation. The value is
    /// consumed by every build until an Error emission clears it.
    pub fn set_correlation_id(&self, id: impl Into<String>) {
        self.correlation.set(id);
    }

    fn build(
        &self,
        category: Category,
        message: Option<&str>,
        ctx: Option<&RequestContext>,
        extra: Option<AdditionalInfo>,
    ) -> ShapedRecord {
        RecordBuilder::new(&self.config, &self.correlation).build(category, message, ctx, extra)
    }

    /// What features are used most?
    pub async fn log_usage(
        &self,
        message: &str,
        extra: Option<AdditionalInfo>,
    ) -> Result<(), EmitError> {
        let record = self.build(Category::Usage, Some(message), None, extra);
        self.router.emit(Category::Usage, &record).await
    }

    pub async fn log_usage_with_context(
        &self,
        message: &str,
        ctx: &RequestContext,
        extra: Option<AdditionalInfo>,
    ) -> Result<(), EmitError> {
        let record = self.build(Category::Usage, Some(message), Some(ctx), extra);
        self.router.emit(Category::Usage, &record).await
    }

    /// Ad-hoc troubleshooting events.
    pub async fn log_diagnostic(
        &self,
        message: &str,
        extra: Option<AdditionalInfo>,
    ) -> Result<(), EmitError> {
        let record = self.build(Category::Diagnostic, Some(message), None, extra);
        self.router.emit(Category::Diagnostic, &record).await
    }

    pub async fn log_diagnostic_with_context(
        &self,
        message: &str,
        ctx: &RequestContext,
        extra: Option<AdditionalInfo>,
    ) -> Result<(), EmitError> {
        let record = self.build(Category::Diagnostic, Some(message), Some(ctx), extra);
        self.router.emit(Category::Diagnostic, &record).await
    }

    /// Log a typed error, capturing its full source chain.
    pub async fn log_error<E: std::error::Error>(&self, error: &E) -> Result<(), EmitError> {
        self.log_error_detail(ErrorDetail::from_error(error), None)
            .await
    }

    /// Log an error that only carries a message.
    pub async fn log_error_message(&self, message: &str) -> Result<(), EmitError> {
        let record = self.build(Category::Error, Some(message), None, None);
        self.emit_error(record).await
    }

    /// Log captured failure detail, optionally enriched from a request
    /// context.
    pub async fn log_error_detail(
        &self,
        detail: ErrorDetail,
        ctx: Option<&RequestContext>,
    ) -> Result<(), EmitError> {
        let mut record = self.build(Category::Error, None, ctx, None);
        record.set_error(detail);
        self.emit_error(record).await
    }

    /// Error path for the bridge layer: ambient `tracing` events arrive as
    /// message plus collected fields.
    pub(crate) async fn log_error_event(
        &self,
        message: Option<&str>,
        extra: AdditionalInfo,
    ) -> Result<(), EmitError> {
        let record = self.build(Category::Error, message, None, Some(extra));
        self.emit_error(record).await
    }

    async fn emit_error(&self, record: ShapedRecord) -> Result<(), EmitError> {
        let result = self.router.emit(Category::Error, &record).await;
        // Cleared regardless of destination activity or sink outcome.
        self.correlation.clear();
        result
    }

    /// Start timing one unit of work. The returned tracker owns a
    /// pre-built Performance record; stop it to freeze and optionally emit.
    pub fn start_tracker(
        &self,
        message: &str,
        extra: Option<AdditionalInfo>,
    ) -> PerformanceTracker {
        let record = self.build(Category::Performance, Some(message), None, extra);
        PerformanceTracker::new(record, self.router.clone())
    }

    pub fn start_tracker_with_context(
        &self,
        message: &str,
        ctx: &RequestContext,
        extra: Option<AdditionalInfo>,
    ) -> PerformanceTracker {
        let record = self.build(Category::Performance, Some(message), Some(ctx), extra);
        PerformanceTracker::new(record, self.router.clone())
    }
}
