use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::record::AdditionalInfo;
use crate::relay::Relay;

/// `tracing_subscriber` layer that observes `ERROR`-level events and
/// forwards each as an Error-category record through the relay, via a
/// bounded channel and a background task.
///
/// This covers failures reported through the ambient `tracing` macros by
/// code that never sees the relay, the way a global unhandled-error hook
/// would. Channel I/O is fully decoupled from the emitting thread: `on_event`
/// only does a non-blocking enqueue.
pub struct ErrorBridgeLayer {
    sender: mpsc::Sender<BridgeEvent>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully forwarded through the relay.
    pub forwarded_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

/// One captured `tracing` event on its way to the relay.
struct BridgeEvent {
    message: Option<String>,
    fields: BTreeMap<String, serde_json::Value>,
    target: String,
    module_path: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl ErrorBridgeLayer {
    /// Create a new layer and spawn a background task that pulls captured
    /// events from a bounded channel and forwards them through `relay`.
    ///
    /// A minimal threshold is enforced for `buffer` to avoid degenerate
    /// configurations. The task ends when the layer is dropped.
    pub fn new(relay: Arc<Relay>, buffer: usize) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<BridgeEvent>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let forwarded_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let forwarded_bg = Arc::clone(&forwarded_events);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match forward(&relay, event).await {
                    Ok(()) => {
                        forwarded_bg.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        eprintln!("error forwarding bridged event: {}", e);
                    }
                }
            }
        });

        (
            Self {
                sender: tx,
                total_events,
                forwarded_events,
                dropped_events,
            },
            handle,
        )
    }
}

async fn forward(relay: &Relay, event: BridgeEvent) -> Result<(), crate::router::EmitError> {
    let mut extra: AdditionalInfo = event.fields;
    extra.insert(
        "Target".to_string(),
        serde_json::Value::String(event.target),
    );
    if let Some(module_path) = event.module_path {
        extra.insert(
            "ModulePath".to_string(),
            serde_json::Value::String(module_path),
        );
    }
    if let Some(file) = event.file {
        extra.insert("SourceFile".to_string(), serde_json::Value::String(file));
    }
    if let Some(line) = event.line {
        extra.insert("SourceLine".to_string(), serde_json::Value::from(line));
    }

    relay.log_error_event(event.message.as_deref(), extra).await
}

impl<S> Layer<S> for ErrorBridgeLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > Level::ERROR {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        let bridged = BridgeEvent {
            message,
            fields,
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
        };

        if self.sender.try_send(bridged).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("bridge channel full, dropping error event");
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::record::Category;
    use crate::testing::RecordingSink;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn bridged_relay() -> (Arc<Relay>, Arc<RecordingSink>) {
        let config = RelayConfig {
            application_name: "app".to_string(),
            ..RelayConfig::default()
        };
        let file = RecordingSink::shared();
        let console = RecordingSink::shared();
        let relay = Arc::new(Relay::with_sinks(config, file.clone(), console));
        (relay, file)
    }

    #[tokio::test]
    async fn error_events_become_error_records() {
        let (relay, file) = bridged_relay();
        let (layer, handle) = ErrorBridgeLayer::new(relay, 64);

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(order_id = 7, "payment failed");
        });
        // Dropping the subscriber closed the channel; the task drains it.
        handle.await.unwrap();

        let records = file.records();
        assert_eq!(records.len(), 1);
        let (category, record) = &records[0];
        assert_eq!(*category, Category::Error);
        assert_eq!(record.message(), Some("payment failed"));
        assert_eq!(record.info()["order_id"], 7);
        assert!(record.info().contains_key("Target"));
    }

    #[tokio::test]
    async fn sub_error_events_are_filtered_out() {
        let (relay, file) = bridged_relay();
        let (layer, handle) = ErrorBridgeLayer::new(relay, 64);
        let total = Arc::clone(&layer.total_events);

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("routine");
            tracing::warn!("suspicious");
        });
        handle.await.unwrap();

        assert_eq!(file.count(), 0);
        assert_eq!(total.load(Ordering::Relaxed), 2);
    }
}
