use crate::layer::ErrorBridgeLayer;
use crate::relay::Relay;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration for the error bridge installation.
///
/// **Fields**
/// - `channel_buffer`: maximum number of captured events queued before new
///   ones are dropped.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of the bridge so events also render to the console.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            enable_stdout: true,
        }
    }
}

/// Install the error bridge as the global `tracing` subscriber using the
/// provided relay and [`BridgeConfig`].
///
/// After this call every `tracing` event in the process is observed by the
/// bridge; `ERROR`-level events are forwarded through the relay as Error
/// records. Returns the background task handle.
pub fn init_error_bridge_with_config(relay: Arc<Relay>, config: BridgeConfig) -> JoinHandle<()> {
    let (layer, handle) = ErrorBridgeLayer::new(relay, config.channel_buffer);

    // The bridge layer always ships to the relay; the fmt layer is stacked
    // in addition when console echo is wanted. The subscriber is assembled
    // in two variants for type compatibility.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }

    handle
}

/// Install the error bridge with sensible defaults.
///
/// Equivalent to calling [`init_error_bridge_with_config`] with
/// [`BridgeConfig::default`]. This is the recommended entrypoint for
/// typical services.
pub fn init_error_bridge(relay: Arc<Relay>) -> JoinHandle<()> {
    init_error_bridge_with_config(relay, BridgeConfig::default())
}
