//! Console-application flow: configure a relay, emit one event per
//! category, and time a unit of work.

use log_relay::config::RelayConfig;
use log_relay::relay::Relay;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RelayConfig {
        application_name: "relay-demo".to_string(),
        application_layer: "worker".to_string(),
        ..RelayConfig::default()
    };
    log_relay::env::apply_env_overrides(&mut config);

    let relay = Relay::new(config);

    relay.set_correlation_id("demo-run-1");
    relay.log_usage("startup", None).await?;
    relay.log_diagnostic("cache warmed", None).await?;

    let mut tracker = relay.start_tracker("rebuild index", None);
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    let record = tracker.stop(true).await?;
    println!("elapsed: {} ms", record.elapsed_milliseconds().unwrap_or_default());

    relay.log_error_message("oh no").await?;
    // The error cleared the correlation id; this event gets a fresh one.
    relay.log_usage("shutdown", None).await?;

    Ok(())
}
