//! Axum service wired with the usage middleware and the exception
//! boundary. `GET /` succeeds, `GET /boom` panics and is answered with the
//! sanitized error envelope.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use log_relay::config::RelayConfig;
use log_relay::middleware::{exception_boundary, track_usage};
use log_relay::relay::Relay;

async fn index() -> &'static str {
    "ok"
}

async fn boom() -> &'static str {
    panic!("boom")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig {
        application_name: "relay-demo".to_string(),
        application_layer: "api".to_string(),
        ..RelayConfig::default()
    };
    let relay = Arc::new(Relay::new(config));

    let app = Router::new()
        .route("/", get(index))
        .route("/boom", get(boom))
        .layer(axum::middleware::from_fn_with_state(
            relay.clone(),
            track_usage,
        ))
        .layer(axum::middleware::from_fn_with_state(
            relay.clone(),
            exception_boundary,
        ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    println!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
