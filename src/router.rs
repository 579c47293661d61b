use std::error::Error;
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::console::ConsoleSink;
use crate::file::FileSink;
use crate::record::{Category, ShapedRecord};
use crate::sink::RecordSink;

/// Error type returned when a destination rejects a routed record.
///
/// Sink failures are surfaced to the caller as-is; the router neither
/// retries nor suppresses them.
#[derive(thiserror::Error, Debug)]
pub enum EmitError {
    #[error("file destination rejected {category} record: {source}")]
    File {
        category: Category,
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("console destination rejected {category} record: {source}")]
    Console {
        category: Category,
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Routes each built record to the destinations its category enables.
///
/// The two per-category flags are independent: a record may go to both
/// destinations, either one, or neither (a valid silent no-op).
pub struct Router {
    config: Arc<RelayConfig>,
    file: Arc<dyn RecordSink>,
    console: Arc<dyn RecordSink>,
}

impl Router {
    /// Router with the default destinations derived from configuration:
    /// dated per-category files plus stdout.
    pub fn new(config: Arc<RelayConfig>) -> Self {
        let file = Arc::new(FileSink::from_config(&config));
        Router {
            config,
            file,
            console: Arc::new(ConsoleSink::stdout()),
        }
    }

    /// Router with injected destinations.
    pub fn with_sinks(
        config: Arc<RelayConfig>,
        file: Arc<dyn RecordSink>,
        console: Arc<dyn RecordSink>,
    ) -> Self {
        Router {
            config,
            file,
            console,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Forward `record` to the destinations enabled for `category`.
    pub async fn emit(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), EmitError> {
        let toggles = self.config.toggles(category);

        if toggles.write_to_file {
            self.file
                .send(category, record)
                .await
                .map_err(|source| EmitError::File { category, source })?;
        }

        if toggles.write_to_console {
            self.console
                .send(category, record)
                .await
                .map_err(|source| EmitError::Console { category, source })?;
        }

        Ok(())
    }
}
