use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::record::{Category, ShapedRecord};
use crate::router::{EmitError, Router};

/// Enrichment key stamped with the wall-clock start time at construction.
pub const STARTED_KEY: &str = "Started";

/// Error type for performance tracker misuse.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// The tracker was stopped twice. A second stop would overwrite the
    /// frozen elapsed time with a meaningless second measurement.
    #[error("performance tracker already stopped")]
    AlreadyStopped,

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Stateful timer bound to exactly one record.
///
/// The clock starts at construction (`Running`); `stop` freezes the elapsed
/// milliseconds onto the bound record and optionally hands it to the router
/// under the Performance category (`Stopped`, terminal). There is no
/// transition back to `Running`.
pub struct PerformanceTracker {
    record: Option<ShapedRecord>,
    started: Instant,
    router: Arc<Router>,
}

impl PerformanceTracker {
    pub(crate) fn new(mut record: ShapedRecord, router: Arc<Router>) -> Self {
        record.insert_info(
            STARTED_KEY,
            serde_json::Value::String(Utc::now().to_rfc3339()),
        );

        PerformanceTracker {
            record: Some(record),
            started: Instant::now(),
            router,
        }
    }

    pub fn is_running(&self) -> bool {
        self.record.is_some()
    }

    /// Stop the timer. Freezes elapsed milliseconds onto the bound record;
    /// when `write_to_file` is true the record is handed to the router for
    /// the Performance category (whose own toggles still apply). Returns
    /// the frozen record.
    ///
    /// Calling `stop` on an already-stopped tracker is an invalid-state
    /// error, not a silent no-op.
    pub async fn stop(&mut self, write_to_file: bool) -> Result<ShapedRecord, TrackerError> {
        let mut record = self.record.take().ok_or(TrackerError::AlreadyStopped)?;

        let elapsed = self.started.elapsed().as_millis() as u64;
        record.set_elapsed(elapsed);

        if write_to_file {
            self.router.emit(Category::Performance, &record).await?;
        }

        Ok(record)
    }
}
