use crate::record::{Category, ShapedRecord};
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for shaped records produced by the router.
///
/// Implementations are responsible for transporting records to a concrete
/// destination (category log files, the console, an HTTP document store,
/// etc.). The router calls `send` once per routed record and category.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Send a single record to the underlying destination.
    ///
    /// **Parameters**
    /// - `category`: semantic category the record was emitted under; file
    ///   destinations use it to select the target stream.
    /// - `record`: fully-built record, immutable from here on.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted by the destination.
    /// - `Err(..)` if the destination failed (I/O error, serialization
    ///   error, HTTP status, etc.). The router surfaces this to the caller
    ///   without retrying.
    async fn send(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the destination buffers.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
