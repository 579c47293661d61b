use crate::record::{Category, ShapedRecord};
use crate::sink::RecordSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all records.
///
/// This is the "none" destination: useful for silencing a slot entirely,
/// for measuring the overhead of the routing layer without any I/O, and for
/// unit tests that don't care about persistence.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl RecordSink for NoopSink {
    async fn send(
        &self,
        _category: Category,
        _record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
