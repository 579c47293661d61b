use crate::record::{Category, ShapedRecord};
use crate::sink::RecordSink;
use async_trait::async_trait;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Mutex;

/// Console destination: renders each routed record as a single short line
/// (`"{LABEL}: {message}"`) into the wrapped writer, stdout by default.
pub struct ConsoleSink<W: Write + Send + 'static> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> ConsoleSink<W> {
    /// Create a console sink over an arbitrary writer.
    pub fn new(writer: W) -> Self {
        ConsoleSink {
            writer: Mutex::new(writer),
        }
    }
}

impl ConsoleSink<io::Stdout> {
    /// Create a console sink that writes to stdout.
    pub fn stdout() -> Self {
        ConsoleSink::new(io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send + 'static> RecordSink for ConsoleSink<W> {
    async fn send(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = record.console_line(category);
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{line}")?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writer.flush()?;
        Ok(())
    }
}
