//! Shared helpers for in-crate tests.

use crate::record::{AdditionalInfo, Category, LogRecord, ShapedRecord};
use crate::sink::RecordSink;
use async_trait::async_trait;
use chrono::Utc;
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Sink that remembers everything routed to it.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Category, ShapedRecord)>>,
}

impl RecordingSink {
    pub fn shared() -> Arc<Self> {
        Arc::new(RecordingSink::default())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(category, _)| *category)
            .collect()
    }

    pub fn records(&self) -> Vec<(Category, ShapedRecord)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn send(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sent.lock().unwrap().push((category, record.clone()));
        Ok(())
    }
}

/// Cloneable in-memory writer for console sink assertions.
#[derive(Clone, Default)]
pub struct SharedBuf {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        SharedBuf::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Minimal flat record for sink/router tests.
pub fn flat_record_with_message(message: Option<&str>) -> ShapedRecord {
    ShapedRecord::Flat(LogRecord {
        id: Uuid::new_v4(),
        application_name: "app".to_string(),
        application_layer: "api".to_string(),
        application_location: None,
        message: message.map(str::to_string),
        hostname: "box-1".to_string(),
        correlation_id: "corr-1".to_string(),
        system_generated_correlation_id: false,
        creation_timestamp: Utc::now(),
        user_id: String::new(),
        user_name: String::new(),
        additional_info: AdditionalInfo::new(),
        performance_elapsed_milliseconds: None,
        error: None,
    })
}
