use crate::config::RelayConfig;
use crate::record::{Category, ShapedRecord};
use crate::sink::RecordSink;
use async_trait::async_trait;
use chrono::Utc;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Durable destination: one dated log file per category under a configured
/// directory, one JSON document per line.
///
/// The file for a given day is selected at write time, so a long-lived sink
/// rolls over to a new file at midnight UTC without coordination.
pub struct FileSink {
    directory: PathBuf,
    prefix: String,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        FileSink {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        FileSink::new(config.log_directory.clone(), config.file_prefix.clone())
    }

    /// Target path for a category on the current UTC day:
    /// `<dir>/<prefix>-<category>-<yyyy-mm-dd>.log`.
    pub fn current_path(&self, category: Category) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d");
        self.directory
            .join(format!("{}-{}-{}.log", self.prefix, category.dataset(), date))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn send(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = serde_json::to_string(record)? + "\n";

        tokio::fs::create_dir_all(&self.directory).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path(category))
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::flat_record_with_message;

    #[tokio::test]
    async fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path(), "relay");

        let record = flat_record_with_message(Some("first"));
        sink.send(Category::Usage, &record).await.unwrap();
        sink.send(Category::Usage, &record).await.unwrap();

        let path = sink.current_path(Category::Usage);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("relay-usage-"));
        assert!(name.ends_with(".log"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["message"], "first");
    }

    #[tokio::test]
    async fn categories_write_to_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path(), "relay");

        let record = flat_record_with_message(Some("x"));
        sink.send(Category::Usage, &record).await.unwrap();
        sink.send(Category::Error, &record).await.unwrap();

        assert!(sink.current_path(Category::Usage).exists());
        assert!(sink.current_path(Category::Error).exists());
        assert_ne!(
            sink.current_path(Category::Usage),
            sink.current_path(Category::Error)
        );
    }
}
