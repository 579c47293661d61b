use crate::record::{Category, ShapedRecord};
use crate::sink::RecordSink;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// Configuration for [`ElasticSink`].
///
/// The sink talks to an Elasticsearch-compatible endpoint over HTTP,
/// indexing one document per record. The hierarchical record shape maps
/// directly onto an index mapping; the flat shape works as well since every
/// record serializes to a single JSON document.
#[derive(Clone, Debug)]
pub struct ElasticConfig {
    /// Base URL without a trailing path, e.g. "http://127.0.0.1:9200".
    pub url: String,
    /// Index name prefix; the category name is appended per document, e.g.
    /// `app-logs` indexes error records into `app-logs-error`.
    pub index: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Elasticsearch implementation of [`RecordSink`] using the document API.
#[derive(Clone)]
pub struct ElasticSink {
    client: Client,
    config: ElasticConfig,
}

impl ElasticSink {
    /// Construct a new sink instance using the provided configuration.
    pub fn new(config: ElasticConfig) -> Self {
        let client = Client::new();
        ElasticSink { client, config }
    }

    fn endpoint(&self, category: Category) -> String {
        format!(
            "{}/{}-{}/_doc",
            self.config.url.trim_end_matches('/'),
            self.config.index,
            category.dataset()
        )
    }
}

#[async_trait]
impl RecordSink for ElasticSink {
    async fn send(
        &self,
        category: Category,
        record: &ShapedRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut request = self
            .client
            .post(self.endpoint(category))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(record)?);

        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("elastic index request failed with status {status}: {text}").into())
        }
    }
}
