use crate::case::ExtractionRecord;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Fetches extraction artifacts either over HTTP or from a local data root.
///
/// `http://` and `https://` URIs go through `reqwest`; anything else is a
/// site-relative path such as `/data/manual/pricing_sample_adv.json`, resolved
/// against `data_root` with percent-escapes decoded.
#[derive(Clone)]
pub struct DocumentFetcher {
    data_root: PathBuf,
    client: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self::with_client(data_root, reqwest::Client::new())
    }

    pub fn with_client(data_root: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            data_root: data_root.into(),
            client,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Fetch and parse one JSON document.
    pub async fn fetch_json(&self, uri: &str) -> Result<Value> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            self.fetch_remote(uri).await
        } else {
            self.read_local(uri).await
        }
    }

    /// Fetch one document as an extraction record. An empty reference is an
    /// empty record; an unreachable, unparsable or non-object document is an
    /// error.
    pub async fn load_record(&self, uri: &str) -> Result<ExtractionRecord> {
        if uri.is_empty() {
            debug!("No document reference, using empty record");
            return Ok(ExtractionRecord::new());
        }

        match self.fetch_json(uri).await? {
            Value::Object(record) => Ok(record),
            other => anyhow::bail!("Document is a JSON {}, not an object", json_kind(&other)),
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send document request")?;

        if !response.status().is_success() {
            anyhow::bail!("Document request failed: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse document JSON")
    }

    async fn read_local(&self, uri: &str) -> Result<Value> {
        let path = self.resolve_local(uri)?;
        let content = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read document: {:?}", path))?;

        serde_json::from_str(&content).context(format!("Failed to parse document: {:?}", path))
    }

    fn resolve_local(&self, uri: &str) -> Result<PathBuf> {
        let decoded = urlencoding::decode(uri).context("Invalid percent-encoding in document path")?;
        let relative = decoded.trim_start_matches('/');

        if Path::new(relative)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            anyhow::bail!("Document path escapes data root: {}", uri);
        }

        Ok(self.data_root.join(relative))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
