use crate::context::{ChatReply, ChatRequest};
use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "https://insurance-intake-agent.azurewebsites.net";

/// Delivers one chat request and returns the decoded reply.
pub trait ChatTransport: Send + Sync {
    fn send(&self, request: &ChatRequest) -> impl Future<Output = Result<ChatReply>> + Send;
}

#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build chat HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ChatTransport for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send request to chat endpoint")?;

        let status = response.status();
        let mut reply: ChatReply = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        if !status.is_success() {
            reply.success = false;
        }

        Ok(reply)
    }
}
