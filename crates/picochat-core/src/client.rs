use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Body of `POST {base_url}/completions`
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionChoice {
    pub text: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![CompletionChoice { text: text.into() }],
        }
    }

    /// Only the first choice is ever consumed.
    pub fn first_text(&self) -> Result<&str> {
        self.choices
            .first()
            .map(|c| c.text.as_str())
            .ok_or_else(|| ChatError::MalformedResponse("response has no choices".to_string()))
    }
}

/// The remote completion server, as seen by the orchestrator.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Connectivity probe. Ok means the server answered with a 2xx.
    async fn probe(&self) -> Result<()>;

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

#[derive(Clone)]
pub struct CompletionsClient {
    client: Client,
    base_url: String,
}

impl CompletionsClient {
    /// `timeout` of `None` leaves reqwest's default (no timeout).
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionBackend for CompletionsClient {
    async fn probe(&self) -> Result<()> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ChatError::Connectivity(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::Connectivity(format!(
                "server responded with status {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/completions", self.base_url);

        tracing::debug!(
            url = %url,
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Http {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        // Reject bodies we could not use before anyone tries to
        completion.first_text()?;
        Ok(completion)
    }
}
