//! GeminiEmbedder -- concrete [`Embedder`] over the Gemini
//! `embedContent` / `batchEmbedContents` APIs.
//!
//! Embedding failures are non-fatal upstream: document search degrades
//! to lexical retrieval when this capability is unavailable.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use querydesk_core::embedding::Embedder;
use querydesk_types::generation::GenerationError;

use super::types::{
    BatchEmbedContentsRequest, BatchEmbedContentsResponse, Content, EmbedContentRequest,
    EmbedContentResponse, Part,
};

/// Gemini embedding provider.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    dimension: usize,
    /// Texts longer than this are truncated before embedding.
    max_chars: usize,
}

impl GeminiEmbedder {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_key: SecretString, model: String, dimension: usize, max_chars: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model,
            dimension,
            max_chars,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{method}", self.base_url, self.model)
    }

    /// Truncate to the character budget without splitting a codepoint.
    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.max_chars {
            return text;
        }
        let mut end = self.max_chars;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    fn embed_request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: self.truncate(text).to_string(),
                }],
            },
        }
    }

    fn check_dimension(&self, values: &[f32]) -> Result<(), GenerationError> {
        if values.len() != self.dimension {
            return Err(GenerationError::InvalidOutput(format!(
                "expected {}-dimensional embedding, got {}",
                self.dimension,
                values.len()
            )));
        }
        Ok(())
    }

    fn map_transport_error(e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Unavailable(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GenerationError::AuthenticationFailed);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "gemini embedding request failed");
            return Err(GenerationError::Unavailable(format!("HTTP {status}")));
        }
        Ok(response)
    }
}

impl Embedder for GeminiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        let body = self.embed_request(text);

        let response = self
            .client
            .post(self.url("embedContent"))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;

        self.check_dimension(&parsed.embedding.values)?;
        Ok(parsed.embedding.values)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GenerationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = BatchEmbedContentsRequest {
            requests: texts.iter().map(|t| self.embed_request(t)).collect(),
        };

        let response = self
            .client
            .post(self.url("batchEmbedContents"))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;
        let response = Self::check_status(response).await?;

        let parsed: BatchEmbedContentsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(GenerationError::InvalidOutput(format!(
                "embedded {} of {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        let mut vectors = Vec::with_capacity(parsed.embeddings.len());
        for embedding in parsed.embeddings {
            self.check_dimension(&embedding.values)?;
            vectors.push(embedding.values);
        }
        Ok(vectors)
    }
}
