//! Embedding providers.
//!
//! The engine depends only on the [`EmbeddingProvider`] trait; concrete
//! backends (an OpenAI-compatible API, or a local deterministic hasher)
//! are substitutable, which is also how tests inject stub vectors.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Trait for embedding providers.
///
/// The contract is pure from the engine's perspective: the same text
/// under the same model always yields the same vector, and failure is
/// signaled as an error, never as a zero or empty vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Name of this provider, also used as the cache namespace.
    fn name(&self) -> &str;

    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts.
    ///
    /// Texts are independent, so the default processes them one at a
    /// time; providers with a batch API override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Provider backed by an OpenAI-compatible embeddings API.
pub struct OpenAiProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model name sent with every request.
    model: String,

    /// Dimension of the configured model's output.
    dimension: usize,
}

impl OpenAiProvider {
    /// Create a provider reading the API key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL (for compatible servers or test doubles).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model and its output dimension.
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }

    async fn request(&self, input: serde_json::Value) -> Result<OpenAiEmbeddingResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        let body = serde_json::json!({
            "input": input,
            "model": self.model,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error: {error_text}"
            )));
        }

        Ok(response.json().await?)
    }
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!("generating embedding with model: {}", self.model);

        let result = self.request(serde_json::json!(text)).await?;
        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                EmbeddingError::InvalidResponse("no embedding in response".to_string())
            })?;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "provider returned an empty vector".to_string(),
            ));
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "generating batch embeddings for {} texts with model: {}",
            texts.len(),
            self.model
        );

        let result = self.request(serde_json::json!(texts)).await?;
        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        info!("generated {} batch embeddings", result.data.len());
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

/// Local deterministic provider using token feature hashing.
///
/// Each whitespace-separated token is hashed into two bucket positions
/// of a fixed-width vector, then the vector is L2-normalized. Not a
/// semantic model, but it captures lexical overlap, needs no network,
/// and — being fully deterministic — backs the test suites.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Create a provider with the default 256-dimension output.
    pub fn new() -> Self {
        Self { dimension: 256 }
    }

    /// Create a provider with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// FNV-1a, fixed here so vectors stay stable across releases.
    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if token.is_empty() {
                continue;
            }

            let hash = Self::fnv1a(&token);
            // Two positions per token reduces collision damage at small widths.
            vector[(hash % self.dimension as u64) as usize] += 1.0;
            vector[((hash >> 32) % self.dimension as u64) as usize] += 1.0;
        }

        normalize(&mut vector);
        Ok(vector)
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_hashing_provider_is_deterministic() {
        let provider = HashingProvider::with_dimension(64);

        let a = provider.embed("wooden dining chair").await.unwrap();
        let b = provider.embed("wooden dining chair").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hashing_provider_favors_lexical_overlap() {
        let provider = HashingProvider::new();

        let query = provider.embed("wooden chair").await.unwrap();
        let chair = provider.embed("Oak Dining Chair wooden legs").await.unwrap();
        let stool = provider.embed("Plastic Stool lightweight").await.unwrap();

        let sim_chair = crate::similarity::cosine_similarity(&query, &chair).unwrap();
        let sim_stool = crate::similarity::cosine_similarity(&query, &stool).unwrap();
        assert!(sim_chair > sim_stool);
    }

    #[tokio::test]
    async fn test_hashing_provider_dimension() {
        let provider = HashingProvider::with_dimension(32);
        let v = provider.embed("lamp").await.unwrap();
        assert_eq!(v.len(), 32);
    }

    #[tokio::test]
    async fn test_openai_provider_requires_key() {
        let provider = OpenAiProvider::new().with_base_url("http://localhost:0");
        if !provider.is_available() {
            let err = provider.embed("chair").await.unwrap_err();
            assert!(matches!(err, EmbeddingError::ProviderNotConfigured));
        }
    }

    #[tokio::test]
    async fn test_openai_provider_parses_batch_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "embedding": [1.0, 0.0], "index": 0 },
                    { "embedding": [0.0, 1.0], "index": 1 },
                ],
                "model": "test-model",
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_api_key("test-key")
            .with_base_url(server.uri())
            .with_model("test-model", 2);

        let texts = vec!["chair".to_string(), "table".to_string()];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_openai_provider_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let err = provider.embed("chair").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }
}
