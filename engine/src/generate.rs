//! Description generation for recommendation results.
//!
//! The engine depends only on the [`DescriptionGenerator`] trait; a
//! failing or absent backend degrades to the item's stored description
//! rather than failing the request.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use shopsense_catalog::CatalogItem;

use crate::error::{EngineError, Result};

/// Style instruction prefixed to every generation prompt.
const SYSTEM_STYLE: &str = "Write a concise, vivid, benefit-focused product blurb (45-65 words). \
     Prefer active voice. Start with a hook. Mention material/color if relevant. \
     End with a short use-case. No hashtags. No URLs.";

/// Trait for description generators.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    /// Name of this generator.
    fn name(&self) -> &str;

    /// Generate a short blurb explaining why `item` fits `query`.
    async fn generate(&self, item: &CatalogItem, query: &str) -> Result<String>;

    /// Check if the generator is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Build the generation prompt from item fields and the user query.
pub fn build_prompt(item: &CatalogItem, query: &str) -> String {
    format!(
        "Product: {}\nBrand: {}\nCategory: {}\nMaterial: {}\nColor: {}\nPrice: {}\n\n\
         User query: {query}\n\
         Write a concise, enticing description (<= 70 words) for why this fits.",
        item.title,
        item.brand,
        item.categories.join(" | "),
        item.material,
        item.color,
        item.price.map(|p| p.to_string()).unwrap_or_default(),
    )
}

/// Generator backed by an OpenAI-compatible chat completions API.
pub struct OpenAiGenerator {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model name sent with every request.
    model: String,
}

impl OpenAiGenerator {
    /// Create a generator reading the API key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "gpt-4o-mini".to_string(),
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

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OpenAiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DescriptionGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, item: &CatalogItem, query: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EngineError::Generation("generator not configured".to_string()))?;

        debug!("generating description for item {} with model {}", item.id, self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_STYLE },
                { "role": "user", "content": build_prompt(item, query) },
            ],
            "max_tokens": 120,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::Generation(format!("API error: {error_text}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Generation(e.to_string()))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| EngineError::Generation("no content in response".to_string()))
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_item() -> CatalogItem {
        let mut item = CatalogItem::new("1", "Oak Dining Chair");
        item.brand = "Oakline".to_string();
        item.categories = vec!["Furniture".to_string(), "Chairs".to_string()];
        item.material = "Oak".to_string();
        item.price = Some(2499.0);
        item
    }

    #[test]
    fn test_prompt_includes_item_fields_and_query() {
        let prompt = build_prompt(&sample_item(), "wooden chair");

        assert!(prompt.contains("Product: Oak Dining Chair"));
        assert!(prompt.contains("Brand: Oakline"));
        assert!(prompt.contains("Category: Furniture | Chairs"));
        assert!(prompt.contains("Price: 2499"));
        assert!(prompt.contains("User query: wooden chair"));
    }

    #[test]
    fn test_prompt_empty_price_renders_blank() {
        let mut item = sample_item();
        item.price = None;
        let prompt = build_prompt(&item, "chair");
        assert!(prompt.contains("Price: \n"));
    }

    #[tokio::test]
    async fn test_generator_unconfigured_fails() {
        let generator = OpenAiGenerator {
            api_key: None,
            base_url: "http://localhost:0".to_string(),
            client: reqwest::Client::new(),
            model: "test".to_string(),
        };

        assert!(!generator.is_available());
        let err = generator.generate(&sample_item(), "chair").await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
    }

    #[tokio::test]
    async fn test_generator_parses_chat_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "A sturdy oak chair. " } }
                ]
            })))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let blurb = generator.generate(&sample_item(), "wooden chair").await.unwrap();
        assert_eq!(blurb, "A sturdy oak chair.");
    }

    #[tokio::test]
    async fn test_generator_api_error_surfaces() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let generator = OpenAiGenerator::new()
            .with_api_key("test-key")
            .with_base_url(server.uri());

        let err = generator.generate(&sample_item(), "chair").await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
    }
}
