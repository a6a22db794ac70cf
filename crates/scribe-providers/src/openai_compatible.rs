//! Unified OpenAI-compatible embedding provider.
//!
//! A single struct that calls `/embeddings` on any OpenAI-compatible API.
//! Different providers are distinguished only by endpoint URL, auth style, and API key.
//! One call here is one HTTP request; sub-batching lives in `BatchingEmbedder`.

use std::time::Duration;

use async_trait::async_trait;
use scribe_core::config::EmbeddingConfig;
use scribe_core::error::{Result, ScribeError};
use scribe_core::traits::Embedder;
use serde::{Deserialize, Serialize};

use crate::provider_registry::{AuthStyle, ProviderConfig};

/// An embedder that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleEmbedder {
    /// Provider name (e.g., "openai", "ollama").
    name: String,
    /// API key for authentication.
    api_key: String,
    /// Full URL of the embeddings endpoint.
    url: String,
    model: String,
    /// Requested output dimension, if the model supports shortening.
    dimensions: Option<usize>,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl OpenAiCompatibleEmbedder {
    /// Create from a known provider config + EmbeddingConfig.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > registry env vars > empty
    /// - Base URL: `config.endpoint` > env override > registry default
    /// - Model: `config.model` > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &EmbeddingConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .filter_map(|key| std::env::var(key).ok())
                .find(|v| !v.trim().is_empty())
                .unwrap_or_default()
        };

        // Credentials are checked eagerly, before any request is built.
        if registry.auth_style != AuthStyle::None && api_key.trim().is_empty() {
            return Err(ScribeError::MissingCredential(registry.name.to_string()));
        }

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // For OLLAMA_HOST style values, append /v1 if not present
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        let model = if config.model.is_empty() {
            registry.default_model.to_string()
        } else {
            config.model.clone()
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            url: format!("{}{}", base_url, registry.embeddings_path),
            model,
            dimensions: config.dimensions,
            auth_style: registry.auth_style,
            client: build_client(config.timeout_secs)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &EmbeddingConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(ScribeError::InvalidConfiguration(
                "custom embedding provider needs a base URL".into(),
            ));
        }

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            url: format!("{base_url}/embeddings"),
            model: config.model.clone(),
            dimensions: config.dimensions,
            auth_style,
            client: build_client(config.timeout_secs)?,
        })
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    /// One HTTP round trip for `inputs`.
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(ScribeError::MissingCredential(self.name.clone()));
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.dimensions,
        };
        let req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            ScribeError::EmbeddingUnavailable(format!(
                "{} connection failed ({}): {}",
                self.name, self.url, e
            ))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ScribeError::EmbeddingUnavailable(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
            ScribeError::EmbeddingUnavailable(format!("{} returned malformed body: {e}", self.name))
        })?;
        let vectors = parsed.into_ordered(inputs.len())?;
        tracing::debug!("🧮 {} embedded {} inputs", self.name, vectors.len());
        Ok(vectors)
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ScribeError::EmbeddingUnavailable(format!("HTTP client init failed: {e}")))
}

#[async_trait]
impl Embedder for OpenAiCompatibleEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ScribeError::EmbeddingUnavailable(format!("{} returned no embedding", self.name)))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.request(texts).await
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingResponse {
    /// Vectors in input order; a count mismatch or an index outside a clean
    /// `0..n` permutation fails the whole call.
    fn into_ordered(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        self.data.sort_by_key(|entry| entry.index);
        if self.data.len() != expected {
            return Err(ScribeError::EmbeddingUnavailable(format!(
                "provider returned {} embeddings for {} inputs",
                self.data.len(),
                expected
            )));
        }
        if let Some((position, entry)) = self.data.iter().enumerate().find(|(i, e)| e.index != *i) {
            return Err(ScribeError::EmbeddingUnavailable(format!(
                "provider returned index {} at position {position}; indices must cover 0..{expected}",
                entry.index
            )));
        }
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static KEYED: ProviderConfig = ProviderConfig {
        name: "keyed",
        base_url: "http://127.0.0.1:9/v1",
        embeddings_path: "/embeddings",
        env_keys: &["SCRIBE_TEST_UNSET_EMBEDDING_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
        default_model: "keyed-small",
    };

    static LOCAL: ProviderConfig = ProviderConfig {
        name: "local",
        base_url: "http://127.0.0.1:9/v1",
        embeddings_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: None,
        default_model: "local-small",
    };

    #[test]
    fn test_missing_credential_is_eager() {
        let config = EmbeddingConfig::default();
        let err = OpenAiCompatibleEmbedder::from_registry(&KEYED, &config).err().unwrap();
        assert!(matches!(err, ScribeError::MissingCredential(ref p) if p == "keyed"));
    }

    #[test]
    fn test_config_key_and_endpoint_override() {
        let config = EmbeddingConfig {
            api_key: "sk-test".into(),
            endpoint: "http://example.test/v1/".into(),
            model: String::new(),
            ..Default::default()
        };
        let embedder = OpenAiCompatibleEmbedder::from_registry(&KEYED, &config).unwrap();
        assert_eq!(embedder.url, "http://example.test/v1/embeddings");
        assert_eq!(embedder.model(), "keyed-small");
        assert_eq!(embedder.name(), "keyed");
    }

    #[test]
    fn test_custom_endpoint() {
        let config = EmbeddingConfig {
            api_key: "k".into(),
            ..Default::default()
        };
        let embedder = OpenAiCompatibleEmbedder::custom("custom:http://host:8080/v1/", &config).unwrap();
        assert_eq!(embedder.url, "http://host:8080/v1/embeddings");
        assert_eq!(embedder.auth_style, AuthStyle::Bearer);

        assert!(matches!(
            OpenAiCompatibleEmbedder::custom("custom:", &config),
            Err(ScribeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_response_sorted_by_index() {
        let json = r#"{"data":[
            {"embedding":[0.0,1.0],"index":1},
            {"embedding":[1.0,0.0],"index":0}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        let vectors = parsed.into_ordered(2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_response_count_mismatch_is_unavailable() {
        let json = r#"{"data":[{"embedding":[1.0],"index":0}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed.into_ordered(3),
            Err(ScribeError::EmbeddingUnavailable(_))
        ));
    }

    #[test]
    fn test_response_duplicate_or_gapped_index_is_unavailable() {
        let json = r#"{"data":[{"embedding":[1.0],"index":0},{"embedding":[2.0],"index":0}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed.into_ordered(2), Err(ScribeError::EmbeddingUnavailable(_))));

        let json = r#"{"data":[{"embedding":[1.0],"index":0},{"embedding":[2.0],"index":2}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(parsed.into_ordered(2), Err(ScribeError::EmbeddingUnavailable(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let inputs = vec!["a".to_string(), "b".to_string()];
        let body = EmbeddingRequest {
            model: "m",
            input: &inputs,
            dimensions: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["input"][1], "b");
        assert!(value.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = EmbeddingConfig {
            timeout_secs: 2,
            ..Default::default()
        };
        let embedder = OpenAiCompatibleEmbedder::from_registry(&LOCAL, &config).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ScribeError::EmbeddingUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder =
            OpenAiCompatibleEmbedder::from_registry(&LOCAL, &EmbeddingConfig::default()).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
