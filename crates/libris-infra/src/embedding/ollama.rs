//! Ollama embedding provider (`POST {base}/api/embed`).

use serde::{Deserialize, Serialize};

use libris_core::embedding::provider::EmbeddingProvider;
use libris_types::config::EmbeddingConfig;
use libris_types::error::ProviderError;

use super::{check_status, http_client, map_send_error, validate_vector};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f64>>,
}

/// Embedding provider backed by a local or remote Ollama server.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    async fn generate(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response).await?;
        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let vector = body.embeddings.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedResponse("response contained no embeddings".to_string())
        })?;

        validate_vector(vector, self.dimensions)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
