//! OpenAI-compatible embedding provider (`POST {base}/embeddings`).
//!
//! Works against the OpenAI API and the many local servers that mirror it.
//! The API key is held as a [`SecretString`] and only exposed when building
//! the `Authorization` header.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use libris_core::embedding::provider::EmbeddingProvider;
use libris_types::config::EmbeddingConfig;
use libris_types::error::ProviderError;

use super::{check_status, http_client, map_send_error, validate_vector};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f64>,
}

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    dimensions: Option<usize>,
}

impl OpenAiCompatProvider {
    pub fn new(
        config: &EmbeddingConfig,
        api_key: Option<SecretString>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for OpenAiCompatProvider {
    async fn generate(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(map_send_error)?;
        let response = check_status(response).await?;

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        body.data.sort_by_key(|entry| entry.index);

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response contained no embeddings".to_string())
            })?;

        validate_vector(vector, self.dimensions)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use libris_types::config::ProviderKind;

    use crate::test_support::serve;

    fn config(base_url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: ProviderKind::Openai,
            base_url,
            model: "text-embedding-3-small".to_string(),
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_with_bearer_key() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer sk-test" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
                }
                assert_eq!(body["model"], "text-embedding-3-small");
                assert!(body.get("dimensions").is_none());
                (
                    StatusCode::OK,
                    Json(json!({
                        "object": "list",
                        "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2] }],
                        "model": "text-embedding-3-small"
                    })),
                )
            }),
        );
        let base = serve(router).await;
        let provider = OpenAiCompatProvider::new(
            &config(format!("{base}/v1/")),
            Some(SecretString::from("sk-test")),
        )
        .unwrap();

        let vector = provider.generate("search_query: dune").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_status() {
        let router = Router::new().route(
            "/embeddings",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let base = serve(router).await;
        let provider = OpenAiCompatProvider::new(&config(base), None).unwrap();

        let err = provider.generate("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_dimensions_forwarded_and_checked() {
        let router = Router::new().route(
            "/embeddings",
            post(|Json(body): Json<Value>| async move {
                let n = body["dimensions"].as_u64().unwrap_or(0) as usize;
                // Return one component fewer than requested.
                let embedding = vec![0.5; n.saturating_sub(1)];
                Json(json!({ "data": [{ "index": 0, "embedding": embedding }] }))
            }),
        );
        let base = serve(router).await;
        let provider = OpenAiCompatProvider::new(
            &EmbeddingConfig {
                dimensions: Some(4),
                ..config(base)
            },
            None,
        )
        .unwrap();

        let err = provider.generate("hello").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Dimension {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_data_is_malformed() {
        let router = Router::new().route(
            "/embeddings",
            post(|| async { Json(json!({ "data": [] })) }),
        );
        let base = serve(router).await;
        let provider = OpenAiCompatProvider::new(&config(base), None).unwrap();

        let err = provider.generate("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
