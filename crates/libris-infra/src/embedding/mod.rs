//! HTTP embedding providers and runtime provider selection.

pub mod ollama;
pub mod openai_compat;

use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;

use libris_core::embedding::box_provider::BoxEmbeddingProvider;
use libris_types::config::{EmbeddingConfig, ProviderKind};
use libris_types::error::ProviderError;

use self::ollama::OllamaProvider;
use self::openai_compat::OpenAiCompatProvider;

/// Build the provider named by `config.provider`.
///
/// The OpenAI-compatible provider reads its API key from the environment
/// variable named by `config.api_key_env`. A missing key is allowed for
/// local servers that do not authenticate.
pub fn build_provider(config: &EmbeddingConfig) -> anyhow::Result<BoxEmbeddingProvider> {
    let provider = match config.provider {
        ProviderKind::Ollama => {
            let provider = OllamaProvider::new(config)
                .context("failed to construct Ollama embedding provider")?;
            BoxEmbeddingProvider::new(provider)
        }
        ProviderKind::Openai => {
            let api_key = std::env::var(&config.api_key_env).ok().map(SecretString::from);
            if api_key.is_none() {
                tracing::warn!(
                    env = %config.api_key_env,
                    "no API key in environment, sending unauthenticated embedding requests"
                );
            }
            let provider = OpenAiCompatProvider::new(config, api_key)
                .context("failed to construct OpenAI-compatible embedding provider")?;
            BoxEmbeddingProvider::new(provider)
        }
    };

    tracing::debug!(
        provider = %config.provider,
        model = %config.model,
        base_url = %config.base_url,
        "embedding provider ready"
    );
    Ok(provider)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Request(err.to_string())
    }
}

/// Map a non-success response to `ProviderError::Status`.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Reject empty vectors and, when a length is configured, wrong lengths.
pub(crate) fn validate_vector(
    vector: Vec<f64>,
    expected: Option<usize>,
) -> Result<Vec<f64>, ProviderError> {
    if vector.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response contained an empty embedding".to_string(),
        ));
    }
    match expected {
        Some(expected) if expected != vector.len() => Err(ProviderError::Dimension {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(vector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_vector() {
        assert!(matches!(
            validate_vector(vec![], None),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            validate_vector(vec![1.0, 2.0], Some(3)),
            Err(ProviderError::Dimension {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(validate_vector(vec![1.0], Some(1)).unwrap(), vec![1.0]);
        assert_eq!(validate_vector(vec![1.0, 2.0], None).unwrap().len(), 2);
    }

    #[test]
    fn test_build_provider_selects_kind() {
        use libris_core::embedding::provider::EmbeddingProvider;

        let config = EmbeddingConfig::default();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "nomic-embed-text");

        let config = EmbeddingConfig {
            provider: ProviderKind::Openai,
            model: "text-embedding-3-small".to_string(),
            api_key_env: "LIBRIS_TEST_UNSET_KEY".to_string(),
            ..EmbeddingConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }
}
