//! EmbeddingProvider trait for text-to-vector conversion.
//!
//! The model itself is external; implementations (Ollama, OpenAI-compatible
//! servers) live in libris-infra and own their timeouts.

use libris_types::error::ProviderError;

/// Trait for converting one text into one embedding vector.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// Every failure (transport, timeout, bad status, malformed body) is a
    /// `ProviderError` so callers can isolate it per item.
    fn generate(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f64>, ProviderError>> + Send;

    /// The model name used for embeddings (e.g., "nomic-embed-text").
    fn model_name(&self) -> &str;
}
