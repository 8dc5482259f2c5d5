//! BoxEmbeddingProvider -- object-safe dynamic dispatch wrapper for EmbeddingProvider.
//!
//! 1. Define an object-safe `EmbeddingProviderDyn` trait with boxed futures
//! 2. Blanket-impl `EmbeddingProviderDyn` for all `T: EmbeddingProvider`
//! 3. `BoxEmbeddingProvider` wraps `Box<dyn EmbeddingProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use libris_types::error::ProviderError;

use super::provider::EmbeddingProvider;

/// Object-safe version of [`EmbeddingProvider`] with boxed futures.
pub trait EmbeddingProviderDyn: Send + Sync {
    fn generate_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f64>, ProviderError>> + Send + 'a>>;

    fn model_name_dyn(&self) -> &str;
}

impl<T: EmbeddingProvider> EmbeddingProviderDyn for T {
    fn generate_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f64>, ProviderError>> + Send + 'a>> {
        Box::pin(self.generate(text))
    }

    fn model_name_dyn(&self) -> &str {
        self.model_name()
    }
}

/// Type-erased embedding provider for runtime selection from config.
///
/// Since `EmbeddingProvider` uses RPITIT it cannot be a trait object itself;
/// this wrapper delegates to the boxed `EmbeddingProviderDyn` and implements
/// `EmbeddingProvider` again so generic services accept it.
pub struct BoxEmbeddingProvider {
    inner: Box<dyn EmbeddingProviderDyn + Send + Sync>,
}

impl BoxEmbeddingProvider {
    /// Wrap a concrete provider in a type-erased box.
    pub fn new<T: EmbeddingProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }
}

impl EmbeddingProvider for BoxEmbeddingProvider {
    async fn generate(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
        self.inner.generate_boxed(text).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name_dyn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthProvider;

    impl EmbeddingProvider for LengthProvider {
        async fn generate(&self, text: &str) -> Result<Vec<f64>, ProviderError> {
            if text.is_empty() {
                return Err(ProviderError::MalformedResponse("empty".into()));
            }
            Ok(vec![text.len() as f64, 1.0])
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    #[tokio::test]
    async fn test_box_provider_delegates() {
        let boxed = BoxEmbeddingProvider::new(LengthProvider);
        assert_eq!(boxed.model_name(), "length");
        assert_eq!(boxed.generate("abcd").await.unwrap(), vec![4.0, 1.0]);
        assert!(matches!(
            boxed.generate("").await,
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    async fn embed_via<P: EmbeddingProvider>(provider: &P, text: &str) -> Vec<f64> {
        provider.generate(text).await.unwrap()
    }

    #[tokio::test]
    async fn test_box_provider_usable_as_generic_provider_across_tasks() {
        let boxed = std::sync::Arc::new(BoxEmbeddingProvider::new(LengthProvider));
        let text = String::from("spawned");

        let handle = tokio::spawn({
            let boxed = std::sync::Arc::clone(&boxed);
            async move { embed_via(boxed.as_ref(), &text).await }
        });

        assert_eq!(handle.await.unwrap(), vec![7.0, 1.0]);
    }
}
