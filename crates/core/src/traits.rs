use crate::error::GenerationError;
use crate::models::SamplingOptions;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw generated text, which may be empty.
    async fn generate(
        &self,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T> TextGenerator for Arc<T>
where
    T: TextGenerator + ?Sized,
{
    async fn generate(
        &self,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String, GenerationError> {
        (**self).generate(prompt, options).await
    }
}
