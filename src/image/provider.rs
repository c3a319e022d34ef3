//! Image provider traits.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationRequest};
use async_trait::async_trait;

/// Trait for image generation providers.
///
/// One call yields at most one image.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image from the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}

/// Builds a fresh provider for every batch.
///
/// Credentials are resolved at construction time, so a key selected after
/// startup is picked up by the next batch without restarting.
pub trait ProviderFactory: Send + Sync {
    /// Constructs a provider with the currently active credential.
    fn create(&self) -> Result<Box<dyn ImageProvider>>;
}

impl<F> ProviderFactory for F
where
    F: Fn() -> Result<Box<dyn ImageProvider>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn ImageProvider>> {
        self()
    }
}
