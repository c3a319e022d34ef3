//! Four-way fan-out of generation requests.
//!
//! The image models return one candidate per call, so a batch is four
//! independent calls issued together. Each attempt settles to an image or
//! to nothing; a failing attempt never takes its siblings down.

use crate::error::Result;
use crate::image::{GeneratedImage, GenerationRequest, ImageProvider, ImageSize, ProviderFactory};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// Number of attempts in one batch.
pub const BATCH_SIZE: usize = 4;

/// Lead-in for the instruction sent alongside a reference image.
pub const REMIX_INSTRUCTION: &str = "Create a variation of this image with the atmosphere: ";

/// Builds the per-attempt request.
///
/// Only the tier varies; the provider always asks for a portrait image.
pub fn build_request(prompt: &str, size: ImageSize, reference: Option<&[u8]>) -> GenerationRequest {
    let request = match reference {
        Some(image) => GenerationRequest::new(format!("{REMIX_INSTRUCTION}{prompt}"))
            .with_reference_image(image.to_vec()),
        None => GenerationRequest::new(prompt),
    };
    request.with_size(size)
}

/// Generates up to [`BATCH_SIZE`] images for one submission.
///
/// A fresh provider is built for every batch so the current credential is
/// used. Returns the successful images in attempt order; failed or empty
/// attempts are dropped. Only failing to build the provider is an error.
pub async fn generate_batch(
    factory: &dyn ProviderFactory,
    prompt: &str,
    size: ImageSize,
    reference: Option<&[u8]>,
) -> Result<Vec<GeneratedImage>> {
    let provider = factory.create()?;
    let request = build_request(prompt, size, reference);
    let start = Instant::now();

    let attempts = (0..BATCH_SIZE).map(|attempt| run_attempt(provider.as_ref(), &request, attempt));
    let images: Vec<GeneratedImage> = join_all(attempts).await.into_iter().flatten().collect();

    tracing::info!(
        provider = provider.name(),
        requested = BATCH_SIZE,
        succeeded = images.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "batch settled"
    );

    Ok(images)
}

async fn run_attempt(
    provider: &dyn ImageProvider,
    request: &GenerationRequest,
    attempt: usize,
) -> Option<GeneratedImage> {
    match AssertUnwindSafe(provider.generate(request))
        .catch_unwind()
        .await
    {
        Ok(Ok(image)) => Some(image),
        Ok(Err(e)) => {
            tracing::warn!(attempt, "single image generation failed: {e}");
            None
        }
        Err(_) => {
            tracing::warn!(attempt, "single image generation panicked");
            None
        }
    }
}
