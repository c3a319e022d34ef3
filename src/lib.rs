#![warn(missing_docs)]
//! WallGen - portrait phone wallpapers from a text prompt.
//!
//! Every submission fans out four parallel requests to a Gemini image model,
//! keeps whichever images come back and prepends them to an in-memory list.
//! A stored wallpaper can be viewed, saved to disk, or remixed into four
//! new variations.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallgen::{BatchOutcome, CredentialGate, GeminiProvider, ImageSize, Studio, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> wallgen::Result<()> {
//!     let mut studio = Studio::new(
//!         CredentialGate::unmanaged(),
//!         Arc::new(GeminiProvider::builder()),
//!         StudioConfig::from_env()?,
//!     );
//!
//!     if let BatchOutcome::Added(ids) = studio.submit("rainy city at night", ImageSize::OneK).await {
//!         for id in ids {
//!             studio.download(id, None)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini-image`: Gemini (Google) provider
//! - `cli`: the `wallgen` command-line front end

pub mod batch;
pub mod config;
pub mod credential;
mod error;
pub mod image;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_support;

// Re-export error types at crate root
pub use error::{Result, WallGenError};

pub use batch::{generate_batch, BATCH_SIZE};
pub use config::StudioConfig;
pub use credential::{ApiKeySlot, CredentialGate, KeySelector, NoKeySelector, TerminalKeySelector};
pub use image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProvider, ImageSize,
    ProviderFactory,
};
pub use session::{BatchOutcome, GenerationStatus, Notice, Studio};
pub use store::{Wallpaper, WallpaperStore, REMIX_MARKER};

#[cfg(feature = "gemini-image")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, WallGenError};
    pub use crate::image::{GeneratedImage, ImageProvider, ImageSize, ProviderFactory};
    pub use crate::session::{BatchOutcome, Notice, Studio};
    pub use crate::store::Wallpaper;

    #[cfg(feature = "gemini-image")]
    pub use crate::image::providers::GeminiProvider;
}
