//! Session state and user intents.
//!
//! [`Studio`] owns everything a front end renders: the wallpaper list, the
//! in-progress status and the wallpaper open in the viewer. It is created
//! empty and dropped with the session. All mutation goes through `&mut self`,
//! so a batch always settles before the next one starts.

use crate::batch::generate_batch;
use crate::config::StudioConfig;
use crate::credential::CredentialGate;
use crate::error::{Result, WallGenError};
use crate::image::{GeneratedImage, ImageSize, ProviderFactory};
use crate::store::{Wallpaper, WallpaperStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Status shown while a fresh batch runs.
pub const GENERATING_MESSAGE: &str = "Imagining...";
/// Status shown while a remix batch runs.
pub const REMIXING_MESSAGE: &str = "Generating remix...";

/// User-facing failure notice. Deliberately carries no error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Every attempt in the batch came back empty.
    GenerationFailed,
    /// Something outside the attempts went wrong.
    Unexpected,
}

impl Notice {
    /// Text shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Self::GenerationFailed => "Couldn't generate any images. Please try again.",
            Self::Unexpected => "Something went wrong. Please try again in a moment.",
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// In-progress flag plus the message to show next to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStatus {
    /// True while a batch is running.
    pub in_progress: bool,
    /// Empty when idle.
    pub message: String,
}

impl GenerationStatus {
    fn running(message: &str) -> Self {
        Self {
            in_progress: true,
            message: message.to_string(),
        }
    }
}

/// Result of a submit or remix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Wallpapers were added, newest first, with these ids.
    Added(Vec<Uuid>),
    /// Nothing was added; show the notice.
    Failed(Notice),
    /// The prompt was blank; nothing happened.
    Ignored,
}

/// One user's wallpaper session.
pub struct Studio {
    gate: CredentialGate,
    factory: Arc<dyn ProviderFactory>,
    config: StudioConfig,
    store: WallpaperStore,
    selected: Option<Uuid>,
    status: watch::Sender<GenerationStatus>,
}

impl Studio {
    /// Creates an empty session.
    pub fn new(gate: CredentialGate, factory: Arc<dyn ProviderFactory>, config: StudioConfig) -> Self {
        let (status, _) = watch::channel(GenerationStatus::default());
        Self {
            gate,
            factory,
            config,
            store: WallpaperStore::new(),
            selected: None,
            status,
        }
    }

    /// The credential gate, for an up-front key check at startup.
    pub fn gate(&self) -> &CredentialGate {
        &self.gate
    }

    /// Session configuration.
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// All wallpapers, newest first.
    pub fn wallpapers(&self) -> &WallpaperStore {
        &self.store
    }

    /// Current generation status.
    pub fn status(&self) -> GenerationStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<GenerationStatus> {
        self.status.subscribe()
    }

    /// The wallpaper open in the viewer.
    pub fn selected(&self) -> Option<&Wallpaper> {
        self.selected.and_then(|id| self.store.get(id))
    }

    /// Generates a fresh batch from `prompt`.
    ///
    /// A blank prompt is ignored. Otherwise the prompt is sent and stored
    /// exactly as given.
    pub async fn submit(&mut self, prompt: &str, size: ImageSize) -> BatchOutcome {
        if prompt.trim().is_empty() {
            return BatchOutcome::Ignored;
        }
        self.run_batch(prompt, size, None).await
    }

    /// Opens a wallpaper in the viewer.
    pub fn select(&mut self, id: Uuid) -> Result<&Wallpaper> {
        let wallpaper = self
            .store
            .get(id)
            .ok_or_else(|| WallGenError::NotFound(id.to_string()))?;
        self.selected = Some(wallpaper.id);
        Ok(wallpaper)
    }

    /// Closes the viewer.
    pub fn close_viewer(&mut self) {
        self.selected = None;
    }

    /// Generates variations of a stored wallpaper.
    ///
    /// Closes the viewer first. Uses the wallpaper's prompt without its
    /// remix marker and always the smallest size tier.
    pub async fn remix(&mut self, id: Uuid) -> Result<BatchOutcome> {
        self.close_viewer();
        let source = self
            .store
            .get(id)
            .ok_or_else(|| WallGenError::NotFound(id.to_string()))?;
        let prompt = source.original_prompt().to_string();
        let reference = source.image.data.clone();

        Ok(self
            .run_batch(&prompt, ImageSize::SMALLEST, Some(reference))
            .await)
    }

    /// Saves a wallpaper to `dir`, or to the configured download directory.
    pub fn download(&self, id: Uuid, dir: Option<&Path>) -> Result<PathBuf> {
        let wallpaper = self
            .store
            .get(id)
            .ok_or_else(|| WallGenError::NotFound(id.to_string()))?;
        wallpaper.download(dir.unwrap_or(&self.config.download_dir))
    }

    async fn run_batch(
        &mut self,
        prompt: &str,
        size: ImageSize,
        reference: Option<Vec<u8>>,
    ) -> BatchOutcome {
        let remixed = reference.is_some();
        let message = if remixed {
            REMIXING_MESSAGE
        } else {
            GENERATING_MESSAGE
        };
        self.status.send_replace(GenerationStatus::running(message));

        let result = self.generate(prompt, size, reference.as_deref()).await;

        self.status.send_replace(GenerationStatus::default());

        match result {
            Ok(images) if images.is_empty() => {
                tracing::error!(prompt, "every attempt in the batch failed");
                BatchOutcome::Failed(Notice::GenerationFailed)
            }
            Ok(images) => {
                let added = self.store.append_batch(images, prompt, remixed);
                BatchOutcome::Added(added.iter().map(|w| w.id).collect())
            }
            Err(e) => {
                tracing::error!("batch generation failed: {e}");
                BatchOutcome::Failed(Notice::Unexpected)
            }
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        size: ImageSize,
        reference: Option<&[u8]>,
    ) -> Result<Vec<GeneratedImage>> {
        // A missing key only shows up as failed attempts.
        match self.gate.ensure_credential().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("no API key selected, trying anyway"),
            Err(e) => tracing::warn!("key selection failed: {e}"),
        }
        generate_batch(self.factory.as_ref(), prompt, size, reference).await
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("gate", &self.gate)
            .field("config", &self.config)
            .field("wallpapers", &self.store.len())
            .field("selected", &self.selected)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
