//! In-memory wallpaper list, newest first.

use crate::error::Result;
use crate::image::GeneratedImage;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix marking a wallpaper as a remix of another.
pub const REMIX_MARKER: &str = "Remix: ";

/// A generated wallpaper kept for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallpaper {
    /// Locally generated identifier, unique for the process lifetime.
    pub id: Uuid,
    /// The image itself.
    pub image: GeneratedImage,
    /// Prompt the image came from, with [`REMIX_MARKER`] for remixes.
    pub prompt: String,
    /// When the wallpaper was stored.
    pub created_at: DateTime<Utc>,
}

impl Wallpaper {
    fn new(image: GeneratedImage, prompt: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            prompt,
            created_at: Utc::now(),
        }
    }

    /// True if this wallpaper was produced by a remix.
    pub fn is_remix(&self) -> bool {
        self.prompt.starts_with(REMIX_MARKER)
    }

    /// The prompt without any remix markers.
    pub fn original_prompt(&self) -> &str {
        let mut prompt = self.prompt.as_str();
        while let Some(rest) = prompt.strip_prefix(REMIX_MARKER) {
            prompt = rest;
        }
        prompt
    }

    /// File name used for downloads, e.g. `wallpaper-<id>.png`.
    pub fn file_name(&self) -> String {
        format!("wallpaper-{}.{}", self.id, self.image.format.extension())
    }

    /// Writes the image into `dir` and returns the full path.
    pub fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        self.image.save(&path)?;
        tracing::info!(id = %self.id, path = %path.display(), "wallpaper saved");
        Ok(path)
    }
}

/// Builds the stored prompt for a batch.
pub fn lineage_prompt(prompt: &str, remixed: bool) -> String {
    if remixed {
        format!("{REMIX_MARKER}{prompt}")
    } else {
        prompt.to_string()
    }
}

/// Ordered wallpaper list. New batches go to the front.
///
/// There is no removal: entries live until the store is dropped.
#[derive(Debug, Default)]
pub struct WallpaperStore {
    wallpapers: Vec<Wallpaper>,
}

impl WallpaperStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends a batch as one contiguous run, keeping its order.
    ///
    /// Returns the newly added wallpapers.
    pub fn append_batch(
        &mut self,
        results: Vec<GeneratedImage>,
        prompt: &str,
        remixed: bool,
    ) -> &[Wallpaper] {
        let stored_prompt = lineage_prompt(prompt, remixed);
        let count = results.len();
        let batch = results
            .into_iter()
            .map(|image| Wallpaper::new(image, stored_prompt.clone()));
        self.wallpapers.splice(0..0, batch);
        &self.wallpapers[..count]
    }

    /// Number of stored wallpapers.
    pub fn len(&self) -> usize {
        self.wallpapers.len()
    }

    /// True if nothing has been generated yet.
    pub fn is_empty(&self) -> bool {
        self.wallpapers.is_empty()
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Wallpaper> {
        self.wallpapers.iter()
    }

    /// Looks a wallpaper up by identifier.
    pub fn get(&self, id: Uuid) -> Option<&Wallpaper> {
        self.wallpapers.iter().find(|w| w.id == id)
    }

    /// Looks a wallpaper up by position (0 is newest).
    pub fn get_index(&self, index: usize) -> Option<&Wallpaper> {
        self.wallpapers.get(index)
    }
}
