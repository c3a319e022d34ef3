//! Session configuration.

use crate::error::Result;
use crate::image::ImageSize;
use std::path::PathBuf;

/// Directory downloads go to when none is configured.
pub const DEFAULT_DOWNLOAD_DIR: &str = ".";

/// Settings for a [`Studio`](crate::Studio) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    /// Where `download` writes files unless told otherwise.
    pub download_dir: PathBuf,
    /// Size tier preselected for new submissions.
    pub default_size: ImageSize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            default_size: ImageSize::default(),
        }
    }
}

impl StudioConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `WALLGEN_DOWNLOAD_DIR` and `WALLGEN_SIZE`, keeping defaults for
    /// unset variables. An unparseable size is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = var("WALLGEN_DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                config.download_dir = PathBuf::from(dir);
            }
        }
        if let Some(size) = var("WALLGEN_SIZE") {
            config.default_size = size.parse()?;
        }
        Ok(config)
    }

    /// Sets the download directory.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Sets the default size tier.
    pub fn with_default_size(mut self, size: ImageSize) -> Self {
        self.default_size = size;
        self
    }
}
