//! Configuration loading and management.
//!
//! [`VaultConfig`] holds every tunable of the ingestion pipeline and the store.
//! It can be built programmatically, loaded from TOML, YAML or JSON, or
//! discovered as `docvault.toml` in the current directory or one of its parents.

use crate::{DocvaultError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for any stage timeout: one day.
pub const MAX_STAGE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Top-level configuration.
///
/// # Example
///
/// ```rust
/// use docvault::core::config::VaultConfig;
///
/// let config = VaultConfig::default();
/// assert_eq!(config.meaningful_text_threshold, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Minimum number of characters of embedded text for a structured document
    /// to skip recognition.
    #[serde(default = "default_threshold")]
    pub meaningful_text_threshold: usize,

    /// Maximum pages rasterized for recognition (None = every page).
    #[serde(default = "default_max_recognition_pages")]
    pub max_recognition_pages: Option<usize>,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub rendering: PageRenderOptions,

    #[serde(default)]
    pub timeouts: StageTimeouts,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Recognition engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Language code (e.g., "eng", "deu")
    #[serde(default = "default_eng")]
    pub language: String,

    /// Directory holding `<language>.traineddata` (None = search the usual locations)
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,

    /// Page segmentation mode
    #[serde(default = "default_psm")]
    pub psm: i32,
}

/// Page rendering options for rasterization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRenderOptions {
    #[serde(default = "default_target_dpi")]
    pub target_dpi: i32,
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: i32,
    #[serde(default = "default_true")]
    pub auto_adjust_dpi: bool,
    #[serde(default = "default_min_dpi")]
    pub min_dpi: i32,
    #[serde(default = "default_max_dpi")]
    pub max_dpi: i32,
}

/// Per-stage time budgets, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_structured_secs")]
    pub structured_secs: u64,
    #[serde(default = "default_rasterize_secs")]
    pub rasterize_secs: u64,
    #[serde(default = "default_recognition_secs")]
    pub recognition_secs: u64,
}

impl StageTimeouts {
    pub fn structured(&self) -> Duration {
        Duration::from_secs(self.structured_secs)
    }

    pub fn rasterize(&self) -> Duration {
        Duration::from_secs(self.rasterize_secs)
    }

    pub fn recognition(&self) -> Duration {
        Duration::from_secs(self.recognition_secs)
    }
}

/// Location of the persistent store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory (None = `<data dir>/docvault`)
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the store directory, falling back to the platform data directory.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("docvault"))
            .ok_or_else(|| DocvaultError::validation("No platform data directory; set storage.root explicitly"))
    }
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> usize {
    500
}

fn default_max_recognition_pages() -> Option<usize> {
    Some(5)
}

fn default_eng() -> String {
    "eng".to_string()
}

fn default_psm() -> i32 {
    3
}

fn default_target_dpi() -> i32 {
    300
}

fn default_max_image_dimension() -> i32 {
    65536
}

fn default_min_dpi() -> i32 {
    72
}

fn default_max_dpi() -> i32 {
    600
}

fn default_structured_secs() -> u64 {
    120
}

fn default_rasterize_secs() -> u64 {
    120
}

fn default_recognition_secs() -> u64 {
    600
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            meaningful_text_threshold: default_threshold(),
            max_recognition_pages: default_max_recognition_pages(),
            ocr: OcrConfig::default(),
            rendering: PageRenderOptions::default(),
            timeouts: StageTimeouts::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_eng(),
            tessdata_path: None,
            psm: default_psm(),
        }
    }
}

impl Default for PageRenderOptions {
    fn default() -> Self {
        Self {
            target_dpi: default_target_dpi(),
            max_image_dimension: default_max_image_dimension(),
            auto_adjust_dpi: true,
            min_dpi: default_min_dpi(),
            max_dpi: default_max_dpi(),
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            structured_secs: default_structured_secs(),
            rasterize_secs: default_rasterize_secs(),
            recognition_secs: default_recognition_secs(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DocvaultError::Validation` if the file doesn't exist, is invalid
    /// TOML, or fails [`VaultConfig::validate`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DocvaultError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| DocvaultError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DocvaultError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file, picking the format from its extension (TOML by default).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "yaml" || ext == "yml" => Self::from_yaml_file(path),
            Some(ext) if ext == "json" => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Discover `docvault.toml` in the current directory or its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(DocvaultError::Io)?;
        Self::discover_from(&current)
    }

    /// Same as [`VaultConfig::discover`], starting at `start`.
    pub fn discover_from(start: &Path) -> Result<Option<Self>> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join("docvault.toml");
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (stage, secs) in [
            ("structured", self.timeouts.structured_secs),
            ("rasterize", self.timeouts.rasterize_secs),
            ("recognition", self.timeouts.recognition_secs),
        ] {
            if secs == 0 || secs > MAX_STAGE_TIMEOUT_SECS {
                return Err(DocvaultError::validation(format!(
                    "Timeout for stage '{}' must be between 1 and {} seconds, got {}",
                    stage, MAX_STAGE_TIMEOUT_SECS, secs
                )));
            }
        }
        if self.rendering.min_dpi <= 0 || self.rendering.min_dpi > self.rendering.max_dpi {
            return Err(DocvaultError::validation(format!(
                "Invalid DPI range: min_dpi={} max_dpi={}",
                self.rendering.min_dpi, self.rendering.max_dpi
            )));
        }
        if self.max_recognition_pages == Some(0) {
            return Err(DocvaultError::validation("max_recognition_pages must be at least 1"));
        }
        if self.ocr.language.trim().is_empty() {
            return Err(DocvaultError::validation("OCR language must not be empty"));
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocvaultError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
