/// User settings for the image service
///
/// Stored as JSON next to other per-user config:
/// - Linux: ~/.config/product-editor/settings.json
/// - macOS: ~/Library/Application Support/product-editor/settings.json
/// - Windows: %APPDATA%\product-editor\settings.json
///
/// Environment variables override the file. The API key is only ever read
/// from the environment and never written to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default Gemini REST base URL
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default image-capable model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Connection settings for the remote image service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// REST base URL (no trailing slash needed)
    pub api_base: String,

    /// Model used for both whole-image and region edits
    pub model: String,

    /// Give up on a single request after this many seconds
    /// - Image generation routinely takes 10-30 s
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Settings {
    /// Load settings from disk, then apply environment overrides.
    ///
    /// A missing or unreadable file is not an error: defaults are used.
    pub fn load() -> Self {
        let settings = Self::path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();

        settings.with_overrides(|name| std::env::var(name).ok())
    }

    /// Read one settings file. On first run the defaults are written there
    /// so they can be edited by hand.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let defaults = Self::default();
            if let Err(e) = defaults.save_to(path) {
                tracing::warn!("⚠️  Could not write default settings to {}: {}", path.display(), e);
            }
            return defaults;
        }

        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️  Ignoring invalid settings at {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("⚠️  Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write these settings as pretty JSON, creating the folder if needed
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        tracing::info!("📝 Wrote settings to {}", path.display());
        Ok(())
    }

    /// Where the settings file lives
    pub fn path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("product-editor");
        path.push("settings.json");
        Some(path)
    }

    /// Apply `GEMINI_API_BASE` / `GEMINI_MODEL` from `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(api_base) = non_empty("GEMINI_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.model = model;
        }
        self
    }

    /// API key from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`
    pub fn api_key() -> Option<String> {
        ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    /// Convert to JSON string for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
