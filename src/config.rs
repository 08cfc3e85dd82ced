use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::compositor::{MaskEncoding, MaskOptions, DEFAULT_LOSSY_QUALITY, DEFAULT_STROKE_WIDTH};

pub const ENDPOINT_ENV: &str = "POLYPROMPT_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub mask: MaskStyleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 120,
            mask: MaskStyleConfig::default(),
        }
    }
}

/// Hex colors as written in `settings.json`. Each one falls back on its own
/// when it does not parse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskStyleConfig {
    pub stroke_color: String,
    pub submission_fill: String,
    pub preview_fill: String,
    pub stroke_width: f32,
    pub encoding: MaskEncoding,
    pub quality: f32,
}

impl Default for MaskStyleConfig {
    fn default() -> Self {
        Self {
            stroke_color: color::to_hex(color::ACCENT),
            submission_fill: color::to_hex(color::TRANSPARENT),
            preview_fill: color::to_hex(color::PREVIEW_FILL),
            stroke_width: DEFAULT_STROKE_WIDTH,
            encoding: MaskEncoding::Lossless,
            quality: DEFAULT_LOSSY_QUALITY,
        }
    }
}

/// Options for both variants. The per-variant fill is picked by the worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskProfiles {
    pub submission: MaskOptions,
    pub preview: MaskOptions,
}

impl MaskStyleConfig {
    pub fn to_profiles(&self) -> MaskProfiles {
        let base = MaskOptions {
            fill_color: None,
            stroke_color: hex_or(&self.stroke_color, "stroke_color", color::ACCENT),
            stroke_width: if self.stroke_width.is_finite() && self.stroke_width >= 0.0 {
                self.stroke_width
            } else {
                log::warn!("invalid mask stroke_width {}, using default", self.stroke_width);
                DEFAULT_STROKE_WIDTH
            },
            encoding: self.encoding,
            quality: self.quality,
        };

        MaskProfiles {
            submission: MaskOptions {
                fill_color: Some(hex_or(
                    &self.submission_fill,
                    "submission_fill",
                    color::TRANSPARENT,
                )),
                ..base
            },
            preview: MaskOptions {
                fill_color: Some(hex_or(&self.preview_fill, "preview_fill", color::PREVIEW_FILL)),
                ..base
            },
        }
    }
}

fn hex_or(value: &str, field: &str, fallback: color::Rgba) -> color::Rgba {
    color::parse_hex(value).unwrap_or_else(|| {
        log::warn!("invalid color {value:?} for mask.{field}, using default");
        fallback
    })
}

impl AppConfig {
    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "polyprompt", "polyprompt")?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// File settings (or defaults), then the environment override.
    pub fn load_or_default() -> Self {
        let mut config = match Self::load() {
            Ok(config) => config,
            Err(err) => {
                log::info!("using default settings: {err:#}");
                let defaults = Self::default();
                if Self::file_path().is_some_and(|path| !path.exists()) {
                    if let Err(err) = defaults.save() {
                        log::warn!("cannot write default settings: {err:#}");
                    }
                }
                defaults
            }
        };
        config.apply_env_override(std::env::var(ENDPOINT_ENV).ok());
        config
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid settings file")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env_override(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|value| !value.trim().is_empty()) {
            log::debug!("endpoint overridden by {ENDPOINT_ENV}");
            self.endpoint = endpoint;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn generate_url(&self) -> String {
        format!("{}/generate", self.endpoint.trim_end_matches('/'))
    }
}
