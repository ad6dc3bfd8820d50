//! Configuration module.
//!
//! Handles loading, validating, and merging `kielo.toml`. Stock defaults are
//! overridden by the user's file, which is in turn overridden by CLI flags.
//!
//! ## Config File Location
//!
//! `kielo.toml` in the working directory, or any path passed with `--config`.
//! The file is optional; without it every stage runs on stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generation]
//! count = 10                            # Words per topic
//! text_model = "gemini-2.5-flash"       # Word lists
//! grammar_model = "gemini-2.5-flash"    # Grammar verification
//! image_model = "gemini-2.5-flash-image"
//! caption_model = "gemini-2.5-flash"
//!
//! [layout]
//! font_size = 48        # Base font size F in pixels
//! padding = 40          # Side padding and vertical gap between blocks
//! min_font_size = 12    # Auto-scale floor
//! font_step = 2         # Auto-scale decrement
//! line_spacing = 1.2    # Multiplier on the font's natural line height
//!
//! [canvas]
//! width = 720
//! height = 1440
//! margin = 40           # Illustration inset from the canvas sides
//!
//! [fonts]
//! # regular = "/path/to/Font-Regular.ttf"   # omit to use a system font
//! # bold = "/path/to/Font-Bold.ttf"
//!
//! [paths]
//! words_dir = "scripts"
//! illustrations_dir = "illustrations"
//! output_dir = "illustrations_with_text"
//!
//! [api]
//! api_key_env = "GEMINI_API_KEY"
//! base_url = "https://generativelanguage.googleapis.com/v1beta"
//! timeout_secs = 120
//! max_retries = 3
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename looked up in the working directory.
pub const CONFIG_FILENAME: &str = "kielo.toml";

/// Second-choice variable for the API key when `api.api_key_env` is unset.
const SECONDARY_API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `kielo.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Collaborator models and word count.
    pub generation: GenerationConfig,
    /// Text overlay sizing.
    pub layout: LayoutConfig,
    /// Card canvas geometry.
    pub canvas: CanvasConfig,
    /// TrueType fonts used for measuring and drawing text.
    pub fonts: FontsConfig,
    /// Artifact directories.
    pub paths: PathsConfig,
    /// Collaborator HTTP settings.
    pub api: ApiConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.to_string()));
        if self.generation.count == 0 {
            return fail("generation.count must be at least 1");
        }
        if self.layout.font_size == 0 {
            return fail("layout.font_size must be non-zero");
        }
        if self.layout.min_font_size == 0 || self.layout.min_font_size > self.layout.font_size {
            return fail("layout.min_font_size must be between 1 and layout.font_size");
        }
        if self.layout.font_step == 0 {
            return fail("layout.font_step must be non-zero");
        }
        if !(self.layout.line_spacing.is_finite() && self.layout.line_spacing > 0.0) {
            return fail("layout.line_spacing must be a positive number");
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return fail("canvas.width and canvas.height must be non-zero");
        }
        if self.canvas.margin.saturating_mul(2) >= self.canvas.width.min(self.canvas.height) {
            return fail("canvas.margin must be less than half the shorter canvas side");
        }
        if self.layout.padding.saturating_mul(2) >= self.canvas.width {
            return fail("layout.padding must be less than half of canvas.width");
        }
        if self.api.max_retries == 0 {
            return fail("api.max_retries must be at least 1");
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable, falling
    /// back to `GOOGLE_API_KEY`. Empty values count as unset.
    pub fn api_key(&self) -> Option<String> {
        [self.api.api_key_env.as_str(), SECONDARY_API_KEY_ENV]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

/// Collaborator models and word count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Number of words to request per topic.
    pub count: usize,
    /// Model used to generate word lists.
    pub text_model: String,
    /// Model used for grammar verification.
    pub grammar_model: String,
    /// Model used for illustrations.
    pub image_model: String,
    /// Model used for the social caption.
    pub caption_model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            count: 10,
            text_model: "gemini-2.5-flash".to_string(),
            grammar_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            caption_model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// Text overlay sizing, all in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Base font size F. The word renders at 1.5×F, the translation at 0.75×F.
    pub font_size: u32,
    /// Side padding (max line width is `canvas.width - 2 × padding`) and the
    /// vertical gap between blocks at full scale.
    pub padding: u32,
    /// Floor for example-sentence auto-scaling and the global shrink.
    pub min_font_size: u32,
    /// Auto-scale decrement.
    pub font_step: u32,
    /// Multiplier on the font's natural line height.
    pub line_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 48,
            padding: 40,
            min_font_size: 12,
            font_step: 2,
            line_spacing: 1.2,
        }
    }
}

/// Card canvas geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Inset of the square illustration slot from the canvas sides.
    pub margin: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1440,
            margin: 40,
        }
    }
}

/// Font files. When `regular` is absent a system font is discovered; when
/// only `bold` is absent the regular face doubles as bold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<PathBuf>,
}

/// Artifact directories, relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Word lists and captions.
    pub words_dir: PathBuf,
    /// Illustration canvases and `mapping.json`.
    pub illustrations_dir: PathBuf,
    /// Finished cards.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            words_dir: PathBuf::from("scripts"),
            illustrations_dir: PathBuf::from("illustrations"),
            output_dir: PathBuf::from("illustrations_with_text"),
        }
    }
}

/// Collaborator HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// REST root of the generative-AI service.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Attempts per request, including the first.
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration.
///
/// With an explicit path the file must exist. Without one, `kielo.toml` in
/// `dir` is used when present and stock defaults otherwise.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<Config, ConfigError> {
    let overlay = match explicit {
        Some(path) => Some(read_toml(path)?),
        None => {
            let path = dir.join(CONFIG_FILENAME);
            if path.exists() {
                Some(read_toml(&path)?)
            } else {
                None
            }
        }
    };
    resolve_config(overlay)
}

fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Returns a fully-commented stock `kielo.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Kielo Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
# Command-line flags override values in this file.

# ---------------------------------------------------------------------------
# Generation
# ---------------------------------------------------------------------------
[generation]
# Number of words to request per topic.
count = 10

# Models used for each collaborator call.
text_model = "gemini-2.5-flash"
grammar_model = "gemini-2.5-flash"
image_model = "gemini-2.5-flash-image"
caption_model = "gemini-2.5-flash"

# ---------------------------------------------------------------------------
# Text overlay
# ---------------------------------------------------------------------------
[layout]
# Base font size in pixels. The word is drawn at 1.5x, the translation at
# 0.75x, the example sentences at 1x.
font_size = 48

# Side padding in pixels. Lines never exceed canvas.width - 2 * padding.
# Also the vertical gap between text blocks.
padding = 40

# Example sentences shrink by font_step until they fit on one line, but
# never below min_font_size. When the whole card does not fit, every size
# shrinks together down to this floor.
min_font_size = 12
font_step = 2

# Multiplier on the font's natural line height.
line_spacing = 1.2

# ---------------------------------------------------------------------------
# Canvas
# ---------------------------------------------------------------------------
[canvas]
width = 720
height = 1440

# The square illustration is inset this far from the canvas sides and
# centered vertically.
margin = 40

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
[fonts]
# TrueType/OpenType files. Omit to use a common system font (DejaVu Sans,
# Liberation Sans, Arial). Without bold, the regular face is used for the word.
# regular = "fonts/Inter-Regular.ttf"
# bold = "fonts/Inter-Bold.ttf"

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
words_dir = "scripts"
illustrations_dir = "illustrations"
output_dir = "illustrations_with_text"

# ---------------------------------------------------------------------------
# API
# ---------------------------------------------------------------------------
[api]
# Environment variable holding the API key (GOOGLE_API_KEY is tried next).
# A .env file in the working directory is loaded first.
api_key_env = "GEMINI_API_KEY"
base_url = "https://generativelanguage.googleapis.com/v1beta"
timeout_secs = 120

# Attempts per request; 429 and 5xx responses are retried with backoff.
max_retries = 3
"##
}
