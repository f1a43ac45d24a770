//! Gallery configuration.
//!
//! Handles loading, validating, and merging `gallery.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! feed = "videos.json"      # Local path or http(s) URL of the feed
//!
//! [providers]
//! image_host = "https://img.youtube.com"   # Thumbnails live at <host>/vi/<id>/<variant>
//! embed_host = "https://www.youtube.com"   # Players live at <host>/embed/<id>
//!
//! [probe]
//! # timeout_secs = 10      # Per-probe timeout (omit for none)
//! deadline_secs = 60       # Stop waiting for thumbnails after this long
//!
//! [layout]
//! viewport_width = 1280     # Visible row width used for scroll maths
//! scroll_fraction = 0.7     # Share of the visible width one arrow click scrolls
//! card_width = 280          # Card width in pixels
//! card_gap = 12             # Gap between cards in pixels
//!
//! [colors]
//! background = "#141414"
//! surface = "#1f1f1f"
//! text = "#f5f5f5"
//! accent = "#e50914"
//!
//! [processing]
//! max_processes = 8         # Max parallel probe chains (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Local path or http(s) URL of the feed document.
    pub feed: String,
    /// Image and embed hosts.
    pub providers: ProvidersConfig,
    /// Thumbnail probe transport settings.
    pub probe: ProbeConfig,
    /// Row geometry used by the scroll arrows.
    pub layout: LayoutConfig,
    /// Page colors.
    pub colors: ColorConfig,
    /// Parallel probing settings.
    pub processing: ProcessingConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            feed: crate::feed::DEFAULT_FEED_NAME.to_string(),
            providers: ProvidersConfig::default(),
            probe: ProbeConfig::default(),
            layout: LayoutConfig::default(),
            colors: ColorConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.trim().is_empty() {
            return Err(ConfigError::Validation("feed must not be empty".into()));
        }
        for (key, host) in [
            ("providers.image_host", &self.providers.image_host),
            ("providers.embed_host", &self.providers.embed_host),
        ] {
            if !(host.starts_with("http://") || host.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be an http(s) URL"
                )));
            }
        }
        if !(self.layout.scroll_fraction > 0.0 && self.layout.scroll_fraction <= 1.0) {
            return Err(ConfigError::Validation(
                "layout.scroll_fraction must be in (0, 1]".into(),
            ));
        }
        if self.layout.viewport_width == 0 || self.layout.card_width == 0 {
            return Err(ConfigError::Validation(
                "layout.viewport_width and layout.card_width must be non-zero".into(),
            ));
        }
        if self.probe.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "probe.timeout_secs must be non-zero (omit it for no timeout)".into(),
            ));
        }
        if self.probe.deadline_secs == 0 {
            return Err(ConfigError::Validation(
                "probe.deadline_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// External services the page links to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Host serving thumbnails at `<host>/vi/<id>/<variant>.jpg`.
    pub image_host: String,
    /// Host serving players at `<host>/embed/<id>`.
    pub embed_host: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            image_host: "https://img.youtube.com".to_string(),
            embed_host: "https://www.youtube.com".to_string(),
        }
    }
}

/// Thumbnail probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Per-probe timeout. When absent, probes wait for the transport.
    pub timeout_secs: Option<u64>,
    /// How long a build waits for thumbnails in total. Slots still
    /// unresolved then ship with their fixed fallback.
    pub deadline_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            deadline_secs: 60,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Row geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Visible width of a row, in pixels.
    pub viewport_width: u32,
    /// Share of the visible width one arrow click scrolls.
    pub scroll_fraction: f64,
    /// Card width in pixels.
    pub card_width: u32,
    /// Gap between cards in pixels.
    pub card_gap: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            scroll_fraction: 0.7,
            card_width: 280,
            card_gap: 12,
        }
    }
}

/// Page colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub background: String,
    /// Cards, modal frame, arrows.
    pub surface: String,
    pub text: String,
    /// Play button and focus rings.
    pub accent: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "#141414".to_string(),
            surface: "#1f1f1f".to_string(),
            text: "#f5f5f5".to_string(),
            accent: "#e50914".to_string(),
        }
    }
}

/// Parallel probing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of probe chains in flight at once.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GalleryConfig::default()).expect("default config must serialize")
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gallery.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# video-gal Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Local path or http(s) URL of the feed document.
feed = "videos.json"

# ---------------------------------------------------------------------------
# Providers
# ---------------------------------------------------------------------------
[providers]
# Thumbnails are looked up at <image_host>/vi/<id>/<variant>.jpg unless a
# video sets its own thumbBase.
image_host = "https://img.youtube.com"

# Players are embedded from <embed_host>/embed/<id>?autoplay=1.
embed_host = "https://www.youtube.com"

# ---------------------------------------------------------------------------
# Thumbnail probes
# ---------------------------------------------------------------------------
[probe]
# Per-probe timeout in seconds. Omit to wait as long as the transport does.
# timeout_secs = 10

# Total time a build waits for thumbnails. Probes still running after this
# are abandoned and their cards ship with the fixed hqdefault thumbnail.
deadline_secs = 60

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# Visible row width in pixels.
viewport_width = 1280

# Share of the visible row width one arrow click scrolls.
scroll_fraction = 0.7

# Card width and gap, in pixels.
card_width = 280
card_gap = 12

# ---------------------------------------------------------------------------
# Colors
# ---------------------------------------------------------------------------
[colors]
background = "#141414"
surface = "#1f1f1f"
text = "#f5f5f5"
accent = "#e50914"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum probe chains in flight at once.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 8
"##
}

/// Generate CSS custom properties from color and layout config.
pub fn generate_theme_css(colors: &ColorConfig, layout: &LayoutConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {background};
    --color-surface: {surface};
    --color-text: {text};
    --color-accent: {accent};
    --card-width: {card_width}px;
    --card-gap: {card_gap}px;
}}"#,
        background = colors.background,
        surface = colors.surface,
        text = colors.text,
        accent = colors.accent,
        card_width = layout.card_width,
        card_gap = layout.card_gap,
    )
}
