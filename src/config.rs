//! Project configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in the
//! project root next to `banners.json` and is entirely optional: stock defaults
//! are the base layer and the user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! data_file = "banners.json"  # Banner data, relative to the project root
//! public_dir = "public"       # Copied verbatim into the build output
//!
//! [fonts]
//! families = ["Roboto"]       # Font families the runtime waits for
//! stylesheet = "https://fonts.googleapis.com/css2?family=Roboto:wght@300;400;700&display=swap"
//! timeout_ms = 3000           # Give up waiting and treat fonts as settled
//!
//! [animation]
//! loop = false                # Restart the default reveal after it finishes
//! loop_pause_ms = 1000        # Pause before restarting
//! settle_ms = 50              # Delay after readiness before measuring text
//! play_delay_ms = 100         # Delay between planning and playing
//!
//! [clean]
//! scope_prefixes = ["data-bf-cid-", "data-astro-cid-"]
//! merge_styles = true
//!
//! [package]
//! zip = true
//! max_bundle_kb = 150         # Warn when a zip exceeds this
//!
//! [serve]
//! port = 3000
//! debounce_ms = 300
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [serve]
//! port = 8080
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
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

/// Project configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Banner data file, relative to the project root.
    pub data_file: String,
    /// Static files copied into the build output (images live under `images/`).
    pub public_dir: String,
    pub fonts: FontsConfig,
    pub animation: AnimationConfig,
    pub clean: CleanConfig,
    pub package: PackageConfig,
    pub serve: ServeConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            data_file: "banners.json".to_string(),
            public_dir: "public".to_string(),
            fonts: FontsConfig::default(),
            animation: AnimationConfig::default(),
            clean: CleanConfig::default(),
            package: PackageConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Validation("data_file must not be empty".into()));
        }
        if self.fonts.families.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "fonts.families must not contain empty names".into(),
            ));
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("serve.port must be non-zero".into()));
        }
        if self.serve.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "serve.debounce_ms must be non-zero".into(),
            ));
        }
        if self.package.max_bundle_kb == 0 {
            return Err(ConfigError::Validation(
                "package.max_bundle_kb must be non-zero".into(),
            ));
        }
        if let Some(bad) = self
            .clean
            .scope_prefixes
            .iter()
            .find(|p| !p.starts_with("data-") || !p.ends_with('-'))
        {
            return Err(ConfigError::Validation(format!(
                "clean.scope_prefixes entry '{bad}' must look like 'data-…-'"
            )));
        }
        Ok(())
    }
}

/// Web font gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    /// Families the runtime waits on. Empty means fonts count as ready at once.
    pub families: Vec<String>,
    /// Stylesheet linked from every page, if any.
    pub stylesheet: Option<String>,
    /// After this many milliseconds fonts are treated as failed (still ready).
    pub timeout_ms: u32,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            families: vec!["Roboto".to_string()],
            stylesheet: Some(
                "https://fonts.googleapis.com/css2?family=Roboto:wght@300;400;700&display=swap"
                    .to_string(),
            ),
            timeout_ms: 3000,
        }
    }
}

/// Defaults for the generated reveal sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    #[serde(rename = "loop")]
    pub looping: bool,
    pub loop_pause_ms: u32,
    pub settle_ms: u32,
    pub play_delay_ms: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            looping: false,
            loop_pause_ms: 1000,
            settle_ms: 50,
            play_delay_ms: 100,
        }
    }
}

/// Post-build cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanConfig {
    /// Attribute prefixes of generator scoping attributes to strip.
    pub scope_prefixes: Vec<String>,
    /// Merge every `<style>` block into one before `</head>`.
    pub merge_styles: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            scope_prefixes: vec!["data-bf-cid-".to_string(), "data-astro-cid-".to_string()],
            merge_styles: true,
        }
    }
}

/// Bundle packaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    pub zip: bool,
    /// Size ceiling most ad networks enforce on the uploaded zip.
    pub max_bundle_kb: u64,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            zip: true,
            max_bundle_kb: 150,
        }
    }
}

/// Dev server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub port: u16,
    pub debounce_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            debounce_ms: 300,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ProjectConfig::default()).expect("default config must serialize")
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

/// Load `config.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ProjectConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ProjectConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the project config: stock defaults with `config.toml` on top.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# banner-forge configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Banner data file, relative to the project root.
data_file = "banners.json"

# Static files copied verbatim into the build output.
# Asset paths like "/images/logo.png" resolve against this directory.
public_dir = "public"

# ---------------------------------------------------------------------------
# Web fonts
# ---------------------------------------------------------------------------
[fonts]
# Families the banner runtime waits for before splitting text into lines.
# Loaded and failed both count as ready. Use [] to skip font gating.
families = ["Roboto"]

# Stylesheet linked from every banner page. Use "" to link none.
stylesheet = "https://fonts.googleapis.com/css2?family=Roboto:wght@300;400;700&display=swap"

# Stop waiting for fonts after this many milliseconds.
timeout_ms = 3000

# ---------------------------------------------------------------------------
# Default reveal animation (banners without an explicit timeline)
# ---------------------------------------------------------------------------
[animation]
loop = false
# Pause after the last reveal before restarting (only when loop = true).
loop_pause_ms = 1000
# Delay after all assets are ready before text is measured.
settle_ms = 50
# Delay between building the timeline and playing it.
play_delay_ms = 100

# ---------------------------------------------------------------------------
# Post-build cleanup
# ---------------------------------------------------------------------------
[clean]
# Generator scoping attributes stripped from tags and CSS selectors.
scope_prefixes = ["data-bf-cid-", "data-astro-cid-"]
# Merge every <style> block into a single one before </head>.
merge_styles = true

# ---------------------------------------------------------------------------
# Packaging
# ---------------------------------------------------------------------------
[package]
# Write <banner>-<WxH>.zip next to each bundle directory.
zip = true
# Warn when a zipped bundle is larger than this (kilobytes).
max_bundle_kb = 150

# ---------------------------------------------------------------------------
# Dev server
# ---------------------------------------------------------------------------
[serve]
port = 3000
# Quiet period after the last file change before rebuilding.
debounce_ms = 300
"##
}
