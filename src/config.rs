//! Tool configuration module.
//!
//! Handles loading, validating, and merging an optional `imgtool.toml`
//! defaults file. Precedence, lowest to highest:
//!
//! ```text
//! stock defaults  →  config file (--config)  →  command-line flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! suffix = "_edited"        # Inserted before the extension of derived names
//! quality = 85              # Lossy encode quality (1-100)
//!
//! [watermark]
//! opacity = 0.7             # 0 = invisible, 1 = solid
//! replicate = false         # Tile the text across the whole image
//! color = [255, 255, 255]   # Text color as [r, g, b]
//! font = "sans-serif"       # Font family
//! font_size = 12.0          # Points, rendered at 300 DPI
//! # font_file = "fonts/Inter.ttf"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
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

/// Defaults loaded from a config file.
///
/// All fields have sensible defaults; a config file need only specify the
/// values it wants to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Output naming and encoding.
    pub output: OutputConfig,
    /// Watermark appearance.
    pub watermark: WatermarkConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(ConfigError::Validation(
                "watermark.opacity must be between 0 and 1".into(),
            ));
        }
        if !(self.watermark.font_size.is_finite() && self.watermark.font_size > 0.0) {
            return Err(ConfigError::Validation(
                "watermark.font_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub suffix: String,
    pub quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_edited".to_string(),
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub opacity: f64,
    pub replicate: bool,
    pub color: [u8; 3],
    pub font: String,
    pub font_size: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            opacity: 0.7,
            replicate: false,
            color: [255, 255, 255],
            font: "sans-serif".to_string(),
            font_size: 12.0,
            font_file: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ToolConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
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

/// Load config from an explicit file path, or stock defaults when `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            let overlay: toml::Value = toml::from_str(&content)?;
            merge_toml(base, overlay)
        }
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `imgtool.toml`.
///
/// Printed by `--print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# imgtool configuration
# =====================
# Pass with `imgtool --config imgtool.toml ...`. Every key is optional;
# command-line flags override anything set here.

[output]
# Inserted between file stem and extension when no output path is given:
# photo.jpg -> photo_edited.jpg
suffix = "_edited"
# Lossy encode quality, 1 (smallest) to 100 (best). Ignored by lossless formats.
quality = 85

[watermark]
# 0.0 = invisible, 1.0 = fully opaque.
opacity = 0.7
# Repeat the text across the whole image instead of stamping it once
# in the top-left corner.
replicate = false
# Text color as [red, green, blue].
color = [255, 255, 255]
# Font family; falls back to any installed sans-serif face.
font = "sans-serif"
# Size in points. Text is rasterized at 300 DPI, so 12pt is 50px tall.
font_size = 12.0
# Extra font file to load (TTF/OTF/TTC).
# font_file = "fonts/Inter.ttf"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ToolConfig::default();
        assert_eq!(config.output.suffix, "_edited");
        assert_eq!(config.output.quality, 85);
        assert_eq!(config.watermark.opacity, 0.7);
        assert_eq!(config.watermark.color, [255, 255, 255]);
        assert!(!config.watermark.replicate);
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: ToolConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config: ToolConfig = toml::from_str(
            r#"
[watermark]
opacity = 0.3
"#,
        )
        .unwrap();
        assert_eq!(config.watermark.opacity, 0.3);
        // Defaults preserved
        assert_eq!(config.watermark.font, "sans-serif");
        assert_eq!(config.output.quality, 85);
    }

    #[test]
    fn load_config_without_file_is_default() {
        assert_eq!(load_config(None).unwrap(), ToolConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgtool.toml");
        fs::write(
            &path,
            r#"
[output]
suffix = "_web"
quality = 70

[watermark]
replicate = true
color = [0, 0, 0]
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output.suffix, "_web");
        assert_eq!(config.output.quality, 70);
        assert!(config.watermark.replicate);
        assert_eq!(config.watermark.color, [0, 0, 0]);
        assert_eq!(config.watermark.opacity, 0.7);
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgtool.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_out_of_range_quality() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgtool.toml");
        fs::write(&path, "[output]\nquality = 0\n").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_rejects_out_of_range_opacity() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgtool.toml");
        fs::write(&path, "[watermark]\nopacity = 1.5\n").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_nested_tables() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[watermark]\nfont = \"serif\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["watermark"]["font"].as_str(), Some("serif"));
        assert_eq!(merged["watermark"]["opacity"].as_float(), Some(0.7));
        assert_eq!(merged["output"]["suffix"].as_str(), Some("_edited"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[output]\nqualty = 90\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ToolConfig, _> = toml::from_str("[outptu]\nquality = 90\n");
        assert!(result.is_err());
    }
}
