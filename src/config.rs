//! Picker configuration module.
//!
//! Handles loading, validating, and merging `mediapick.toml`. User files are
//! sparse overlays on top of the stock defaults: override only the values
//! you care about.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [quality]
//! compress = 60              # JPEG quality of the compress branch
//! original_resize = 95       # JPEG quality of the pixel-budget resize
//! clamp = 90                 # JPEG quality of the max width/height clamp
//!
//! [decode]
//! large_image_threshold = 10485760   # Bytes above which decodes are bounded
//! bounded_max_alloc = 268435456      # Allocation cap for bounded decodes
//!
//! [output]
//! dir = ""                   # Empty = <system temp>/mediapick
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::delivery::DeliverySettings;
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "mediapick.toml";

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

/// Picker configuration loaded from `mediapick.toml`.
///
/// All fields have defaults matching the mobile pipelines. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PickerConfig {
    /// JPEG qualities of the three resample steps.
    pub quality: QualityConfig,
    /// Memory-bounded decode settings.
    pub decode: DecodeConfig,
    /// Where generated files are written.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PickerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("quality.compress", self.quality.compress),
            ("quality.original_resize", self.quality.original_resize),
            ("quality.clamp", self.quality.clamp),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Validation(format!("{name} must be 1-100")));
            }
        }
        if self.decode.large_image_threshold == 0 {
            return Err(ConfigError::Validation(
                "decode.large_image_threshold must be non-zero".into(),
            ));
        }
        if self.decode.bounded_max_alloc == 0 {
            return Err(ConfigError::Validation(
                "decode.bounded_max_alloc must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Directory generated files go to.
    pub fn output_dir(&self) -> PathBuf {
        if self.output.dir.is_empty() {
            std::env::temp_dir().join("mediapick")
        } else {
            PathBuf::from(&self.output.dir)
        }
    }

    /// Settings handed to the delivery policy for every image in a batch.
    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            compress_quality: Quality::new(self.quality.compress),
            original_resize_quality: Quality::new(self.quality.original_resize),
            clamp_quality: Quality::new(self.quality.clamp),
            large_image_threshold: self.decode.large_image_threshold,
            output_dir: self.output_dir(),
        }
    }
}

/// JPEG quality per resample step. The three are independent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub compress: u32,
    pub original_resize: u32,
    pub clamp: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            compress: 60,
            original_resize: 95,
            clamp: 90,
        }
    }
}

/// Decode settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Sources larger than this many bytes (or of unknown size) are decoded
    /// under an allocation cap.
    pub large_image_threshold: u64,
    /// Allocation cap in bytes for bounded decodes.
    pub bounded_max_alloc: u64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            large_image_threshold: crate::imaging::LARGE_IMAGE_THRESHOLD_BYTES,
            bounded_max_alloc: crate::imaging::rust_backend::DEFAULT_BOUNDED_MAX_ALLOC,
        }
    }
}

/// Output location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: String,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PickerConfig::default())?)
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
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PickerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PickerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load an explicit config file. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<PickerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Load `mediapick.toml` from `dir`, falling back to stock defaults when the
/// file does not exist.
pub fn load_config(dir: &Path) -> Result<PickerConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return resolve_config(None);
    }
    load_config_file(&config_path)
}

/// Returns a fully-commented stock `mediapick.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mediapick configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# JPEG quality (1 = worst, 100 = best)
# ---------------------------------------------------------------------------
[quality]
# Re-encode quality when the caller did not ask for originals.
compress = 60

# Quality of the pixel-budget resize applied to oversized originals.
original_resize = 95

# Quality of the max width/height clamp.
clamp = 90

# ---------------------------------------------------------------------------
# Decoding
# ---------------------------------------------------------------------------
[decode]
# Sources above this many bytes, or whose size cannot be read, are decoded
# with an allocation cap so a single huge image cannot exhaust memory.
large_image_threshold = 10485760

# Allocation cap in bytes for those bounded decodes.
bounded_max_alloc = 268435456

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory for generated JPEGs. Empty means <system temp>/mediapick.
dir = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_pipeline_qualities() {
        let config = PickerConfig::default();
        assert_eq!(config.quality.compress, 60);
        assert_eq!(config.quality.original_resize, 95);
        assert_eq!(config.quality.clamp, 90);
        assert_eq!(config.decode.large_image_threshold, 10 * 1024 * 1024);
        assert!(config.output.dir.is_empty());
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[quality]
clamp = 80
"##;
        let config: PickerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.quality.clamp, 80);
        assert_eq!(config.quality.compress, 60);
        assert_eq!(config.decode, DecodeConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r##"
[quality]
compres = 50
"##;
        assert!(toml::from_str::<PickerConfig>(toml).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_quality() {
        let mut config = PickerConfig::default();
        config.quality.original_resize = 0;
        assert!(config.validate().is_err());

        let mut config = PickerConfig::default();
        config.quality.compress = 101;
        assert!(config.validate().is_err());

        assert!(PickerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_thresholds() {
        let mut config = PickerConfig::default();
        config.decode.large_image_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = PickerConfig::default();
        config.decode.bounded_max_alloc = 0;
        assert!(config.validate().is_err());

        let mut config = PickerConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_dir_defaults_to_temp() {
        let config = PickerConfig::default();
        assert_eq!(config.output_dir(), std::env::temp_dir().join("mediapick"));

        let mut config = PickerConfig::default();
        config.output.dir = "/var/cache/picks".into();
        assert_eq!(config.output_dir(), PathBuf::from("/var/cache/picks"));
    }

    #[test]
    fn delivery_settings_carry_independent_qualities() {
        let mut config = PickerConfig::default();
        config.quality.clamp = 70;
        let settings = config.delivery_settings();
        assert_eq!(settings.compress_quality.value(), 60);
        assert_eq!(settings.original_resize_quality.value(), 95);
        assert_eq!(settings.clamp_quality.value(), 70);
    }

    // =========================================================================
    // merge / load tests
    // =========================================================================

    #[test]
    fn merge_preserves_unrelated_keys() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[quality]\ncompress = 40\n").unwrap();
        let merged: PickerConfig = merge_toml(base, overlay).try_into().unwrap();
        assert_eq!(merged.quality.compress, 40);
        assert_eq!(merged.quality.original_resize, 95);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, PickerConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[processing]\nmax_processes = 2\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn load_config_validates_merged_result() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[quality]\nclamp = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_file_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load_config_file(&tmp.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: PickerConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PickerConfig::default());
    }

    #[test]
    fn effective_threads_never_exceeds_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(10_000),
        };
        assert_eq!(effective_threads(&config), cores);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let one = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&one), 1);
    }
}
