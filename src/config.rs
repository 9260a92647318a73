//! Configuration file support for planmark.
//!
//! Settings are stored as versioned JSON. Native builds read and write them
//! under the platform config directory.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_DRAW_SIZE, zoom};
use crate::recognition::RecognitionConfig;
use crate::transform::{ViewportDimensions, ViewportTransform};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Install the native logger at `level`.
///
/// Safe to call more than once; later calls only adjust the max level.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(level: LogLevel) {
    let filter = level.to_level_filter();
    if env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init()
        .is_err()
    {
        log::set_max_level(filter);
        log::debug!("Logger already installed, max level set to {}", level.name());
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub drawing: DrawingConfig,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Zoom limits and display density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    #[serde(default = "default_scale")]
    pub default_scale: f64,
    /// Device pixel ratio used when the host does not report one.
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_min_scale() -> f64 {
    zoom::MIN
}

fn default_max_scale() -> f64 {
    zoom::MAX
}

fn default_scale() -> f64 {
    1.0
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            default_scale: default_scale(),
            device_pixel_ratio: default_device_pixel_ratio(),
        }
    }
}

impl ViewerConfig {
    /// Viewport for a canvas of the given size at the configured density.
    /// A density that is not a positive number falls back to 1.
    pub fn viewport_transform(&self, width: f64, height: f64) -> ViewportTransform {
        let dpr = self.device_pixel_ratio;
        let dpr = if dpr.is_finite() && dpr > 0.0 {
            dpr
        } else {
            log::warn!("Ignoring invalid device pixel ratio {}", dpr);
            default_device_pixel_ratio()
        };
        ViewportTransform::new(ViewportDimensions {
            dpr,
            ..ViewportDimensions::new(width, height)
        })
    }
}

/// Drawing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingConfig {
    /// Boxes must be larger than this on both sides, in canvas pixels.
    #[serde(default = "default_min_draw_size")]
    pub min_draw_size: f64,
    /// Grayscale and contrast-stretch regions before recognition.
    #[serde(default = "default_preprocess")]
    pub preprocess: bool,
}

fn default_min_draw_size() -> f64 {
    MIN_DRAW_SIZE
}

fn default_preprocess() -> bool {
    true
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            min_draw_size: default_min_draw_size(),
            preprocess: default_preprocess(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            viewer: ViewerConfig::default(),
            recognition: RecognitionConfig::default(),
            drawing: DrawingConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "planmark-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("planmark").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("planmark")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(&path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
