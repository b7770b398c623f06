//! Runtime configuration and data-file loading.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers shared by [`SimConfig`] and the catalog loader.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, checked_f64_to_fixed64, f64_to_fixed64};
use crate::geometry::GridBounds;
use crate::id::InputCode;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A required file was not found.
    #[error("'{base_name}' not found in {dir}")]
    Missing { base_name: String, dir: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Scan a directory for `{base_name}.ron|toml|json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(ConfigError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, ConfigError> {
    find_data_file(dir, base_name)?.ok_or_else(|| ConfigError::Missing {
        base_name: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format).map_err(|detail| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, String> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

// ===========================================================================
// Simulation config
// ===========================================================================

/// Input codes bound to each gesture role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBindings {
    pub place: InputCode,
    pub erase: InputCode,
    pub line_modifier: InputCode,
    pub rect_modifier: InputCode,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            place: InputCode(0),
            erase: InputCode(1),
            line_modifier: InputCode(16),
            rect_modifier: InputCode(17),
        }
    }
}

/// Simulation configuration. Plain `f64` fields are converted to fixed-point
/// once, when the simulation is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    /// Fixed simulation steps per second.
    pub tick_rate: u32,
    /// Upper bound on fixed steps run for one frame.
    pub max_steps_per_frame: u32,
    /// Base drain charged per grid cell.
    pub per_tile_drain: f64,
    /// Stored-energy capacity. Zero disables storage.
    pub energy_capacity: f64,
    /// Stored energy at startup (clamped into `[0, energy_capacity]`).
    pub stored_energy: f64,
    /// Line gestures keep going past blocked cells instead of stopping.
    pub continue_past_blocked_cells: bool,
    pub bindings: InputBindings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            tick_rate: 60,
            max_steps_per_frame: 8,
            per_tile_drain: 0.0,
            energy_capacity: 0.0,
            stored_energy: 0.0,
            continue_past_blocked_cells: false,
            bindings: InputBindings::default(),
        }
    }
}

impl SimConfig {
    /// Highest accepted `tick_rate`.
    pub const MAX_TICK_RATE: u32 = 10_000;
    /// Highest accepted `width * height`.
    pub const MAX_GRID_CELLS: u64 = 1 << 24;

    /// Load from a RON/TOML/JSON file and validate.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: SimConfig = deserialize_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `{base_name}.*` from a directory, falling back to defaults when
    /// no such file exists.
    pub fn from_dir(dir: &Path, base_name: &str) -> Result<Self, ConfigError> {
        match find_data_file(dir, base_name)? {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.bounds().area() > Self::MAX_GRID_CELLS {
            return Err(ConfigError::Invalid(format!(
                "grid {}x{} exceeds {} cells",
                self.width,
                self.height,
                Self::MAX_GRID_CELLS
            )));
        }
        if self.tick_rate == 0 || self.tick_rate > Self::MAX_TICK_RATE {
            return Err(ConfigError::Invalid(format!(
                "tick_rate must be in 1..={}, got {}",
                Self::MAX_TICK_RATE,
                self.tick_rate
            )));
        }
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_steps_per_frame must be positive".into(),
            ));
        }
        for (field, value) in [
            ("per_tile_drain", self.per_tile_drain),
            ("energy_capacity", self.energy_capacity),
            ("stored_energy", self.stored_energy),
        ] {
            if checked_f64_to_fixed64(value).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a finite number within fixed-point range, got {value}"
                )));
            }
        }
        if self.per_tile_drain < 0.0 || self.energy_capacity < 0.0 {
            return Err(ConfigError::Invalid(
                "per_tile_drain and energy_capacity must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.width, self.height)
    }

    /// Seconds per fixed step.
    pub fn tick_seconds(&self) -> Fixed64 {
        let rate = self.tick_rate.clamp(1, Self::MAX_TICK_RATE);
        Fixed64::ONE / Fixed64::from_num(rate)
    }

    pub fn per_tile_drain_fixed(&self) -> Fixed64 {
        f64_to_fixed64(self.per_tile_drain)
    }

    pub fn energy_capacity_fixed(&self) -> Fixed64 {
        f64_to_fixed64(self.energy_capacity)
    }

    pub fn stored_energy_fixed(&self) -> Fixed64 {
        f64_to_fixed64(self.stored_energy)
    }
}
