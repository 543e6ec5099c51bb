//! Rating-system constants. Every formula constant the calculator uses lives
//! here; historical constant sets survive only as named presets, never as
//! copy-pasted formulas.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("k must be a positive finite number, got {0}")]
    InvalidK(f64),
    #[error("scale must be a positive finite number, got {0}")]
    InvalidScale(f64),
    #[error("default rating must be finite, got {0}")]
    InvalidDefaultRating(f64),
    #[error("unknown preset '{0}', expected one of: live, classic, legacy, gentle")]
    UnknownPreset(String),
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Unparsable {
        path: String,
        source: json5::Error,
    },
}

/// Tunable constants of the team-Elo model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    /// Delta scale: one game moves the team delta by at most `k`.
    pub k: f64,
    /// Logistic scale of the expected-score curve. Larger values flatten the
    /// curve, making upsets cheaper.
    pub scale: f64,
    /// Rating assigned on a player's first appearance.
    pub default_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self::preset("live").unwrap()
    }
}

impl EloConfig {
    /// Named historical constant sets the deployment has run with.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            // The deployed live-updater constants.
            "live" => Ok(Self { k: 32.0, scale: 300.0, default_rating: 1000.0 }),
            // Classical Elo sensitivity regime.
            "classic" => Ok(Self { k: 32.0, scale: 400.0, default_rating: 1000.0 }),
            // The original 100-point rating scale.
            "legacy" => Ok(Self { k: 32.0, scale: 1000.0, default_rating: 100.0 }),
            "gentle" => Ok(Self { k: 15.0, scale: 1000.0, default_rating: 100.0 }),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Reads a config file. json5 rather than plain JSON so that comments and
    /// bare infinities in hand-written configs parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = json5::from_str(&text).map_err(|source| ConfigError::Unparsable {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects unusable constants. Runs before any event is processed; a bad
    /// constant set must never reach the calculator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.k.is_finite() || self.k <= 0.0 {
            return Err(ConfigError::InvalidK(self.k));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        if !self.default_rating.is_finite() {
            return Err(ConfigError::InvalidDefaultRating(self.default_rating));
        }
        Ok(())
    }
}
