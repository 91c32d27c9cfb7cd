//! Editor configuration.

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::viewport::{BUTTON_ZOOM_FACTOR, MAX_SCALE, MIN_SCALE, Viewport, WHEEL_ZOOM_FACTOR};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunables for an editor session. Missing fields take their defaults.
///
/// Grid settings are not configured here: every drawing carries its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub wheel_zoom_factor: f64,
    pub button_zoom_factor: f64,
    pub history_limit: usize,
    /// Hit-test tolerance in screen pixels.
    pub hit_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            wheel_zoom_factor: WHEEL_ZOOM_FACTOR,
            button_zoom_factor: BUTTON_ZOOM_FACTOR,
            history_limit: DEFAULT_HISTORY_LIMIT,
            hit_tolerance: 5.0,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "zoom bounds [{}, {}] are not a positive range",
                self.min_scale, self.max_scale
            )));
        }
        if self.wheel_zoom_factor <= 1.0 || self.button_zoom_factor <= 1.0 {
            return Err(ConfigError::Invalid("zoom factors must exceed 1".to_string()));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history limit must be at least 1".to_string()));
        }
        if self.hit_tolerance < 0.0 {
            return Err(ConfigError::Invalid("hit tolerance cannot be negative".to_string()));
        }
        Ok(())
    }

    /// A viewport using these zoom bounds and factors.
    pub fn viewport(&self) -> Viewport {
        Viewport {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            wheel_factor: self.wheel_zoom_factor,
            button_factor: self.button_zoom_factor,
            ..Viewport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.hit_tolerance, 5.0);
        assert_eq!(config.history_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EditorConfig::from_json(r#"{"historyLimit": 20, "wheelZoomFactor": 1.25}"#).unwrap();
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.wheel_zoom_factor, 1.25);
        assert_eq!(config.button_zoom_factor, BUTTON_ZOOM_FACTOR);
        assert_eq!(config.max_scale, MAX_SCALE);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            EditorConfig::from_json(r#"{"minScale": 5, "maxScale": 1}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EditorConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_viewport_uses_bounds() {
        let config = EditorConfig {
            max_scale: 4.0,
            ..EditorConfig::default()
        };
        let mut viewport = config.viewport();
        viewport.zoom_at(kurbo::Point::ZERO, 100.0);
        assert_eq!(viewport.scale, 4.0);
    }
}
