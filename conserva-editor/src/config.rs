//! Editor session configuration.

use std::time::Duration;

use conserva_core::{Calibration, Unit, DEFAULT_HISTORY_LIMIT};
use conserva_scene::viewport::{MAX_ZOOM, MIN_ZOOM};

/// Default interval between automatic flushes of staged edits.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for an [`Editor`](crate::Editor) session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Maximum entries kept on each of the undo and redo stacks.
    pub history_limit: usize,
    /// How long staged edits may wait before being flushed on `tick`.
    pub flush_interval: Duration,
    /// Unit of the initial calibration.
    pub default_unit: Unit,
    /// Real units per pixel of the initial calibration.
    pub default_scale: f64,
    /// Zoom bounds as `(min, max)`.
    pub zoom_limits: (f64, f64),
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            default_unit: Unit::Px,
            default_scale: 1.0,
            zoom_limits: (MIN_ZOOM, MAX_ZOOM),
        }
    }
}

impl EditorConfig {
    /// Create a configuration from environment variables or defaults.
    ///
    /// Environment variables:
    /// - `CONSERVA_HISTORY_LIMIT`: undo/redo depth (default: 50)
    /// - `CONSERVA_FLUSH_INTERVAL_MS`: staged-edit flush interval (default: 500)
    /// - `CONSERVA_DEFAULT_UNIT`: initial calibration unit (default: px)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let history_limit = lookup("CONSERVA_HISTORY_LIMIT")
            .and_then(|v| v.trim().parse().ok())
            .filter(|&limit: &usize| limit > 0)
            .unwrap_or(defaults.history_limit);
        let flush_interval = lookup("CONSERVA_FLUSH_INTERVAL_MS")
            .and_then(|v| v.trim().parse().ok())
            .map_or(defaults.flush_interval, Duration::from_millis);
        let default_unit = lookup("CONSERVA_DEFAULT_UNIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_unit);
        Self {
            history_limit,
            flush_interval,
            default_unit,
            ..defaults
        }
    }

    /// The initial calibration, or pixels if the configured scale is invalid.
    #[must_use]
    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.default_scale, self.default_unit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring configured calibration");
            Calibration::pixels()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.flush_interval, Duration::from_millis(500));
        assert_eq!(config.calibration(), Calibration::pixels());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("CONSERVA_HISTORY_LIMIT", "10"),
            ("CONSERVA_FLUSH_INTERVAL_MS", "250"),
            ("CONSERVA_DEFAULT_UNIT", "cm"),
        ]));
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.default_unit, Unit::Cm);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("CONSERVA_HISTORY_LIMIT", "0"),
            ("CONSERVA_FLUSH_INTERVAL_MS", "soon"),
            ("CONSERVA_DEFAULT_UNIT", "furlong"),
        ]));
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_invalid_scale_uses_pixels() {
        let config = EditorConfig {
            default_scale: -1.0,
            default_unit: Unit::Mm,
            ..EditorConfig::default()
        };
        assert_eq!(config.calibration(), Calibration::pixels());
    }
}
