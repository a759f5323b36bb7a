use serde::{Deserialize, Serialize};

use crate::geometry::CanvasSize;
use crate::hit::DEFAULT_TOLERANCE_PX;

/// Tunables of the canvas engine. Every field has a default so hosts can
/// supply partial JSON overrides.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub intrinsic_size: CanvasSize,
    /// Arrow hit distance in intrinsic pixels.
    pub hit_tolerance: f64,
    /// Zoom rectangles must exceed this on both axes (intrinsic pixels).
    pub min_zoom_size: f64,
    pub font_size: f64,
    pub stroke_width: f64,
    pub arrowhead_length: f64,
    pub hover_highlight: bool,
    /// Whether the pointer tool is also disabled while the video plays.
    pub gate_pointer_on_playback: bool,
    /// Whether double-click re-opens text while the pointer tool is active.
    pub pointer_reedit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intrinsic_size: CanvasSize::default(),
            hit_tolerance: DEFAULT_TOLERANCE_PX,
            min_zoom_size: 5.0,
            font_size: 24.0,
            stroke_width: 3.0,
            arrowhead_length: 15.0,
            hover_highlight: true,
            gate_pointer_on_playback: false,
            pointer_reedit: true,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON override object on top of the defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Replaces out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.intrinsic_size.is_valid() {
            self.intrinsic_size = defaults.intrinsic_size;
        }
        for (value, fallback) in [
            (&mut self.hit_tolerance, defaults.hit_tolerance),
            (&mut self.min_zoom_size, defaults.min_zoom_size),
            (&mut self.font_size, defaults.font_size),
            (&mut self.stroke_width, defaults.stroke_width),
            (&mut self.arrowhead_length, defaults.arrowhead_length),
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = fallback;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"hitTolerance": 6, "hoverHighlight": false}"#).unwrap();
        assert_eq!(config.hit_tolerance, 6.0);
        assert!(!config.hover_highlight);
        assert_eq!(config.min_zoom_size, 5.0);
        assert_eq!(config.intrinsic_size, CanvasSize::new(1920.0, 1080.0));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = EngineConfig::from_json(
            r#"{"intrinsicSize": {"width": 0, "height": 720}, "fontSize": -3}"#,
        )
        .unwrap();
        assert_eq!(config.intrinsic_size, CanvasSize::default());
        assert_eq!(config.font_size, 24.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{").is_err());
    }
}
