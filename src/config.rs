use std::time::Duration;

use crate::composite::CompositeStyle;
use crate::error::{OverlayError, Result};
use crate::processing::colormap::ColormapKind;

/// Settings for the synchronizer and the pipeline it drives.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    /// Periodic driver cadence.
    pub tick_rate_hz: f64,
    /// Blend weight, hotspot marker and label.
    pub style: CompositeStyle,
    pub colormap: ColormapKind,
    /// Look up `V_MAX - value` instead of `value`.
    pub colormap_invert: bool,
    /// `(rows, cols)` of the thermal sensor grid.
    pub field_shape: (usize, usize),
    /// Skip ticks whose frame and field arrived further apart than this.
    /// `None` disables the check.
    pub max_input_skew: Option<Duration>,
    /// Consecutive shape errors after which the producer is reported as
    /// misconfigured.
    pub persistent_error_threshold: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            tick_rate_hz: 10.0,
            style: CompositeStyle::default(),
            colormap: ColormapKind::Jet,
            colormap_invert: true,
            field_shape: (24, 32),
            max_input_skew: None,
            persistent_error_threshold: 10,
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tick_rate(mut self, hz: f64) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.style.alpha = alpha;
        self
    }

    pub fn with_hotspot_radius(mut self, radius_px: u32) -> Self {
        self.style.marker.radius = radius_px;
        self
    }

    pub fn with_hotspot_stroke_width(mut self, width_px: u32) -> Self {
        self.style.marker.stroke_width = width_px;
        self
    }

    pub fn with_hotspot_color(mut self, color: [u8; 3]) -> Self {
        self.style.marker.color = color;
        self
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.style.label.prefix = prefix.into();
        self
    }

    pub fn with_label_color(mut self, color: [u8; 3]) -> Self {
        self.style.label.color = color;
        self
    }

    pub fn with_label_scale(mut self, scale: u32) -> Self {
        self.style.label.scale = scale;
        self
    }

    pub fn with_colormap(mut self, colormap: ColormapKind) -> Self {
        self.colormap = colormap;
        self
    }

    pub fn with_colormap_invert(mut self, invert: bool) -> Self {
        self.colormap_invert = invert;
        self
    }

    pub fn with_field_shape(mut self, rows: usize, cols: usize) -> Self {
        self.field_shape = (rows, cols);
        self
    }

    pub fn with_max_input_skew(mut self, skew: Duration) -> Self {
        self.max_input_skew = Some(skew);
        self
    }

    pub fn with_persistent_error_threshold(mut self, ticks: u32) -> Self {
        self.persistent_error_threshold = ticks.max(1);
        self
    }

    /// Interval between ticks. Rates rejected by [`validate`](Self::validate)
    /// yield `Duration::MAX`.
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(OverlayError::InvalidConfig(format!(
                "tick rate must be positive, got {}",
                self.tick_rate_hz
            )));
        }
        if Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).is_err() {
            return Err(OverlayError::InvalidConfig(format!(
                "tick rate {} Hz gives a period too long to represent",
                self.tick_rate_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.style.alpha) {
            return Err(OverlayError::InvalidConfig(format!(
                "alpha must be within [0, 1], got {}",
                self.style.alpha
            )));
        }
        if self.style.marker.radius == 0 || self.style.marker.stroke_width == 0 {
            return Err(OverlayError::InvalidConfig(
                "hotspot radius and stroke width must be at least 1 px".to_string(),
            ));
        }
        if self.style.label.scale == 0 {
            return Err(OverlayError::InvalidConfig("label scale must be at least 1".to_string()));
        }
        let (rows, cols) = self.field_shape;
        if rows == 0 || cols == 0 {
            return Err(OverlayError::InvalidConfig(format!(
                "field shape must be non-empty, got {}x{}",
                rows, cols
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        assert_eq!(config.tick_rate_hz, 10.0);
        assert_eq!(config.style.alpha, 0.5);
        assert_eq!(config.style.marker.radius, 10);
        assert_eq!(config.style.marker.stroke_width, 2);
        assert_eq!(config.style.marker.color, [255, 0, 0]);
        assert!(config.colormap_invert);
        assert_eq!(config.max_input_skew, None);
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = OverlayConfig::new()
            .with_alpha(0.3)
            .with_field_shape(8, 8)
            .with_colormap(ColormapKind::Hot)
            .with_colormap_invert(false)
            .with_hotspot_radius(4)
            .with_max_input_skew(Duration::from_millis(250));
        assert_eq!(config.style.alpha, 0.3);
        assert_eq!(config.field_shape, (8, 8));
        assert_eq!(config.colormap, ColormapKind::Hot);
        assert!(!config.colormap_invert);
        assert_eq!(config.style.marker.radius, 4);
        assert_eq!(config.max_input_skew, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(OverlayConfig::new().with_tick_rate(0.0).validate().is_err());
        assert!(OverlayConfig::new().with_tick_rate(f64::NAN).validate().is_err());
        assert!(OverlayConfig::new().with_tick_rate(1e-20).validate().is_err());
        assert_eq!(OverlayConfig::new().with_tick_rate(1e-20).tick_period(), Duration::MAX);
        assert!(OverlayConfig::new().with_alpha(1.5).validate().is_err());
        assert!(OverlayConfig::new().with_alpha(-0.1).validate().is_err());
        assert!(OverlayConfig::new().with_hotspot_radius(0).validate().is_err());
        assert!(OverlayConfig::new().with_label_scale(0).validate().is_err());
        assert!(OverlayConfig::new().with_field_shape(0, 32).validate().is_err());
    }
}
