use crate::composite::{composite, CompositeStyle};
use crate::config::OverlayConfig;
use crate::error::Result;
use crate::field::ScalarField;
use crate::frame::Frame;
use crate::processing::colormap::{colorize, Palette};
use crate::processing::hotspot::{locate, HotspotLocation};
use crate::processing::normalize::normalize;
use crate::processing::resample::resample;

/// Output of one pipeline run.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub frame: Frame,
    pub hotspot: HotspotLocation,
    /// Range of the resampled field before normalization.
    pub observed_min: f32,
    pub observed_max: f32,
}

/// Resample → normalize → colorize, locate the hotspot, composite.
pub struct Pipeline {
    palette: Palette,
    invert: bool,
    style: CompositeStyle,
}

impl Pipeline {
    pub fn new(palette: Palette, invert: bool, style: CompositeStyle) -> Self {
        Pipeline { palette, invert, style }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Pipeline::new(config.colormap.palette(), config.colormap_invert, config.style.clone())
    }

    /// Overlay `field` onto `frame`. Neither input is modified.
    pub fn render(&self, frame: &Frame, field: &ScalarField) -> Result<Rendered> {
        let (width, height) = frame.dimensions();
        let resampled = resample(field, width, height)?;

        // Colorizing the dense field and scanning the coarse one are independent.
        let ((color_field, observed_min, observed_max), hotspot) = rayon::join(
            || {
                let normalized = normalize(&resampled);
                let color = colorize(&normalized.values, self.invert, &self.palette);
                (color, normalized.observed_min, normalized.observed_max)
            },
            || locate(field),
        );

        let (rows, cols) = field.shape();
        let hotspot = hotspot?.project(rows, cols, width, height);
        let frame = composite(frame, &color_field, &hotspot, &self.style)?;

        Ok(Rendered { frame, hotspot, observed_min, observed_max })
    }
}

/// One-shot render with a pipeline built from `config`.
pub fn render(frame: &Frame, field: &ScalarField, config: &OverlayConfig) -> Result<Rendered> {
    Pipeline::from_config(config).render(frame, field)
}
