//! Viewer configuration: JSON file with defaults, overridden by CLI flags.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::heatmap::layout::DEFAULT_MIN_CELL_SIZE;
use crate::heatmap::legend::{MAX_GRADIENT_INTERVALS, MAX_TICKS};
use crate::heatmap::{
    ColorDomain, ColorScale, LayoutOptions, LegendOptions, Margins, RenderOptions, ScaleLimits,
};

pub const DEFAULT_SOURCE_URL: &str = "http://127.0.0.1:5000/api/clustering";
pub const DEFAULT_TOP_N_GENES: usize = 500;
const MAX_LEGEND_PRECISION: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Clustering endpoint used when no file is given.
    pub source_url: String,
    /// Sent as the `top_n_genes` query parameter; `None` leaves it to the service.
    pub top_n_genes: Option<usize>,
    pub color_domain: ColorDomain,
    pub min_cell_size: f32,
    pub margins: Margins,
    /// Gradient sampling step of the legend, in score units.
    pub legend_step: f32,
    pub legend_ticks: usize,
    pub legend_precision: usize,
    pub zoom: ScaleLimits,
    /// Initial window size in logical pixels.
    pub window_size: [f32; 2],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let legend = LegendOptions::default();
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            top_n_genes: Some(DEFAULT_TOP_N_GENES),
            color_domain: ColorDomain::default(),
            min_cell_size: DEFAULT_MIN_CELL_SIZE,
            margins: Margins::default(),
            legend_step: legend.step,
            legend_ticks: legend.tick_count,
            legend_precision: legend.precision,
            zoom: ScaleLimits::default(),
            window_size: [1400.0, 900.0],
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.color_domain;
        if !(d.min.is_finite() && d.max.is_finite()) || d.min >= d.max {
            return Err(ConfigError::Invalid(format!(
                "color_domain must satisfy min < max, got [{}, {}]",
                d.min, d.max
            )));
        }
        if !(self.min_cell_size > 0.0) {
            return Err(ConfigError::Invalid(
                "min_cell_size must be positive".to_string(),
            ));
        }
        let m = self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| !(*v >= 0.0)) {
            return Err(ConfigError::Invalid(
                "margins must be non-negative".to_string(),
            ));
        }
        let min_step = d.span() / MAX_GRADIENT_INTERVALS as f32;
        if !(self.legend_step >= min_step) {
            return Err(ConfigError::Invalid(format!(
                "legend_step must be at least {min_step} for this color domain, got {}",
                self.legend_step
            )));
        }
        if self.legend_ticks > MAX_TICKS {
            return Err(ConfigError::Invalid(format!(
                "legend_ticks must be at most {MAX_TICKS}, got {}",
                self.legend_ticks
            )));
        }
        if self.legend_precision > MAX_LEGEND_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "legend_precision must be at most {MAX_LEGEND_PRECISION}, got {}",
                self.legend_precision
            )));
        }
        let z = self.zoom;
        if !(z.min > 0.0) || z.min > z.max {
            return Err(ConfigError::Invalid(format!(
                "zoom limits must satisfy 0 < min <= max, got [{}, {}]",
                z.min, z.max
            )));
        }
        Ok(())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            layout: LayoutOptions {
                min_cell_size: self.min_cell_size,
                margins: self.margins,
            },
            scale: ColorScale::new(self.color_domain),
            legend: LegendOptions {
                step: self.legend_step,
                tick_count: self.legend_ticks,
                precision: self.legend_precision,
            },
        }
    }
}
