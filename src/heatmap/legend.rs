//! Gradient legend derived from the color domain alone.

use super::color::{ColorDomain, ColorScale, Rgb};

pub const LEGEND_TITLE: &str = "Expression Z-score";
/// Upper bound on gradient intervals, whatever the step.
pub const MAX_GRADIENT_INTERVALS: usize = 10_000;
pub const MAX_TICKS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendOptions {
    /// Spacing between sampled gradient stops, in domain units.
    pub step: f32,
    pub tick_count: usize,
    /// Decimal places of tick labels.
    pub precision: usize,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            step: 0.1,
            tick_count: 5,
            precision: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Fraction of the legend width, in [0, 1].
    pub offset: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    /// Fraction of the legend width, in [0, 1].
    pub position: f32,
    pub value: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: &'static str,
    pub gradient_stops: Vec<GradientStop>,
    pub axis_ticks: Vec<AxisTick>,
}

/// Sample the scale across `domain` and lay out an evenly spaced axis.
pub fn build_legend(domain: ColorDomain, scale: &ColorScale, options: &LegendOptions) -> Legend {
    let span = domain.span();

    let gradient_stops = if span <= 0.0 {
        let color = scale.color_for(Some(domain.min));
        vec![
            GradientStop { offset: 0.0, color },
            GradientStop { offset: 1.0, color },
        ]
    } else {
        let step = if options.step > 0.0 { options.step } else { span };
        // Rounding keeps 4.0 / 0.1 from landing on 39.999...
        let intervals = ((span / step).round() as usize).clamp(1, MAX_GRADIENT_INTERVALS);
        (0..=intervals)
            .map(|i| {
                let offset = i as f32 / intervals as f32;
                GradientStop {
                    offset,
                    color: scale.color_for(Some(domain.min + span * offset)),
                }
            })
            .collect()
    };

    let axis_ticks = if span <= 0.0 || options.tick_count < 2 {
        vec![tick(domain.min, 0.0, options.precision)]
    } else {
        let count = options.tick_count.min(MAX_TICKS);
        let last = (count - 1) as f32;
        (0..count)
            .map(|i| {
                let position = i as f32 / last;
                tick(domain.min + span * position, position, options.precision)
            })
            .collect()
    };

    Legend {
        title: LEGEND_TITLE,
        gradient_stops,
        axis_ticks,
    }
}

fn tick(value: f32, position: f32, precision: usize) -> AxisTick {
    // Avoid printing "-0.0".
    let shown = if value.abs() < 0.5 * 10f32.powi(-(precision as i32)) {
        0.0
    } else {
        value
    };
    AxisTick {
        position,
        value,
        label: format!("{:.*}", precision, shown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_legend_matches_domain() {
        let domain = ColorDomain::default();
        let scale = ColorScale::new(domain);
        let legend = build_legend(domain, &scale, &LegendOptions::default());

        assert_eq!(legend.title, "Expression Z-score");
        assert_eq!(legend.gradient_stops.len(), 41);
        assert_eq!(legend.gradient_stops[0].offset, 0.0);
        assert_eq!(legend.gradient_stops[40].offset, 1.0);
        assert_eq!(legend.gradient_stops[0].color, scale.color_for(Some(-2.0)));
        assert_eq!(legend.gradient_stops[20].color, scale.color_for(Some(0.0)));
        assert_eq!(legend.gradient_stops[40].color, scale.color_for(Some(2.0)));

        let labels: Vec<&str> = legend.axis_ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["-2.0", "-1.0", "0.0", "1.0", "2.0"]);
        let positions: Vec<f32> = legend.axis_ticks.iter().map(|t| t.position).collect();
        assert_eq!(positions, [0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_stops_are_ordered() {
        let domain = ColorDomain { min: -3.0, max: 1.5 };
        let scale = ColorScale::new(domain);
        let legend = build_legend(domain, &scale, &LegendOptions::default());
        assert!(
            legend
                .gradient_stops
                .windows(2)
                .all(|w| w[0].offset < w[1].offset)
        );
        assert!(legend.gradient_stops.iter().all(|s| (0.0..=1.0).contains(&s.offset)));
    }

    #[test]
    fn test_precision_controls_labels() {
        let domain = ColorDomain { min: -1.0, max: 1.0 };
        let options = LegendOptions {
            tick_count: 3,
            precision: 2,
            ..Default::default()
        };
        let legend = build_legend(domain, &ColorScale::new(domain), &options);
        let labels: Vec<&str> = legend.axis_ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["-1.00", "0.00", "1.00"]);
    }

    #[test]
    fn test_tiny_step_and_many_ticks_are_capped() {
        let domain = ColorDomain::default();
        let options = LegendOptions {
            step: 1e-9,
            tick_count: 1_000_000,
            precision: 1,
        };
        let legend = build_legend(domain, &ColorScale::new(domain), &options);
        assert_eq!(legend.gradient_stops.len(), MAX_GRADIENT_INTERVALS + 1);
        assert_eq!(legend.axis_ticks.len(), MAX_TICKS);
        assert_eq!(legend.gradient_stops.last().map(|s| s.offset), Some(1.0));
    }

    #[test]
    fn test_degenerate_domain() {
        let domain = ColorDomain { min: 0.5, max: 0.5 };
        let legend = build_legend(domain, &ColorScale::new(domain), &LegendOptions::default());
        assert_eq!(legend.gradient_stops.len(), 2);
        assert_eq!(legend.axis_ticks.len(), 1);
        assert_eq!(legend.axis_ticks[0].label, "0.5");
    }
}
