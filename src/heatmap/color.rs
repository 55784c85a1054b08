//! Diverging red-white-blue color scale for normalized expression scores.

use serde::{Deserialize, Serialize};

/// 8-bit sRGB color, independent of any drawing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Relative luminance on the 0..=255 scale (Rec. 709 weights, no gamma).
    pub fn luminance(self) -> f32 {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32
    }

    fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let mix = |a: u8, b: u8| {
            (a as f32 + (b as f32 - a as f32) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Color for cells without data. Gray, so it never coincides with the ramp.
pub const NO_DATA_COLOR: Rgb = Rgb::new(40, 40, 40);

/// Neutral midpoint of the ramp.
pub const MIDPOINT_COLOR: Rgb = Rgb::from_hex(0xf7f7f7);

/// Midpoint → domain maximum (ColorBrewer RdBu, red half).
const HIGH_RAMP: [Rgb; 6] = [
    MIDPOINT_COLOR,
    Rgb::from_hex(0xfddbc7),
    Rgb::from_hex(0xf4a582),
    Rgb::from_hex(0xd6604d),
    Rgb::from_hex(0xb2182b),
    Rgb::from_hex(0x67001f),
];

/// Midpoint → domain minimum (ColorBrewer RdBu, blue half).
const LOW_RAMP: [Rgb; 6] = [
    MIDPOINT_COLOR,
    Rgb::from_hex(0xd1e5f0),
    Rgb::from_hex(0x92c5de),
    Rgb::from_hex(0x4393c3),
    Rgb::from_hex(0x2166ac),
    Rgb::from_hex(0x053061),
];

/// Fixed clamp range of the color mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorDomain {
    pub min: f32,
    pub max: f32,
}

impl Default for ColorDomain {
    fn default() -> Self {
        Self { min: -2.0, max: 2.0 }
    }
}

impl ColorDomain {
    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }
}

/// Maps scores to colors. Stateless; the same input always yields the same color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorScale {
    domain: ColorDomain,
}

impl ColorScale {
    pub fn new(domain: ColorDomain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> ColorDomain {
        self.domain
    }

    /// Color for a cell. `None` and NaN map to [`NO_DATA_COLOR`].
    pub fn color_for(&self, value: Option<f32>) -> Rgb {
        match value {
            Some(v) if !v.is_nan() => {
                let t = self.signed_position(v);
                if t >= 0.0 {
                    sample_ramp(&HIGH_RAMP, t)
                } else {
                    sample_ramp(&LOW_RAMP, -t)
                }
            }
            _ => NO_DATA_COLOR,
        }
    }

    /// Position of a clamped value relative to the midpoint, in [-1, 1].
    pub fn signed_position(&self, value: f32) -> f32 {
        let half = self.domain.span() / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        ((self.domain.clamp(value) - self.domain.midpoint()) / half).clamp(-1.0, 1.0)
    }
}

fn sample_ramp(ramp: &[Rgb], t: f32) -> Rgb {
    let segments = (ramp.len() - 1) as f32;
    let pos = t.clamp(0.0, 1.0) * segments;
    let i = (pos.floor() as usize).min(ramp.len() - 2);
    ramp[i].lerp(ramp[i + 1], pos - i as f32)
}
