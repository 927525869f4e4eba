//! Color palettes and continuous color scales.
//!
//! This module contains the fixed categorical palettes used for default
//! group coloring and the continuous scales used when the grouping
//! attribute is numeric. Palettes are immutable tables; per-session
//! color assignment lives in the aesthetics manager.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// An sRGB color. Serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GREY: Rgb = Rgb(204, 204, 204);

    /// Format as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parse a `#rrggbb` (or `rrggbb`) hex string.
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    /// Linear interpolation between two colors, `t` in `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * t).round() as u8 };
        Rgb(
            mix(self.0, other.0),
            mix(self.1, other.1),
            mix(self.2, other.2),
        )
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("bad color '{s}'")))
    }
}

/// Categorical palette used for default group colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Palette {
    /// The plotly qualitative default (10 colors).
    #[default]
    Plotly,
    /// ColorBrewer Set1 (8 colors).
    Set1,
    /// The tab10-style palette (8 colors).
    Tab,
}

static PLOTLY: Lazy<Vec<Rgb>> = Lazy::new(|| {
    vec![
        Rgb(0x63, 0x6e, 0xfa),
        Rgb(0xef, 0x55, 0x3b),
        Rgb(0x00, 0xcc, 0x96),
        Rgb(0xab, 0x63, 0xfa),
        Rgb(0xff, 0xa1, 0x5a),
        Rgb(0x19, 0xd3, 0xf3),
        Rgb(0xff, 0x66, 0x92),
        Rgb(0xb6, 0xe8, 0x80),
        Rgb(0xff, 0x97, 0xff),
        Rgb(0xfe, 0xcb, 0x52),
    ]
});

static SET1: Lazy<Vec<Rgb>> = Lazy::new(|| {
    vec![
        Rgb(228, 26, 28),
        Rgb(55, 126, 184),
        Rgb(77, 175, 74),
        Rgb(152, 78, 163),
        Rgb(255, 127, 0),
        Rgb(166, 86, 40),
        Rgb(247, 129, 191),
        Rgb(153, 153, 153),
    ]
});

static TAB: Lazy<Vec<Rgb>> = Lazy::new(|| {
    vec![
        Rgb(31, 119, 180),
        Rgb(255, 127, 14),
        Rgb(44, 160, 44),
        Rgb(214, 39, 40),
        Rgb(148, 103, 189),
        Rgb(140, 86, 75),
        Rgb(227, 119, 194),
        Rgb(127, 127, 127),
    ]
});

impl Palette {
    /// The color table for this palette.
    pub fn colors(&self) -> &'static [Rgb] {
        match self {
            Palette::Plotly => &PLOTLY,
            Palette::Set1 => &SET1,
            Palette::Tab => &TAB,
        }
    }

    /// Color for the `i`-th distinct group value, cycling past the end.
    pub fn color(&self, i: usize) -> Rgb {
        let colors = self.colors();
        colors[i % colors.len()]
    }
}

/// Continuous color scale for numeric grouping attributes.
///
/// Scales are defined by evenly spaced anchor colors; [`ColorScale::sample`]
/// interpolates between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorScale {
    #[default]
    Viridis,
    Plasma,
    Blues,
    Reds,
}

impl ColorScale {
    fn anchors(&self) -> &'static [Rgb] {
        match self {
            ColorScale::Viridis => &[
                Rgb(68, 1, 84),
                Rgb(59, 82, 139),
                Rgb(33, 145, 140),
                Rgb(94, 201, 98),
                Rgb(253, 231, 37),
            ],
            ColorScale::Plasma => &[
                Rgb(13, 8, 135),
                Rgb(126, 3, 168),
                Rgb(204, 71, 120),
                Rgb(248, 149, 64),
                Rgb(240, 249, 33),
            ],
            ColorScale::Blues => &[Rgb(247, 251, 255), Rgb(107, 174, 214), Rgb(8, 48, 107)],
            ColorScale::Reds => &[Rgb(255, 245, 240), Rgb(251, 106, 74), Rgb(103, 0, 13)],
        }
    }

    /// Sample the scale at `t` in `[0, 1]`. Out-of-range values clamp.
    pub fn sample(&self, t: f64) -> Rgb {
        let anchors = self.anchors();
        let t = t.clamp(0.0, 1.0);
        if anchors.len() == 1 {
            return anchors[0];
        }
        let scaled = t * (anchors.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(anchors.len() - 1);
        anchors[lo].lerp(anchors[hi], scaled - lo as f64)
    }
}
