//! Signal colors
//!
//! Colors are assigned by walking unique signal ids in first-seen order and
//! stepping the hue by the golden angle, so consecutive signals land far
//! apart on the color wheel no matter how many there are.

use crate::types::{BitmapError, Result, Signal};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Golden-angle hue increment in degrees
pub const GOLDEN_ANGLE: f64 = 137.50776405003785;

/// Saturation of generated colors (percent)
pub const SATURATION: f64 = 70.0;

/// Lightness of generated colors (percent)
pub const LIGHTNESS: f64 = 60.0;

/// Perceived-luminance threshold on a 0-255 scale
pub const LUMA_THRESHOLD: u32 = 128;

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
}

/// A color either generated in HSL space or parsed from configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// Hue in degrees, saturation and lightness in percent
    Hsl {
        hue: f64,
        saturation: f64,
        lightness: f64,
    },
    Rgb(Rgb),
}

impl Color {
    /// Generated color at a hue with the fixed saturation/lightness
    pub fn from_hue(hue: f64) -> Self {
        Color::Hsl {
            hue,
            saturation: SATURATION,
            lightness: LIGHTNESS,
        }
    }

    /// Convert to 8-bit RGB
    pub fn to_rgb(&self) -> Rgb {
        match *self {
            Color::Rgb(rgb) => rgb,
            Color::Hsl {
                hue,
                saturation,
                lightness,
            } => hsl_to_rgb(hue, saturation / 100.0, lightness / 100.0),
        }
    }
}

impl fmt::Display for Color {
    /// CSS notation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Hsl {
                hue,
                saturation,
                lightness,
            } => write!(f, "hsl({:.2}, {}%, {}%)", hue, saturation, lightness),
            Color::Rgb(rgb) => write!(f, "#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b),
        }
    }
}

impl FromStr for Color {
    type Err = BitmapError;

    /// Parse `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `hsl(h, s%, l%)`
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim().to_ascii_lowercase();
        let invalid = || BitmapError::InvalidColor(s.to_string());

        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex).map(Color::Rgb).ok_or_else(invalid);
        }
        if let Some(args) = function_args(&text, "rgb") {
            let channels = args
                .iter()
                .map(|a| a.parse::<u8>().ok())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            return match channels.as_slice() {
                [r, g, b] => Ok(Color::Rgb(Rgb::new(*r, *g, *b))),
                _ => Err(invalid()),
            };
        }
        if let Some(args) = function_args(&text, "hsl") {
            let parts = args
                .iter()
                .map(|a| a.trim_end_matches('%').parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            return match parts.as_slice() {
                [h, s, l] if (0.0..=100.0).contains(s) && (0.0..=100.0).contains(l) => {
                    Ok(Color::Hsl {
                        hue: h.rem_euclid(360.0),
                        saturation: *s,
                        lightness: *l,
                    })
                }
                _ => Err(invalid()),
            };
        }

        Err(invalid())
    }
}

/// Text color that stays readable on a background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColor {
    Black,
    White,
}

impl TextColor {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextColor::Black => "black",
            TextColor::White => "white",
        }
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// Unique signal id → color, in first-seen order
pub type ColorAssignment = IndexMap<String, Color>;

/// Hue of the i-th unique id
pub fn hue_for(index: usize) -> f64 {
    (index as f64 * GOLDEN_ANGLE) % 360.0
}

/// Assign one color per unique signal id
///
/// Pure: the same id order always yields the same colors.
pub fn assign_colors(signals: &[Signal]) -> ColorAssignment {
    let mut colors = ColorAssignment::new();
    for signal in signals {
        if !colors.contains_key(&signal.id) {
            let color = Color::from_hue(hue_for(colors.len()));
            colors.insert(signal.id.clone(), color);
        }
    }
    colors
}

/// Pick black or white text for a background
///
/// Perceived luminance uses the 0.299/0.587/0.114 luma weights, computed in
/// per-mille integers so the 128 boundary is exact.
pub fn contrast_text(color: &Color) -> TextColor {
    let Rgb { r, g, b } = color.to_rgb();
    let luma_milli = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    if luma_milli >= LUMA_THRESHOLD * 1000 {
        TextColor::Black
    } else {
        TextColor::White
    }
}

/// `s` and `l` in 0..=1, hue in degrees
fn hsl_to_rgb(hue: f64, s: f64, l: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digit = |i: usize| hex.get(i..i + 1).and_then(|d| u8::from_str_radix(d, 16).ok());
    match hex.len() {
        3 => Some(Rgb::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        6 => {
            let byte = |i: usize| hex.get(i..i + 2).and_then(|d| u8::from_str_radix(d, 16).ok());
            Some(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// Comma-separated arguments of `name(...)`
fn function_args<'a>(text: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = text.strip_prefix(name)?.trim_start();
    let inner = inner.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}
