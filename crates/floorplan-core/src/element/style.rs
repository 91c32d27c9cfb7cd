//! Stroke and fill styling for elements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color: {0:?}")]
pub struct ColorParseError(pub String);

/// RGBA8 color serialized as a CSS-style hex string (`#rrggbb`, `#rrggbbaa`)
/// or the keyword `transparent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::transparent());
        }

        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(s.to_string()))?;
        if !hex.is_ascii() {
            return Err(ColorParseError(s.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        let short = |idx: usize| {
            u8::from_str_radix(&hex[idx..idx + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| ColorParseError(s.to_string()))
        };

        match hex.len() {
            3 => Ok(Self::rgb(short(0)?, short(1)?, short(2)?)),
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(ColorParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_transparent() {
            f.write_str("transparent")
        } else if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Style properties for elements. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    /// Stroke color.
    pub stroke_color: Color,
    /// Stroke width in world units.
    pub stroke_width: f64,
    /// Fill color (`transparent` = no fill).
    pub fill_color: Color,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    pub opacity: f64,
    /// Optional dash pattern (alternating dash/gap lengths).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_dash: Option<Vec<f64>>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_color: Color::black(),
            stroke_width: 1.0,
            fill_color: Color::transparent(),
            opacity: 1.0,
            line_dash: None,
        }
    }
}

impl Style {
    /// Style applied to newly drawn walls.
    pub fn wall() -> Self {
        Self {
            stroke_width: 10.0,
            fill_color: Color::rgb(0xcc, 0xcc, 0xcc),
            ..Self::default()
        }
    }

    /// Whether the element has a visible fill.
    pub fn has_fill(&self) -> bool {
        !self.fill_color.is_transparent()
    }
}
