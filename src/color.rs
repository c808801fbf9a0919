use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::GifProgressError;

/// Straight-alpha RGBA fill color for the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0x00, 0x00, 0x00]),
    ("white", [0xff, 0xff, 0xff]),
    ("red", [0xff, 0x00, 0x00]),
    ("green", [0x00, 0x80, 0x00]),
    ("lime", [0x00, 0xff, 0x00]),
    ("blue", [0x00, 0x00, 0xff]),
    ("yellow", [0xff, 0xff, 0x00]),
    ("orange", [0xff, 0xa5, 0x00]),
    ("purple", [0x80, 0x00, 0x80]),
    ("magenta", [0xff, 0x00, 0xff]),
    ("cyan", [0x00, 0xff, 0xff]),
    ("gray", [0x80, 0x80, 0x80]),
    ("grey", [0x80, 0x80, 0x80]),
    ("pink", [0xff, 0xc0, 0xcb]),
    ("teal", [0x00, 0x80, 0x80]),
    ("navy", [0x00, 0x00, 0x80]),
];

impl BarColor {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for BarColor {
    fn default() -> Self {
        Self::rgb(0xf1, 0x2b, 0x24)
    }
}

impl FromStr for BarColor {
    type Err = GifProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let invalid = || GifProgressError::InvalidColor(s.to_string());

        if let Some((_, [r, g, b])) = NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(spec))
        {
            return Ok(Self::rgb(*r, *g, *b));
        }

        let hex = spec.strip_prefix('#').unwrap_or(spec);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let byte = |pair: &str| u8::from_str_radix(pair, 16).map_err(|_| invalid());
        // #rgb shorthand doubles each nibble
        let nibble = |digit: &str| byte(digit).map(|v| v * 0x11);

        match hex.len() {
            3 | 4 => {
                let a = if hex.len() == 4 { nibble(&hex[3..4])? } else { 255 };
                Ok(Self {
                    r: nibble(&hex[0..1])?,
                    g: nibble(&hex[1..2])?,
                    b: nibble(&hex[2..3])?,
                    a,
                })
            }
            6 | 8 => {
                let a = if hex.len() == 8 { byte(&hex[6..8])? } else { 255 };
                Ok(Self {
                    r: byte(&hex[0..2])?,
                    g: byte(&hex[2..4])?,
                    b: byte(&hex[4..6])?,
                    a,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for BarColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for BarColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BarColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
