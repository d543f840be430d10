//! Paint properties of rendered objects.
//!
//! Each object's paint is resolved from four layers, later ones winning:
//! `default`, `current` (the entity on its own detail page), `selected`
//! (the selected list row) and `hover`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// RGBA color, 4 × f32 in [0.0, 1.0]. Serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let digits = hex
            .bytes()
            .map(hex_val)
            .collect::<Option<Vec<u8>>>()?;
        let channels: Vec<u8> = match digits.len() {
            3 => digits.iter().map(|d| d * 17).collect(),
            6 | 8 => digits.chunks(2).map(|p| p[0] << 4 | p[1]).collect(),
            _ => return None,
        };
        let unit = |c: u8| c as f32 / 255.0;
        Some(Self {
            r: unit(channels[0]),
            g: unit(channels[1]),
            b: unit(channels[2]),
            a: channels.get(3).copied().map_or(1.0, unit),
        })
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (byte(self.r), byte(self.g), byte(self.b), byte(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("bad color `{s}`")))
    }
}

/// Partial paint: unset members fall through to the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Paint {
    pub color: Option<Color>,
    /// Stroke width of lines and polygon outlines, in pixels.
    pub weight: Option<f32>,
    /// Circle radius of points, in pixels.
    pub radius: Option<f32>,
    pub opacity: Option<f32>,
}

impl Paint {
    fn merge(&mut self, over: &Paint) {
        if over.color.is_some() {
            self.color = over.color;
        }
        if over.weight.is_some() {
            self.weight = over.weight;
        }
        if over.radius.is_some() {
            self.radius = over.radius;
        }
        if over.opacity.is_some() {
            self.opacity = over.opacity;
        }
    }
}

/// Fully resolved paint handed to the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPaint {
    pub color: Color,
    pub weight: f32,
    pub radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaintStyles {
    pub default: Paint,
    pub current: Paint,
    pub selected: Paint,
    pub hover: Paint,
}

impl Default for PaintStyles {
    fn default() -> Self {
        Self {
            default: Paint {
                color: Some(Color::rgb(0x33, 0x88, 0xFF)),
                weight: Some(2.0),
                radius: Some(5.0),
                opacity: Some(0.6),
            },
            current: Paint {
                color: Some(Color::rgb(0xE6, 0x55, 0x0D)),
                ..Paint::default()
            },
            selected: Paint {
                color: Some(Color::rgb(0xFF, 0xC1, 0x07)),
                weight: Some(3.0),
                ..Paint::default()
            },
            hover: Paint {
                color: Some(Color::rgb(0xDC, 0x35, 0x45)),
                weight: Some(4.0),
                radius: Some(8.0),
                opacity: Some(0.9),
            },
        }
    }
}

impl PaintStyles {
    pub fn resolve(&self, is_current: bool, selected: bool, hovered: bool) -> ResolvedPaint {
        let mut paint = self.default;
        if is_current {
            paint.merge(&self.current);
        }
        if selected {
            paint.merge(&self.selected);
        }
        if hovered {
            paint.merge(&self.hover);
        }
        ResolvedPaint {
            color: paint.color.unwrap_or(Color::rgb(0, 0, 0)),
            weight: paint.weight.unwrap_or(2.0),
            radius: paint.radius.unwrap_or(5.0),
            opacity: paint.opacity.unwrap_or(1.0),
        }
    }
}
