use crate::kind::{Family, GeometryKind};
use std::fmt;

/// Why a geometry (or serialized value) was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Text was not JSON, or JSON was not a GeoJSON object.
    Json(String),
    /// Unknown declared type or GeoJSON `type` member.
    UnknownType(String),
    /// Geometry, multi-geometry or collection without any positions.
    Empty,
    /// A position with fewer than two ordinates, or a line/ring too short.
    TooFewPositions { expected: usize, found: usize },
    /// Polygon ring whose first and last positions differ.
    UnclosedRing,
    /// NaN or infinite ordinate.
    NonFinite,
    /// Shape family the field's declared type does not allow.
    UnsupportedFamily { kind: GeometryKind, family: Family },
    /// GeometryCollection nested inside another collection.
    NestedCollection,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::Json(msg) => write!(f, "invalid GeoJSON: {msg}"),
            GeometryError::UnknownType(name) => write!(f, "unknown geometry type `{name}`"),
            GeometryError::Empty => f.write_str("empty geometry"),
            GeometryError::TooFewPositions { expected, found } => {
                write!(f, "expected at least {expected} positions, found {found}")
            }
            GeometryError::UnclosedRing => f.write_str("polygon ring is not closed"),
            GeometryError::NonFinite => f.write_str("coordinate is not a finite number"),
            GeometryError::UnsupportedFamily { kind, family } => {
                write!(f, "{kind} field does not accept {} geometries", family.as_str())
            }
            GeometryError::NestedCollection => f.write_str("nested geometry collection"),
        }
    }
}

impl std::error::Error for GeometryError {}

impl From<serde_json::Error> for GeometryError {
    fn from(e: serde_json::Error) -> Self {
        GeometryError::Json(e.to_string())
    }
}
