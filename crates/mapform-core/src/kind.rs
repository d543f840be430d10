//! Declared geometry types and the capability sets derived from them.
//!
//! A form field declares the geometry type it stores (`Point`,
//! `MultiPolygon`, `Geometry`, ...). Tool visibility, replace/accumulate
//! cardinality and value serialization all key off the closed
//! `GeometryKind` enum and its `capabilities()` mapping.

use crate::error::GeometryError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Shape category independent of single/multi cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Point,
    Line,
    Polygon,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Point, Family::Line, Family::Polygon];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Point => "point",
            Family::Line => "line",
            Family::Polygon => "polygon",
        }
    }
}

/// The geometry type a field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    /// Generic `Geometry`: any type, any number of shapes.
    Generic,
}

/// Boolean capability set derived from a `GeometryKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub accepts_point: bool,
    pub accepts_line: bool,
    pub accepts_polygon: bool,
    pub is_multi: bool,
    pub is_collection_or_generic: bool,
}

impl Capabilities {
    pub fn accepts(&self, family: Family) -> bool {
        match family {
            Family::Point => self.accepts_point,
            Family::Line => self.accepts_line,
            Family::Polygon => self.accepts_polygon,
        }
    }
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 8] = [
        GeometryKind::Point,
        GeometryKind::LineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLineString,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
        GeometryKind::Generic,
    ];

    pub fn capabilities(self) -> Capabilities {
        let single = |family| Capabilities {
            accepts_point: family == Family::Point,
            accepts_line: family == Family::Line,
            accepts_polygon: family == Family::Polygon,
            is_multi: false,
            is_collection_or_generic: false,
        };
        let any = Capabilities {
            accepts_point: true,
            accepts_line: true,
            accepts_polygon: true,
            is_multi: false,
            is_collection_or_generic: true,
        };
        match self {
            GeometryKind::Point => single(Family::Point),
            GeometryKind::LineString => single(Family::Line),
            GeometryKind::Polygon => single(Family::Polygon),
            GeometryKind::MultiPoint => Capabilities {
                is_multi: true,
                ..single(Family::Point)
            },
            GeometryKind::MultiLineString => Capabilities {
                is_multi: true,
                ..single(Family::Line)
            },
            GeometryKind::MultiPolygon => Capabilities {
                is_multi: true,
                ..single(Family::Polygon)
            },
            GeometryKind::GeometryCollection => Capabilities {
                is_multi: true,
                ..any
            },
            GeometryKind::Generic => any,
        }
    }

    /// Family of a single-cardinality kind. `None` for collection/generic.
    pub fn family(self) -> Option<Family> {
        match self {
            GeometryKind::Point | GeometryKind::MultiPoint => Some(Family::Point),
            GeometryKind::LineString | GeometryKind::MultiLineString => Some(Family::Line),
            GeometryKind::Polygon | GeometryKind::MultiPolygon => Some(Family::Polygon),
            GeometryKind::GeometryCollection | GeometryKind::Generic => None,
        }
    }

    /// Single-cardinality fields hold exactly one top-level geometry.
    pub fn is_single(self) -> bool {
        self.family().is_some()
    }

    pub fn accepts(self, family: Family) -> bool {
        self.capabilities().accepts(family)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::Generic => "Geometry",
        }
    }
}

impl FromStr for GeometryKind {
    type Err = GeometryError;

    /// Case-insensitive. Accepts the OGC names plus `Geometry`,
    /// `GeometryField` and `Collection` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();
        let kind = match normalized.as_str() {
            "point" => GeometryKind::Point,
            "linestring" | "line" => GeometryKind::LineString,
            "polygon" => GeometryKind::Polygon,
            "multipoint" => GeometryKind::MultiPoint,
            "multilinestring" | "multiline" => GeometryKind::MultiLineString,
            "multipolygon" => GeometryKind::MultiPolygon,
            "geometrycollection" | "collection" => GeometryKind::GeometryCollection,
            "geometry" | "geometryfield" => GeometryKind::Generic,
            _ => return Err(GeometryError::UnknownType(s.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GeometryKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GeometryKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
