//! GeoJSON data model.
//!
//! Geometries are a closed, serde-tagged enum mirroring RFC 7946. Features
//! and feature collections carry an optional geometry plus free-form JSON
//! properties; they are decoded by dispatching on the `type` member so a
//! form value may be any of the three top-level shapes.

use crate::error::GeometryError;
use crate::kind::Family;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use smallvec::SmallVec;

/// `[lng, lat]` or `[lng, lat, alt]`.
pub type Position = SmallVec<[f64; 3]>;

/// Build a 2D position.
pub fn pos(lng: f64, lat: f64) -> Position {
    smallvec::smallvec![lng, lat]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPoint { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    pub fn point(lng: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: pos(lng, lat),
        }
    }

    pub fn line(coords: &[(f64, f64)]) -> Self {
        Geometry::LineString {
            coordinates: coords.iter().map(|&(x, y)| pos(x, y)).collect(),
        }
    }

    /// Single-ring polygon; the ring is closed if the caller did not.
    pub fn polygon(coords: &[(f64, f64)]) -> Self {
        let mut ring: Vec<Position> = coords.iter().map(|&(x, y)| pos(x, y)).collect();
        let closing = match (ring.first(), ring.last()) {
            (Some(first), Some(last)) if first != last => Some(first.clone()),
            _ => None,
        };
        ring.extend(closing);
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::LineString { .. } => "LineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Shape family, or `None` for a collection (which may be heterogeneous).
    pub fn family(&self) -> Option<Family> {
        match self {
            Geometry::Point { .. } | Geometry::MultiPoint { .. } => Some(Family::Point),
            Geometry::LineString { .. } | Geometry::MultiLineString { .. } => Some(Family::Line),
            Geometry::Polygon { .. } | Geometry::MultiPolygon { .. } => Some(Family::Polygon),
            Geometry::GeometryCollection { .. } => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Geometry::GeometryCollection { .. })
    }

    /// Coordinate of a point geometry, used to anchor markers and tooltips.
    pub fn point_coordinate(&self) -> Option<&Position> {
        match self {
            Geometry::Point { coordinates } => Some(coordinates),
            _ => None,
        }
    }

    /// Split into single (non-multi) parts of one family.
    /// Collections yield nothing; callers flatten them first.
    pub fn into_parts(self) -> Vec<Geometry> {
        match self {
            Geometry::MultiPoint { coordinates } => coordinates
                .into_iter()
                .map(|coordinates| Geometry::Point { coordinates })
                .collect(),
            Geometry::MultiLineString { coordinates } => coordinates
                .into_iter()
                .map(|coordinates| Geometry::LineString { coordinates })
                .collect(),
            Geometry::MultiPolygon { coordinates } => coordinates
                .into_iter()
                .map(|coordinates| Geometry::Polygon { coordinates })
                .collect(),
            Geometry::GeometryCollection { .. } => Vec::new(),
            single => vec![single],
        }
    }

    /// Wrap same-family geometries into the Multi- form of `family`.
    /// Parts of other families are skipped.
    pub fn multi(family: Family, shapes: impl IntoIterator<Item = Geometry>) -> Geometry {
        let parts = shapes.into_iter().flat_map(Geometry::into_parts);
        match family {
            Family::Point => Geometry::MultiPoint {
                coordinates: parts
                    .filter_map(|g| match g {
                        Geometry::Point { coordinates } => Some(coordinates),
                        _ => None,
                    })
                    .collect(),
            },
            Family::Line => Geometry::MultiLineString {
                coordinates: parts
                    .filter_map(|g| match g {
                        Geometry::LineString { coordinates } => Some(coordinates),
                        _ => None,
                    })
                    .collect(),
            },
            Family::Polygon => Geometry::MultiPolygon {
                coordinates: parts
                    .filter_map(|g| match g {
                        Geometry::Polygon { coordinates } => Some(coordinates),
                        _ => None,
                    })
                    .collect(),
            },
        }
    }

    /// Structural validation: finite ordinates, minimum position counts,
    /// closed rings, non-empty multi parts, no nested collections.
    /// Topology (self-intersection) is not checked.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.validate_at_depth(0)
    }

    fn validate_at_depth(&self, depth: usize) -> Result<(), GeometryError> {
        match self {
            Geometry::Point { coordinates } => validate_position(coordinates),
            Geometry::LineString { coordinates } => validate_line(coordinates),
            Geometry::Polygon { coordinates } => validate_polygon(coordinates),
            Geometry::MultiPoint { coordinates } => {
                non_empty(coordinates)?;
                coordinates.iter().try_for_each(|p| validate_position(p))
            }
            Geometry::MultiLineString { coordinates } => {
                non_empty(coordinates)?;
                coordinates.iter().try_for_each(|l| validate_line(l))
            }
            Geometry::MultiPolygon { coordinates } => {
                non_empty(coordinates)?;
                coordinates.iter().try_for_each(|p| validate_polygon(p))
            }
            Geometry::GeometryCollection { geometries } => {
                if depth > 0 {
                    return Err(GeometryError::NestedCollection);
                }
                non_empty(geometries)?;
                geometries
                    .iter()
                    .try_for_each(|g| g.validate_at_depth(depth + 1))
            }
        }
    }
}

fn non_empty<T>(items: &[T]) -> Result<(), GeometryError> {
    if items.is_empty() {
        Err(GeometryError::Empty)
    } else {
        Ok(())
    }
}

/// A usable `[lng, lat, ..]` position: two or more finite ordinates.
pub fn validate_position(p: &Position) -> Result<(), GeometryError> {
    if p.len() < 2 {
        return Err(GeometryError::TooFewPositions {
            expected: 2,
            found: p.len(),
        });
    }
    if p.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

fn validate_line(coords: &[Position]) -> Result<(), GeometryError> {
    non_empty(coords)?;
    if coords.len() < 2 {
        return Err(GeometryError::TooFewPositions {
            expected: 2,
            found: coords.len(),
        });
    }
    coords.iter().try_for_each(validate_position)
}

fn validate_polygon(rings: &[Vec<Position>]) -> Result<(), GeometryError> {
    non_empty(rings)?;
    for ring in rings {
        if ring.len() < 4 {
            return Err(GeometryError::TooFewPositions {
                expected: 4,
                found: ring.len(),
            });
        }
        ring.iter().try_for_each(validate_position)?;
        let (first, last) = (&ring[0], &ring[ring.len() - 1]);
        if first[..2] != last[..2] {
            return Err(GeometryError::UnclosedRing);
        }
    }
    Ok(())
}

// ─── Features ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn from_geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    /// Look up a property, falling back to the feature `id` member when
    /// `key == "id"` and no such property exists.
    pub fn property_str(&self, key: &str) -> Option<String> {
        let value = self
            .properties
            .get(key)
            .or_else(|| if key == "id" { self.id.as_ref() } else { None })?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = json!({
            "type": "Feature",
            "geometry": self.geometry,
            "properties": Value::Object(self.properties.clone()),
        });
        if let Some(id) = &self.id {
            obj["id"] = id.clone();
        }
        obj
    }

    fn from_object(mut obj: Map<String, Value>) -> Result<Self, GeometryError> {
        let geometry = match obj.remove("geometry") {
            None | Some(Value::Null) => None,
            Some(g) => Some(decode_geometry(g)?),
        };
        let properties = match obj.remove("properties") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Ok(Self {
            id: obj.remove("id"),
            geometry,
            properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn to_value(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_value).collect::<Vec<_>>(),
        })
    }
}

/// Any top-level GeoJSON object a form value or data endpoint may hold.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoValue {
    Geometry(Geometry),
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl GeoValue {
    /// Decode GeoJSON text.
    pub fn parse(text: &str) -> Result<Self, GeometryError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, GeometryError> {
        let Value::Object(mut obj) = value else {
            return Err(GeometryError::Json("expected a GeoJSON object".into()));
        };
        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GeometryError::Json("`type` member is required".into()))?
            .to_string();
        match tag.as_str() {
            "Feature" => Ok(GeoValue::Feature(Feature::from_object(obj)?)),
            "FeatureCollection" => {
                let features = match obj.remove("features") {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(o) => Feature::from_object(o),
                            _ => Err(GeometryError::Json("feature must be an object".into())),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => return Err(GeometryError::Json("`features` must be an array".into())),
                };
                Ok(GeoValue::FeatureCollection(FeatureCollection { features }))
            }
            _ => decode_geometry(Value::Object(obj)).map(GeoValue::Geometry),
        }
    }

    /// Every geometry carried by this value, with collections flattened
    /// one level. Features without geometry contribute nothing.
    pub fn into_geometries(self) -> Vec<Geometry> {
        let flatten = |g: Geometry| match g {
            Geometry::GeometryCollection { geometries } => geometries,
            other => vec![other],
        };
        match self {
            GeoValue::Geometry(g) => flatten(g),
            GeoValue::Feature(f) => f.geometry.map(flatten).unwrap_or_default(),
            GeoValue::FeatureCollection(fc) => fc
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .flat_map(flatten)
                .collect(),
        }
    }
}

const GEOMETRY_TYPES: [&str; 7] = [
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
];

fn decode_geometry(value: Value) -> Result<Geometry, GeometryError> {
    let tag = value.get("type").and_then(Value::as_str).unwrap_or_default();
    if !GEOMETRY_TYPES.contains(&tag) {
        return Err(GeometryError::UnknownType(tag.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_bare_geometry_with_integer_ordinates() {
        let value = GeoValue::parse(r#"{"type":"Point","coordinates":[100,0]}"#).unwrap();
        assert_eq!(value, GeoValue::Geometry(Geometry::point(100.0, 0.0)));
    }

    #[test]
    fn decodes_feature_collection_properties() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 9, "geometry": {"type": "Point", "coordinates": [1, 2]},
                 "properties": {"name": "Bridge"}},
                {"type": "Feature", "geometry": null, "properties": null}
            ]
        }"#;
        let GeoValue::FeatureCollection(fc) = GeoValue::parse(text).unwrap() else {
            panic!("expected FeatureCollection");
        };
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].property_str("id").as_deref(), Some("9"));
        assert_eq!(fc.features[0].property_str("name").as_deref(), Some("Bridge"));
        assert!(fc.features[1].geometry.is_none());
    }

    #[test]
    fn rejects_unknown_geometry_type() {
        let err = GeoValue::parse(r#"{"type":"Circle","coordinates":[1,2]}"#).unwrap_err();
        assert_eq!(err, GeometryError::UnknownType("Circle".into()));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(GeoValue::parse("[1,2]"), Err(GeometryError::Json(_))));
        assert!(matches!(GeoValue::parse("not json"), Err(GeometryError::Json(_))));
    }

    #[test]
    fn validation_catches_malformed_shapes() {
        assert_eq!(
            Geometry::line(&[(0.0, 0.0)]).validate(),
            Err(GeometryError::TooFewPositions {
                expected: 2,
                found: 1
            })
        );
        let open = Geometry::Polygon {
            coordinates: vec![vec![pos(0.0, 0.0), pos(1.0, 0.0), pos(1.0, 1.0), pos(0.0, 1.0)]],
        };
        assert_eq!(open.validate(), Err(GeometryError::UnclosedRing));
        assert_eq!(
            Geometry::point(f64::NAN, 0.0).validate(),
            Err(GeometryError::NonFinite)
        );
        assert_eq!(
            Geometry::MultiPoint {
                coordinates: vec![]
            }
            .validate(),
            Err(GeometryError::Empty)
        );
        let nested = Geometry::GeometryCollection {
            geometries: vec![Geometry::GeometryCollection {
                geometries: vec![Geometry::point(0.0, 0.0)],
            }],
        };
        assert_eq!(nested.validate(), Err(GeometryError::NestedCollection));
    }

    #[test]
    fn polygon_helper_closes_ring() {
        let poly = Geometry::polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert!(poly.validate().is_ok());
    }

    #[test]
    fn multi_wraps_parts_of_one_family() {
        let multi = Geometry::multi(
            Family::Point,
            [
                Geometry::point(1.0, 1.0),
                Geometry::MultiPoint {
                    coordinates: vec![pos(2.0, 2.0), pos(3.0, 3.0)],
                },
                Geometry::line(&[(0.0, 0.0), (1.0, 1.0)]),
            ],
        );
        assert_eq!(
            multi,
            Geometry::MultiPoint {
                coordinates: vec![pos(1.0, 1.0), pos(2.0, 2.0), pos(3.0, 3.0)]
            }
        );
    }

    #[test]
    fn flattens_collections_one_level() {
        let value = GeoValue::Feature(Feature::from_geometry(Geometry::GeometryCollection {
            geometries: vec![Geometry::point(0.0, 0.0), Geometry::line(&[(0.0, 0.0), (1.0, 1.0)])],
        }));
        assert_eq!(value.into_geometries().len(), 2);
    }
}
