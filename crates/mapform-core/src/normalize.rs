//! Normalization between drawn shapes and a field's serialized value.
//!
//! A field keeps its value as an ordered list of *shapes* (one per feature
//! in the drawing store). `serialize_shapes` turns that list into the text
//! written to the backing form input; `parse_field_value` is its inverse
//! and is idempotent with it: `serialize(parse(serialize(s))) == serialize(s)`.

use crate::error::GeometryError;
use crate::kind::GeometryKind;
use crate::model::{Feature, FeatureCollection, GeoValue, Geometry};
use serde::{Deserialize, Serialize};

/// How a collection/generic field writes several heterogeneous shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionEncoding {
    #[default]
    GeometryCollection,
    FeatureCollection,
}

/// Validate a single shape against the declared type and bring it into
/// the form the field stores.
///
/// A Multi- geometry offered to a plain single field (e.g. a MultiPoint for
/// a Point field) keeps only its last part: single fields hold one shape.
pub fn accept_shape(kind: GeometryKind, geometry: Geometry) -> Result<Geometry, GeometryError> {
    geometry.validate()?;
    let Some(family) = geometry.family() else {
        return Err(GeometryError::NestedCollection);
    };
    if !kind.accepts(family) {
        return Err(GeometryError::UnsupportedFamily { kind, family });
    }
    let caps = kind.capabilities();
    if kind.is_single() && !caps.is_multi {
        let mut parts = geometry.into_parts();
        if parts.len() > 1 {
            log::debug!(
                "{kind} field received {} parts, keeping the last",
                parts.len()
            );
        }
        return parts.pop().ok_or(GeometryError::Empty);
    }
    Ok(geometry)
}

/// Shapes held by a decoded value, validated against the declared type.
pub fn shapes_from_value(
    kind: GeometryKind,
    value: GeoValue,
) -> Result<Vec<Geometry>, GeometryError> {
    let mut shapes = value
        .into_geometries()
        .into_iter()
        .map(|g| accept_shape(kind, g))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(family) = kind.family()
        && shapes.len() > 1
    {
        if kind.capabilities().is_multi {
            shapes = vec![Geometry::multi(family, shapes)];
        } else {
            log::debug!("{kind} value holds {} shapes, keeping the last", shapes.len());
            shapes = shapes.pop().into_iter().collect();
        }
    }
    Ok(shapes)
}

/// Parse the text of a backing form input. Blank text is an empty value.
pub fn parse_field_value(kind: GeometryKind, text: &str) -> Result<Vec<Geometry>, GeometryError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    shapes_from_value(kind, GeoValue::parse(text)?)
}

/// Serialized form of `shapes` for a field of `kind`. Empty for no shapes.
pub fn serialize_shapes(
    kind: GeometryKind,
    encoding: CollectionEncoding,
    shapes: &[Geometry],
) -> Result<String, GeometryError> {
    if shapes.is_empty() {
        return Ok(String::new());
    }
    let text = match kind.family() {
        Some(family) if kind.capabilities().is_multi => {
            serde_json::to_string(&Geometry::multi(family, shapes.iter().cloned()))?
        }
        Some(_) => match shapes.last() {
            Some(shape) => serde_json::to_string(shape)?,
            None => String::new(),
        },
        None => match encoding {
            CollectionEncoding::GeometryCollection => {
                serde_json::to_string(&Geometry::GeometryCollection {
                    geometries: shapes.to_vec(),
                })?
            }
            CollectionEncoding::FeatureCollection => FeatureCollection {
                features: shapes.iter().cloned().map(Feature::from_geometry).collect(),
            }
            .to_value()
            .to_string(),
        },
    };
    Ok(text)
}
