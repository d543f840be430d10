//! Geometry capture: one field's value, driven by committed draw events.
//!
//! Every `created` / `updated` / `deleted` event goes through the same three
//! steps:
//!
//! 1. validate the shape against the field's declared type,
//! 2. apply cardinality (single fields replace same-family shapes,
//!    collection/generic fields accumulate),
//! 3. serialize the resulting shape list and swap it in together with the
//!    new text, emitting exactly one `WriteField`.
//!
//! A shape that fails step 1 or 3 leaves the previous value untouched and
//! produces a corrective effect instead (`RemoveFeature` / `ResetFeature`).

use crate::event::SurfaceEffect;
use crate::policy::DrawControls;
use mapform_core::{
    CollectionEncoding, FeatureId, FieldId, GeoValue, Geometry, GeometryError, GeometryKind,
    Position, accept_shape, parse_field_value, serialize_shapes,
};
use serde_json::Value;
use std::collections::HashSet;

/// A geometry form field registered on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryField {
    pub id: FieldId,
    pub kind: GeometryKind,
    /// Offer reshape/drag/delete tools.
    pub modifiable: bool,
    /// Serialization of collection/generic values.
    pub encoding: CollectionEncoding,
}

impl GeometryField {
    pub fn new(id: &str, kind: GeometryKind) -> Self {
        Self {
            id: FieldId::intern(id),
            kind,
            modifiable: true,
            encoding: CollectionEncoding::default(),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.modifiable = false;
        self
    }

    pub fn with_encoding(mut self, encoding: CollectionEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Decode the raw GeoJSON the drawing library attaches to an event.
/// A Feature wrapper is unwrapped; several geometries come back as a
/// collection, which no field accepts as a single drawn shape.
pub fn decode_drawn(raw: Value) -> Result<Geometry, GeometryError> {
    let mut geometries = GeoValue::from_value(raw)?.into_geometries();
    match geometries.len() {
        0 => Err(GeometryError::Empty),
        1 => geometries.pop().ok_or(GeometryError::Empty),
        _ => Ok(Geometry::GeometryCollection { geometries }),
    }
}

/// Where the captured-point marker goes for a Point-family shape.
fn marker_anchor(shape: &Geometry) -> Option<Position> {
    match shape {
        Geometry::Point { coordinates } => Some(coordinates.clone()),
        Geometry::MultiPoint { coordinates } => coordinates.first().cloned(),
        _ => None,
    }
}

#[derive(Debug)]
pub struct GeometryCapture {
    field: GeometryField,
    /// Shapes in commit order, keyed by their drawing-store feature.
    shapes: Vec<(FeatureId, Geometry)>,
    markers: HashSet<FeatureId>,
    /// Text last written to the form input.
    value: String,
}

impl GeometryCapture {
    pub fn new(field: GeometryField) -> Self {
        Self {
            field,
            shapes: Vec::new(),
            markers: HashSet::new(),
            value: String::new(),
        }
    }

    pub fn id(&self) -> FieldId {
        self.field.id
    }

    pub fn field(&self) -> &GeometryField {
        &self.field
    }

    pub fn kind(&self) -> GeometryKind {
        self.field.kind
    }

    /// Serialized value, as last written to the form input.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Geometry> {
        self.shapes.iter().map(|(_, g)| g)
    }

    pub fn features(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.shapes.iter().map(|(id, _)| *id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn owns(&self, feature: FeatureId) -> bool {
        self.index_of(feature).is_some()
    }

    pub fn shape(&self, feature: FeatureId) -> Option<&Geometry> {
        self.index_of(feature).map(|i| &self.shapes[i].1)
    }

    pub fn has_marker(&self, feature: FeatureId) -> bool {
        self.markers.contains(&feature)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn controls(&self) -> DrawControls {
        DrawControls::for_field(
            self.field.kind.capabilities(),
            self.field.modifiable,
            !self.shapes.is_empty(),
        )
    }

    fn index_of(&self, feature: FeatureId) -> Option<usize> {
        self.shapes.iter().position(|(id, _)| *id == feature)
    }

    /// Serialize `next`, then swap it in with its text. Nothing changes on error.
    fn commit(&mut self, next: Vec<(FeatureId, Geometry)>) -> Result<SurfaceEffect, GeometryError> {
        let geometries: Vec<Geometry> = next.iter().map(|(_, g)| g.clone()).collect();
        let text = serialize_shapes(self.field.kind, self.field.encoding, &geometries)?;
        self.shapes = next;
        self.value = text.clone();
        Ok(SurfaceEffect::WriteField {
            field: self.field.id,
            value: text,
        })
    }

    fn show_marker(&mut self, feature: FeatureId, shape: &Geometry) -> Option<SurfaceEffect> {
        match marker_anchor(shape) {
            Some(at) => {
                self.markers.insert(feature);
                Some(SurfaceEffect::ShowCaptureMarker { feature, at })
            }
            None if self.markers.remove(&feature) => {
                Some(SurfaceEffect::HideCaptureMarker { feature })
            }
            None => None,
        }
    }

    fn drop_feature(&mut self, feature: FeatureId, effects: &mut Vec<SurfaceEffect>) {
        effects.push(SurfaceEffect::RemoveFeature { feature });
        if self.markers.remove(&feature) {
            effects.push(SurfaceEffect::HideCaptureMarker { feature });
        }
    }

    /// Restore a stored form value: the shapes are placed on the surface
    /// under fresh feature ids. The input is rewritten only when its text
    /// is not already canonical.
    pub fn load(&mut self, text: &str) -> Result<Vec<SurfaceEffect>, GeometryError> {
        let parsed = parse_field_value(self.field.kind, text)?;
        let next: Vec<(FeatureId, Geometry)> = parsed
            .into_iter()
            .map(|g| (FeatureId::restored(self.field.id), g))
            .collect();

        let previous: Vec<FeatureId> = self.features().collect();
        let write = self.commit(next)?;

        let mut effects = Vec::new();
        for feature in previous {
            self.drop_feature(feature, &mut effects);
        }
        let restored = self.shapes.clone();
        for (feature, shape) in restored {
            let marker = self.show_marker(feature, &shape);
            effects.push(SurfaceEffect::AddFeature {
                feature,
                geometry: shape,
            });
            effects.extend(marker);
        }
        if self.value != text.trim() {
            effects.push(write);
        }
        log::debug!("field {}: restored {} shape(s)", self.field.id, self.shapes.len());
        Ok(effects)
    }

    /// A new shape was committed by the drawing library.
    pub fn created(&mut self, feature: FeatureId, geometry: Geometry) -> Vec<SurfaceEffect> {
        let shape = match accept_shape(self.field.kind, geometry) {
            Ok(shape) => shape,
            Err(e) => {
                log::warn!("field {}: discarding drawn shape {feature:?}: {e}", self.field.id);
                return vec![SurfaceEffect::RemoveFeature { feature }];
            }
        };
        if let Some(index) = self.index_of(feature) {
            // Library re-announced a shape it already gave us.
            return self.replace_shape(index, shape);
        }

        let family = shape.family();
        let mut replaced = Vec::new();
        let mut next = self.shapes.clone();
        if self.field.kind.is_single() {
            next.retain(|(id, g)| {
                let same_family = g.family() == family;
                if same_family {
                    replaced.push(*id);
                }
                !same_family
            });
        }
        next.push((feature, shape.clone()));

        let write = match self.commit(next) {
            Ok(write) => write,
            Err(e) => {
                log::warn!("field {}: cannot serialize value: {e}", self.field.id);
                return vec![SurfaceEffect::RemoveFeature { feature }];
            }
        };

        let mut effects = Vec::new();
        if !replaced.is_empty() {
            log::debug!(
                "field {}: new {} replaces {} shape(s)",
                self.field.id,
                shape.type_name(),
                replaced.len()
            );
        }
        for old in replaced {
            self.drop_feature(old, &mut effects);
        }
        effects.push(write);
        effects.extend(self.show_marker(feature, &shape));
        effects
    }

    /// An owned shape was reshaped or dragged. Unknown features are ignored.
    pub fn updated(&mut self, feature: FeatureId, geometry: Geometry) -> Vec<SurfaceEffect> {
        let Some(index) = self.index_of(feature) else {
            return Vec::new();
        };
        match accept_shape(self.field.kind, geometry) {
            Ok(shape) => self.replace_shape(index, shape),
            Err(e) => {
                log::warn!("field {}: discarding edit of {feature:?}: {e}", self.field.id);
                vec![SurfaceEffect::ResetFeature {
                    feature,
                    geometry: self.shapes[index].1.clone(),
                }]
            }
        }
    }

    fn replace_shape(&mut self, index: usize, shape: Geometry) -> Vec<SurfaceEffect> {
        let (feature, previous) = self.shapes[index].clone();
        let mut next = self.shapes.clone();
        next[index].1 = shape.clone();
        match self.commit(next) {
            Ok(write) => {
                let mut effects = vec![write];
                effects.extend(self.show_marker(feature, &shape));
                effects
            }
            Err(e) => {
                log::warn!("field {}: cannot serialize value: {e}", self.field.id);
                vec![SurfaceEffect::ResetFeature {
                    feature,
                    geometry: previous,
                }]
            }
        }
    }

    /// An owned shape was removed. Unknown features are ignored.
    pub fn deleted(&mut self, feature: FeatureId) -> Vec<SurfaceEffect> {
        let Some(index) = self.index_of(feature) else {
            return Vec::new();
        };
        let mut next = self.shapes.clone();
        next.remove(index);
        match self.commit(next) {
            Ok(write) => {
                let mut effects = vec![write];
                if self.markers.remove(&feature) {
                    effects.push(SurfaceEffect::HideCaptureMarker { feature });
                }
                effects
            }
            Err(e) => {
                log::warn!("field {}: cannot serialize value: {e}", self.field.id);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapform_core::pos;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fid(s: &str) -> FeatureId {
        FeatureId::intern(s)
    }

    #[test]
    fn decode_unwraps_feature() {
        let raw = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {"type": "Point", "coordinates": [3, 4]}
        });
        assert_eq!(decode_drawn(raw).unwrap(), Geometry::point(3.0, 4.0));
    }

    #[test]
    fn decode_rejects_empty_feature() {
        let raw = json!({"type": "Feature", "geometry": null, "properties": {}});
        assert_eq!(decode_drawn(raw), Err(GeometryError::Empty));
    }

    #[test]
    fn second_point_replaces_first() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_point", GeometryKind::Point));
        cap.created(fid("cp1"), Geometry::point(100.0, 10.0));
        let effects = cap.created(fid("cp2"), Geometry::point(120.0, 20.0));

        assert_eq!(
            effects,
            vec![
                SurfaceEffect::RemoveFeature { feature: fid("cp1") },
                SurfaceEffect::HideCaptureMarker { feature: fid("cp1") },
                SurfaceEffect::WriteField {
                    field: FieldId::intern("cap_point"),
                    value: r#"{"type":"Point","coordinates":[120.0,20.0]}"#.into(),
                },
                SurfaceEffect::ShowCaptureMarker {
                    feature: fid("cp2"),
                    at: pos(120.0, 20.0),
                },
            ]
        );
        assert_eq!(cap.shape_count(), 1);
        assert_eq!(cap.marker_count(), 1);
    }

    #[test]
    fn invalid_shape_keeps_previous_value() {
        let field = GeometryField::new("cap_line", GeometryKind::LineString);
        let mut cap = GeometryCapture::new(field);
        cap.created(fid("cl1"), Geometry::line(&[(0.0, 0.0), (1.0, 1.0)]));
        let before = cap.value().to_string();

        let effects = cap.created(fid("cl2"), Geometry::line(&[(5.0, 5.0)]));
        assert_eq!(effects, vec![SurfaceEffect::RemoveFeature { feature: fid("cl2") }]);
        assert_eq!(cap.value(), before);

        let effects = cap.created(fid("cl3"), Geometry::point(0.0, 0.0));
        assert_eq!(effects, vec![SurfaceEffect::RemoveFeature { feature: fid("cl3") }]);
        assert_eq!(cap.value(), before);
    }

    #[test]
    fn bad_update_resets_feature() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_poly", GeometryKind::Polygon));
        let square = Geometry::polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        cap.created(fid("cpoly"), square.clone());

        let open = Geometry::Polygon {
            coordinates: vec![vec![pos(0.0, 0.0), pos(2.0, 0.0), pos(2.0, 2.0), pos(0.0, 2.0)]],
        };
        let effects = cap.updated(fid("cpoly"), open);
        assert_eq!(
            effects,
            vec![SurfaceEffect::ResetFeature {
                feature: fid("cpoly"),
                geometry: square.clone(),
            }]
        );
        assert_eq!(cap.shapes().collect::<Vec<_>>(), vec![&square]);
    }

    #[test]
    fn dragging_point_moves_marker() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_drag", GeometryKind::Point));
        cap.created(fid("cd1"), Geometry::point(1.0, 1.0));
        let effects = cap.updated(fid("cd1"), Geometry::point(2.0, 2.0));
        assert_eq!(
            effects.last(),
            Some(&SurfaceEffect::ShowCaptureMarker {
                feature: fid("cd1"),
                at: pos(2.0, 2.0),
            })
        );
        assert!(cap.value().contains("[2.0,2.0]"));
    }

    #[test]
    fn updates_for_foreign_features_are_ignored() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_foreign", GeometryKind::Point));
        assert!(cap.updated(fid("nobody"), Geometry::point(0.0, 0.0)).is_empty());
        assert!(cap.deleted(fid("nobody")).is_empty());
    }

    #[test]
    fn load_restores_and_skips_canonical_rewrite() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_load", GeometryKind::Point));
        let text = r#"{"type":"Point","coordinates":[7.0,8.0]}"#;
        let effects = cap.load(text).unwrap();
        assert_eq!(effects.len(), 2, "add + marker, no rewrite: {effects:?}");
        assert!(matches!(effects[0], SurfaceEffect::AddFeature { .. }));
        assert!(matches!(effects[1], SurfaceEffect::ShowCaptureMarker { .. }));
        assert_eq!(cap.value(), text);

        let effects = cap.load(r#"{"type": "Point", "coordinates": [7, 8]}"#).unwrap();
        assert!(matches!(effects.last(), Some(SurfaceEffect::WriteField { .. })));
    }

    #[test]
    fn load_rejects_wrong_type() {
        let mut cap = GeometryCapture::new(GeometryField::new("cap_bad", GeometryKind::Point));
        assert!(cap.load(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#).is_err());
        assert!(cap.is_empty());
    }

    #[test]
    fn read_only_field_loses_tools_once_captured() {
        let mut cap = GeometryCapture::new(
            GeometryField::new("cap_ro", GeometryKind::Point).read_only(),
        );
        assert!(cap.controls().draw_marker);
        cap.created(fid("cro"), Geometry::point(0.0, 0.0));
        assert_eq!(cap.controls(), DrawControls::none());
    }
}
