//! Integration tests: drawing events routed through `FieldRouter` into one
//! or several geometry fields.

use mapform_core::{CollectionEncoding, FeatureId, FieldId, Geometry, GeometryKind, pos};
use mapform_editor::{
    DrawControls, DrawEvent, DrawMode, DrawTool, EditorConfig, FieldConfig, FieldRouter,
    GeometryField, InitError, Readiness, SurfaceEffect, SurfaceStatus,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn ready_router(fields: &[GeometryField]) -> FieldRouter {
    let mut router = FieldRouter::new(&EditorConfig::default());
    for field in fields {
        router.register(field.clone()).unwrap();
    }
    assert!(matches!(router.poll_ready(true), Readiness::Ready(_)));
    router
}

fn fid(s: &str) -> FeatureId {
    FeatureId::intern(s)
}

fn created(feature: &str, geometry: &Geometry) -> DrawEvent {
    DrawEvent::Created {
        feature: fid(feature),
        geometry: serde_json::to_value(geometry).unwrap(),
    }
}

fn tool(tool: DrawTool) -> DrawEvent {
    DrawEvent::ToolActivated { tool }
}

fn square(x: f64, y: f64) -> Geometry {
    Geometry::polygon(&[(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0)])
}

fn parsed(value: &str) -> Value {
    serde_json::from_str(value).unwrap()
}

// ─── Single field ───────────────────────────────────────────────────────

#[test]
fn point_field_keeps_only_latest_point() {
    let geom = FieldId::intern("point_only");
    let mut router = ready_router(&[GeometryField::new("point_only", GeometryKind::Point)]);

    router.handle(tool(DrawTool::Marker));
    router.handle(created("p1", &Geometry::point(100.0, 10.0)));
    router.handle(tool(DrawTool::Marker));
    let effects = router.handle(created("p2", &Geometry::point(120.0, 20.0)));

    assert!(effects.contains(&SurfaceEffect::RemoveFeature { feature: fid("p1") }));
    assert_eq!(
        router.value(geom),
        Some(r#"{"type":"Point","coordinates":[120.0,20.0]}"#)
    );
    let field = router.field(geom).unwrap();
    assert_eq!(field.shape_count(), 1);
    assert_eq!(field.marker_count(), 1);
    assert_eq!(router.owner_of(fid("p1")), None);
    assert_eq!(router.owner_of(fid("p2")), Some(geom));
    assert!(router.session().is_idle());
}

#[test]
fn generic_field_accumulates_mixed_shapes() {
    let geom = FieldId::intern("anything");
    let mut router = ready_router(&[GeometryField::new("anything", GeometryKind::Generic)]);

    router.handle(created("g1", &Geometry::point(1.0, 2.0)));
    router.handle(created("g2", &Geometry::line(&[(0.0, 0.0), (3.0, 4.0)])));

    let value = parsed(router.value(geom).unwrap());
    assert_eq!(value["type"], "GeometryCollection");
    let geometries = value["geometries"].as_array().unwrap();
    assert_eq!(geometries.len(), 2);
    assert_eq!(geometries[0]["type"], "Point");
    assert_eq!(geometries[1]["type"], "LineString");
}

#[test]
fn cardinality_single_vs_collection() {
    let single = FieldId::intern("card_single");
    let many = FieldId::intern("card_many");
    let mut one = ready_router(&[GeometryField::new("card_single", GeometryKind::Polygon)]);
    let mut all = ready_router(&[GeometryField::new(
        "card_many",
        GeometryKind::GeometryCollection,
    )]);

    for i in 0..5 {
        let shape = square(i as f64 * 2.0, 0.0);
        one.handle(created(&format!("cs{i}"), &shape));
        all.handle(created(&format!("cm{i}"), &shape));
    }

    assert_eq!(one.field(single).unwrap().shape_count(), 1);
    assert_eq!(parsed(one.value(single).unwrap())["type"], "Polygon");
    assert_eq!(all.field(many).unwrap().shape_count(), 5);
    assert_eq!(
        parsed(all.value(many).unwrap())["geometries"]
            .as_array()
            .map(Vec::len),
        Some(5)
    );
}

#[test]
fn multi_field_wraps_its_shape() {
    let geom = FieldId::intern("multi_poly");
    let mut router = ready_router(&[GeometryField::new("multi_poly", GeometryKind::MultiPolygon)]);
    router.handle(created("mp1", &square(0.0, 0.0)));

    let value = parsed(router.value(geom).unwrap());
    assert_eq!(value["type"], "MultiPolygon");
    assert_eq!(value["coordinates"].as_array().map(Vec::len), Some(1));
}

#[test]
fn feature_collection_encoding() {
    let geom = FieldId::intern("as_features");
    let field = GeometryField::new("as_features", GeometryKind::Generic)
        .with_encoding(CollectionEncoding::FeatureCollection);
    let mut router = ready_router(&[field]);
    router.handle(created("fc1", &Geometry::point(5.0, 5.0)));

    let value = parsed(router.value(geom).unwrap());
    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["features"][0]["geometry"]["type"], "Point");
}

#[test]
fn deleting_only_shape_clears_value_and_marker() {
    let geom = FieldId::intern("del_point");
    let mut router = ready_router(&[GeometryField::new("del_point", GeometryKind::Point)]);
    router.handle(created("d1", &Geometry::point(0.0, 0.0)));

    let effects = router.handle(DrawEvent::Deleted { feature: fid("d1") });
    assert_eq!(
        effects,
        vec![
            SurfaceEffect::WriteField {
                field: geom,
                value: String::new(),
            },
            SurfaceEffect::HideCaptureMarker { feature: fid("d1") },
        ]
    );
    assert_eq!(router.value(geom), Some(""));
    assert_eq!(router.field(geom).unwrap().marker_count(), 0);
}

#[test]
fn rejected_shape_is_removed_from_surface() {
    let geom = FieldId::intern("reject_line");
    let mut router = ready_router(&[GeometryField::new("reject_line", GeometryKind::LineString)]);
    router.handle(created("rl1", &Geometry::line(&[(0.0, 0.0), (1.0, 1.0)])));
    let before = router.value(geom).unwrap().to_string();

    let effects = router.handle(created("rl2", &Geometry::point(9.0, 9.0)));
    assert_eq!(effects, vec![SurfaceEffect::RemoveFeature { feature: fid("rl2") }]);
    assert_eq!(router.value(geom), Some(before.as_str()));
}

#[test]
fn line_drawing_shows_and_hides_measurement() {
    let mut router = ready_router(&[GeometryField::new("measured", GeometryKind::LineString)]);
    router.handle(tool(DrawTool::Line));
    assert_eq!(router.session().mode(), DrawMode::DrawingLine);

    router.handle(DrawEvent::VertexAdded { at: pos(0.0, 0.0) });
    let effects = router.handle(DrawEvent::PointerMoved { at: pos(0.0, 0.001) });
    assert!(matches!(
        effects.as_slice(),
        [SurfaceEffect::ShowMeasurement { label, .. }] if label == "111 m"
    ));

    let effects = router.handle(created("ml1", &Geometry::line(&[(0.0, 0.0), (0.0, 0.001)])));
    assert_eq!(effects.first(), Some(&SurfaceEffect::HideMeasurement));
    assert!(router.session().measurement().is_none());
}

#[test]
fn short_vertex_from_the_library_is_ignored() {
    let mut router = ready_router(&[GeometryField::new("traced", GeometryKind::LineString)]);
    router.handle(tool(DrawTool::Line));

    let short: DrawEvent = serde_json::from_str(r#"{"event":"vertex_added","at":[1.0]}"#).unwrap();
    assert!(router.handle(short).is_empty());
    router.handle(DrawEvent::VertexAdded { at: pos(0.0, 0.0) });
    let moved: DrawEvent = serde_json::from_str(r#"{"event":"pointer_moved","at":[0.5]}"#).unwrap();
    assert!(router.handle(moved).is_empty());
    assert_eq!(router.session().measurement().map(|m| m.vertex_count()), Some(1));
}

#[test]
fn read_only_field_locks_after_capture() {
    let geom = FieldId::intern("locked");
    let mut router = ready_router(&[
        GeometryField::new("locked", GeometryKind::Point).read_only()
    ]);
    assert!(router.effective_controls().draw_marker);
    assert!(!router.effective_controls().drag);

    let effects = router.handle(created("lk1", &Geometry::point(1.0, 1.0)));
    assert_eq!(
        effects.last(),
        Some(&SurfaceEffect::SetControls {
            controls: DrawControls::none()
        })
    );

    let effects = router.handle(tool(DrawTool::Marker));
    assert_eq!(effects, vec![SurfaceEffect::CancelDrawing]);
    assert!(router.session().is_idle());
    assert!(router.value(geom).is_some_and(|v| v.contains("Point")));
}

// ─── Several fields on one map ──────────────────────────────────────────

fn parcel_and_parking() -> FieldRouter {
    ready_router(&[
        GeometryField::new("parcel", GeometryKind::Polygon),
        GeometryField::new("parking", GeometryKind::Point),
    ])
}

#[test]
fn shapes_go_to_the_field_that_accepts_them() {
    let parcel = FieldId::intern("parcel");
    let parking = FieldId::intern("parking");
    let mut router = parcel_and_parking();
    assert!(router.has_selector());

    let controls = router.effective_controls();
    assert!(controls.draw_marker && controls.draw_polygon);
    assert!(!controls.draw_line);

    router.handle(created("pp1", &square(0.0, 0.0)));
    router.handle(created("pp2", &Geometry::point(0.5, 0.5)));

    assert_eq!(router.owner_of(fid("pp1")), Some(parcel));
    assert_eq!(router.owner_of(fid("pp2")), Some(parking));
    assert_eq!(parsed(router.value(parcel).unwrap())["type"], "Polygon");
    assert_eq!(parsed(router.value(parking).unwrap())["type"], "Point");

    // Deleting the marker leaves the parcel alone.
    router.handle(DrawEvent::Deleted { feature: fid("pp2") });
    assert_eq!(router.value(parking), Some(""));
    assert_eq!(router.field(parcel).unwrap().shape_count(), 1);
}

#[test]
fn selector_scopes_toolbar_and_guards_tools() {
    let parking = FieldId::intern("parking");
    let mut router = parcel_and_parking();

    let effects = router.select_field(parking).unwrap();
    let parking_controls = DrawControls::for_field(GeometryKind::Point.capabilities(), true, false);
    assert_eq!(
        effects,
        vec![SurfaceEffect::SetControls {
            controls: parking_controls
        }]
    );

    let effects = router.handle(tool(DrawTool::Polygon));
    assert_eq!(effects, vec![SurfaceEffect::CancelDrawing]);
    assert!(router.session().is_idle());

    router.handle(tool(DrawTool::Marker));
    assert_eq!(router.session().owner(), Some(parking));
}

#[test]
fn switching_field_mid_draw_cancels_shape() {
    let parcel = FieldId::intern("parcel");
    let parking = FieldId::intern("parking");
    let mut router = parcel_and_parking();
    router.select_field(parcel).unwrap();
    router.handle(tool(DrawTool::Polygon));
    router.handle(DrawEvent::VertexAdded { at: pos(0.0, 0.0) });

    let effects = router.select_field(parking).unwrap();
    assert_eq!(effects.first(), Some(&SurfaceEffect::CancelDrawing));
    assert!(router.session().is_idle());
    assert_eq!(router.active_field(), Some(parking));
    assert_eq!(router.value(parcel), Some(""));
}

#[test]
fn draw_polygon_then_switch_and_draw_point() {
    let parcel = FieldId::intern("parcel");
    let parking = FieldId::intern("parking");
    let mut router = parcel_and_parking();

    router.select_field(parcel).unwrap();
    router.handle(tool(DrawTool::Polygon));
    router.handle(created("sw1", &square(0.0, 0.0)));
    let parcel_value = router.value(parcel).unwrap().to_string();

    router.select_field(parking).unwrap();
    router.handle(tool(DrawTool::Marker));
    router.handle(created("sw2", &Geometry::point(0.2, 0.2)));

    assert_eq!(router.value(parcel), Some(parcel_value.as_str()));
    assert_eq!(
        router.value(parking),
        Some(r#"{"type":"Point","coordinates":[0.2,0.2]}"#)
    );
}

#[test]
fn selected_field_rejects_other_families() {
    let parcel = FieldId::intern("parcel");
    let parking = FieldId::intern("parking");
    let mut router = parcel_and_parking();

    router.select_field(parcel).unwrap();
    router.handle(created("fb1", &square(0.0, 0.0)));
    let parcel_value = router.value(parcel).unwrap().to_string();

    router.select_field(parking).unwrap();
    let effects = router.handle(created("fb2", &square(5.0, 0.0)));

    assert!(effects.contains(&SurfaceEffect::RemoveFeature { feature: fid("fb2") }));
    assert_eq!(router.owner_of(fid("fb2")), None);
    assert_eq!(router.value(parcel), Some(parcel_value.as_str()));
    assert_eq!(router.value(parking), Some(""));
}

#[test]
fn reannounced_shape_stays_with_its_owner() {
    let first = FieldId::intern("stop_a");
    let second = FieldId::intern("stop_b");
    let mut router = ready_router(&[
        GeometryField::new("stop_a", GeometryKind::Point),
        GeometryField::new("stop_b", GeometryKind::Point),
    ]);

    router.select_field(first).unwrap();
    router.handle(created("ra1", &Geometry::point(1.0, 1.0)));
    router.select_field(second).unwrap();
    router.handle(created("ra1", &Geometry::point(2.0, 2.0)));

    assert_eq!(router.owner_of(fid("ra1")), Some(first));
    assert_eq!(
        router.value(first),
        Some(r#"{"type":"Point","coordinates":[2.0,2.0]}"#)
    );
    assert_eq!(router.value(second), Some(""));

    router.handle(DrawEvent::Deleted { feature: fid("ra1") });
    assert_eq!(router.value(first), Some(""));
    assert_eq!(router.value(second), Some(""));
}

#[test]
fn unknown_selection_is_an_error() {
    let mut router = parcel_and_parking();
    assert!(router.select_field(FieldId::intern("nowhere")).is_err());
    assert!(
        router
            .register(GeometryField::new("parking", GeometryKind::Point))
            .is_err()
    );
}

// ─── Lifecycle ──────────────────────────────────────────────────────────

#[test]
fn restores_initial_value_before_ready() {
    let geom = FieldId::intern("restored");
    let mut router = FieldRouter::new(&EditorConfig::default());
    let config: FieldConfig = serde_json::from_str(
        r#"{"id":"restored","geometryType":"MultiPoint",
            "initialValue":"{\"type\":\"MultiPoint\",\"coordinates\":[[1,1],[2,2]]}"}"#,
    )
    .unwrap();

    let effects = router.register_config(&config).unwrap();
    assert!(matches!(effects[0], SurfaceEffect::AddFeature { .. }));
    assert_eq!(router.field(geom).unwrap().shape_count(), 1);
    assert_eq!(router.status(), SurfaceStatus::Initializing);
    assert_eq!(router.effective_controls(), DrawControls::none());
}

#[test]
fn invalid_initial_value_starts_empty() {
    let geom = FieldId::intern("bad_initial");
    let mut router = FieldRouter::new(&EditorConfig::default());
    let config = FieldConfig {
        id: "bad_initial".into(),
        geometry_type: "Point".into(),
        modifiable: true,
        collection_encoding: CollectionEncoding::default(),
        initial_value: Some("not json".into()),
    };
    assert_eq!(router.register_config(&config).unwrap(), Vec::new());
    assert!(router.field(geom).unwrap().is_empty());
}

#[test]
fn library_never_ready_disables_editing() {
    let config = EditorConfig {
        ready_max_attempts: 2,
        ..EditorConfig::default()
    };
    let mut router = FieldRouter::new(&config);
    router
        .register(GeometryField::new("never", GeometryKind::Point))
        .unwrap();

    assert_eq!(router.poll_ready(false), Readiness::Waiting);
    assert_eq!(
        router.poll_ready(false),
        Readiness::Failed(InitError::Timeout { attempts: 2 })
    );
    assert_eq!(router.status(), SurfaceStatus::Failed);
    assert!(router.handle(tool(DrawTool::Marker)).is_empty());
    assert_eq!(router.effective_controls(), DrawControls::none());
}
