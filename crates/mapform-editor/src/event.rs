//! Events emitted by the drawing library, and the effects the editor asks
//! the host to apply in return.
//!
//! The editor never touches the map directly: every handler consumes one
//! `DrawEvent` and returns the `SurfaceEffect`s to apply, in order.

use crate::policy::{DrawControls, DrawTool};
use mapform_core::{FeatureId, FieldId, Geometry, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized event from the drawing library.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DrawEvent {
    /// The user picked a toolbar tool.
    ToolActivated { tool: DrawTool },
    /// The tool was switched off without committing (Escape, toggle).
    ToolDeactivated,
    /// A vertex was committed to the shape being drawn.
    VertexAdded { at: Position },
    /// Pointer moved over the map while a tool is active.
    PointerMoved { at: Position },
    /// A new shape was committed. `geometry` is the library's raw GeoJSON
    /// (a Feature or a bare Geometry).
    Created { feature: FeatureId, geometry: Value },
    /// An existing shape was reshaped or dragged.
    Updated { feature: FeatureId, geometry: Value },
    /// A shape was removed.
    Deleted { feature: FeatureId },
}

/// An instruction for the host: map surface, drawing library, or form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SurfaceEffect {
    /// Replace the text of the backing form input in one write.
    WriteField { field: FieldId, value: String },
    /// Place a shape into the drawing store (restored values).
    AddFeature { feature: FeatureId, geometry: Geometry },
    /// Drop a shape from the drawing store.
    RemoveFeature { feature: FeatureId },
    /// Put a shape back to its last accepted geometry.
    ResetFeature { feature: FeatureId, geometry: Geometry },
    /// Distinguished "captured point" marker for a Point-family shape.
    ShowCaptureMarker { feature: FeatureId, at: Position },
    HideCaptureMarker { feature: FeatureId },
    /// Live length label next to the pointer while drawing a line.
    ShowMeasurement { at: Position, label: String },
    HideMeasurement,
    /// Abort the shape being drawn without committing it.
    CancelDrawing,
    /// Toolbar visibility.
    SetControls { controls: DrawControls },
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapform_core::pos;

    #[test]
    fn decodes_library_events() {
        let ev: DrawEvent =
            serde_json::from_str(r#"{"event":"tool_activated","tool":"marker"}"#).unwrap();
        assert_eq!(
            ev,
            DrawEvent::ToolActivated {
                tool: DrawTool::Marker
            }
        );

        let ev: DrawEvent =
            serde_json::from_str(r#"{"event":"pointer_moved","at":[6.5,45.1]}"#).unwrap();
        assert_eq!(ev, DrawEvent::PointerMoved { at: pos(6.5, 45.1) });

        let ev: DrawEvent = serde_json::from_str(
            r#"{"event":"created","feature":"42","geometry":{"type":"Point","coordinates":[1,2]}}"#,
        )
        .unwrap();
        assert!(matches!(ev, DrawEvent::Created { feature, .. } if feature.as_str() == "42"));
    }

    #[test]
    fn encodes_effects_with_tag() {
        let effect = SurfaceEffect::WriteField {
            field: FieldId::intern("geom"),
            value: String::new(),
        };
        assert_eq!(
            serde_json::to_string(&effect).unwrap(),
            r#"{"effect":"write_field","field":"geom","value":""}"#
        );
    }
}
