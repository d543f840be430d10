//! Inputs to the object layer, effects for the map surface, and the typed
//! notifications delivered to observers such as the list-row component.

use crate::paint::ResolvedPaint;
use mapform_core::{Geometry, ObjectKey, Position};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a hover or click came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerSource {
    Map,
    Row,
}

/// A pointer or DOM event, normalized by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum ObjectInput {
    /// Pointer entered a rendered feature.
    MapEnter { key: ObjectKey, at: Position },
    /// Pointer moved over the map.
    MapMove { at: Position },
    MapLeave { key: ObjectKey },
    /// Click on the map; `key` is `None` on empty map.
    MapClick {
        #[serde(default)]
        key: Option<ObjectKey>,
        at: Position,
    },
    RowEnter { key: ObjectKey },
    RowLeave { key: ObjectKey },
    RowClick { key: ObjectKey },
}

/// Instruction for the map surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum LayerEffect {
    AddObject {
        key: ObjectKey,
        geometry: Geometry,
        paint: ResolvedPaint,
    },
    /// Remove the feature and release its layer/source.
    RemoveObject { key: ObjectKey },
    SetPaint { key: ObjectKey, paint: ResolvedPaint },
    ShowTooltip {
        key: ObjectKey,
        label: String,
        at: Position,
    },
    HideTooltip,
    OpenPopup {
        key: ObjectKey,
        label: Option<String>,
        properties: Map<String, Value>,
        at: Position,
    },
    ClosePopup,
    Navigate { url: String },
}

/// Notification for observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LayerEvent {
    HoverChanged {
        key: ObjectKey,
        hovered: bool,
        source: PointerSource,
    },
    SelectionChanged { selected: Option<ObjectKey> },
    MembershipChanged {
        added: Vec<ObjectKey>,
        removed: Vec<ObjectKey>,
    },
}

pub trait LayerObserver {
    fn notify(&mut self, event: &LayerEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);
