//! Host-page configuration for the editor, deserialized from JSON.

use crate::capture::GeometryField;
use mapform_core::{CollectionEncoding, FieldId, GeometryError, GeometryKind};
use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// One geometry field as declared by the hosting form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub id: String,
    /// Declared type name, e.g. `"MultiPolygon"` or `"Geometry"`.
    pub geometry_type: String,
    #[serde(default = "default_true")]
    pub modifiable: bool,
    #[serde(default)]
    pub collection_encoding: CollectionEncoding,
    /// Current text of the backing input, if any.
    #[serde(default)]
    pub initial_value: Option<String>,
}

impl FieldConfig {
    pub fn to_field(&self) -> Result<GeometryField, GeometryError> {
        let kind: GeometryKind = self.geometry_type.parse()?;
        Ok(GeometryField {
            id: FieldId::intern(&self.id),
            kind,
            modifiable: self.modifiable,
            encoding: self.collection_encoding,
        })
    }
}

/// Editor-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Polls of the drawing library's ready flag before giving up.
    pub ready_max_attempts: u32,
    /// Delay between polls; used by the host's timer.
    pub ready_poll_interval_ms: u32,
    /// Whether the page shows a field selector. `None` shows one as soon
    /// as more than one field is registered.
    pub field_selector: Option<bool>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            ready_max_attempts: 50,
            ready_poll_interval_ms: 100,
            field_selector: None,
        }
    }
}
