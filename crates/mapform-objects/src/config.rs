//! Object layer configuration supplied by the hosting page.

use crate::paint::PaintStyles;
use mapform_core::ObjectKey;
use serde::Deserialize;

/// Which kind of page hosts the object layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LayerMode {
    /// A list page: clicking an object opens its detail page.
    List { detail_url_template: String },
    /// A detail page. `current` is the entity being displayed.
    Detail {
        #[serde(default)]
        current: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerConfig {
    pub mode: LayerMode,
    /// Feature property holding the entity's primary key. Falls back to
    /// the feature `id` member.
    pub primary_key_property: String,
    /// Feature property shown in tooltips and popups.
    pub label_property: String,
    /// Placeholder replaced by the primary key in `detail_url_template`.
    pub url_placeholder: String,
    pub paint: PaintStyles,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            mode: LayerMode::Detail { current: None },
            primary_key_property: "id".into(),
            label_property: "name".into(),
            url_placeholder: "{pk}".into(),
            paint: PaintStyles::default(),
        }
    }
}

impl LayerConfig {
    pub fn list(detail_url_template: &str) -> Self {
        Self {
            mode: LayerMode::List {
                detail_url_template: detail_url_template.into(),
            },
            ..Self::default()
        }
    }

    pub fn detail(current: Option<&str>) -> Self {
        Self {
            mode: LayerMode::Detail {
                current: current.map(str::to_string),
            },
            ..Self::default()
        }
    }

    pub fn current_key(&self) -> Option<ObjectKey> {
        match &self.mode {
            LayerMode::Detail {
                current: Some(key),
            } => Some(ObjectKey::intern(key)),
            _ => None,
        }
    }

    /// Navigation target for `key`; list pages only.
    pub fn detail_url(&self, key: ObjectKey) -> Option<String> {
        match &self.mode {
            LayerMode::List {
                detail_url_template,
            } => Some(detail_url_template.replace(&self.url_placeholder, key.as_str())),
            LayerMode::Detail { .. } => None,
        }
    }
}
