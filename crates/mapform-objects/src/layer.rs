//! The read-only object set: catalog, rendered membership, fetch lifecycle.
//!
//! The catalog is the last FeatureCollection delivered by the data source.
//! The rendered set is the part of it currently on the map. Reconciliation
//! only ever adds and removes: an object present before and after keeps its
//! hover/select state and is not re-emitted.

use mapform_core::{Feature, FeatureCollection, GeoValue, Geometry, GeometryError, ObjectKey};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub key: ObjectKey,
    pub geometry: Geometry,
    pub label: Option<String>,
    pub properties: Map<String, Value>,
}

impl CatalogEntry {
    fn from_feature(feature: Feature, key_property: &str, label_property: &str) -> Option<Self> {
        let Some(key) = feature
            .property_str(key_property)
            .or_else(|| feature.property_str("id"))
        else {
            log::warn!("object without `{key_property}` skipped");
            return None;
        };
        let Some(geometry) = feature.geometry.clone() else {
            log::debug!("object {key} has no geometry, not rendered");
            return None;
        };
        let label = feature
            .property_str(label_property)
            .filter(|l| !l.trim().is_empty());
        Some(Self {
            key: ObjectKey::intern(&key),
            geometry,
            label,
            properties: feature.properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedObject {
    key: ObjectKey,
    geometry: Geometry,
    label: Option<String>,
    is_current: bool,
    pub(crate) hover: bool,
    pub(crate) selected: bool,
}

impl RenderedObject {
    pub fn key(&self) -> ObjectKey {
        self.key
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }

    pub fn is_hovered(&self) -> bool {
        self.hover
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Keys that entered, left, or changed shape in one reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Membership {
    pub added: Vec<ObjectKey>,
    pub removed: Vec<ObjectKey>,
    /// Still present, geometry replaced by the data source.
    pub reshaped: Vec<ObjectKey>,
}

impl Membership {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.reshaped.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    /// A response for an older request arrived after a newer one started.
    Stale { ticket: u64, latest: u64 },
    Payload(GeometryError),
    Fetch(String),
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerError::Stale { ticket, latest } => {
                write!(f, "stale object response #{ticket} (latest #{latest})")
            }
            LayerError::Payload(e) => write!(f, "bad object payload: {e}"),
            LayerError::Fetch(reason) => write!(f, "object fetch failed: {reason}"),
        }
    }
}

impl std::error::Error for LayerError {}

#[derive(Debug, Default)]
pub struct ObjectLayer {
    catalog: Vec<CatalogEntry>,
    index: HashMap<ObjectKey, usize>,
    rendered: Vec<RenderedObject>,
    current: Option<ObjectKey>,
    generation: u64,
}

impl ObjectLayer {
    pub fn new(current: Option<ObjectKey>) -> Self {
        Self {
            current,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<ObjectKey> {
        self.current
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &RenderedObject> {
        self.rendered.iter()
    }

    pub fn get(&self, key: ObjectKey) -> Option<&RenderedObject> {
        self.rendered.iter().find(|o| o.key == key)
    }

    pub(crate) fn get_mut(&mut self, key: ObjectKey) -> Option<&mut RenderedObject> {
        self.rendered.iter_mut().find(|o| o.key == key)
    }

    pub fn entry(&self, key: ObjectKey) -> Option<&CatalogEntry> {
        self.index.get(&key).map(|&i| &self.catalog[i])
    }

    fn render(&self, entry: &CatalogEntry) -> RenderedObject {
        RenderedObject {
            key: entry.key,
            geometry: entry.geometry.clone(),
            label: entry.label.clone(),
            is_current: self.current == Some(entry.key),
            hover: false,
            selected: false,
        }
    }

    /// Replace the catalog and render all of it.
    pub fn load(
        &mut self,
        collection: FeatureCollection,
        key_property: &str,
        label_property: &str,
    ) -> Membership {
        let mut catalog = Vec::with_capacity(collection.features.len());
        let mut index = HashMap::new();
        for feature in collection.features {
            let Some(entry) = CatalogEntry::from_feature(feature, key_property, label_property)
            else {
                continue;
            };
            if index.contains_key(&entry.key) {
                log::warn!("duplicate object {}, keeping the first", entry.key);
                continue;
            }
            index.insert(entry.key, catalog.len());
            catalog.push(entry);
        }
        self.catalog = catalog;
        self.index = index;

        let keys: Vec<ObjectKey> = self.catalog.iter().map(|e| e.key).collect();
        let mut membership = self.reconcile(&keys);
        for object in &mut self.rendered {
            let Some(&i) = self.index.get(&object.key) else {
                continue;
            };
            let entry = &self.catalog[i];
            if membership.added.contains(&object.key) {
                continue;
            }
            object.label.clone_from(&entry.label);
            if object.geometry != entry.geometry {
                object.geometry = entry.geometry.clone();
                membership.reshaped.push(object.key);
            }
        }
        log::debug!(
            "object set loaded: {} rendered, +{} -{} ~{}",
            self.rendered.len(),
            membership.added.len(),
            membership.removed.len(),
            membership.reshaped.len()
        );
        membership
    }

    /// Render exactly the catalog objects in `keys`. Keys missing from the
    /// catalog are skipped.
    pub fn apply_filter(&mut self, keys: &[ObjectKey]) -> Membership {
        let known: Vec<ObjectKey> = keys
            .iter()
            .copied()
            .filter(|k| {
                let known = self.index.contains_key(k);
                if !known {
                    log::warn!("filter names unknown object {k}");
                }
                known
            })
            .collect();
        self.reconcile(&known)
    }

    fn reconcile(&mut self, keys: &[ObjectKey]) -> Membership {
        let wanted: HashSet<ObjectKey> = keys.iter().copied().collect();
        let mut membership = Membership::default();

        self.rendered.retain(|o| {
            let keep = wanted.contains(&o.key);
            if !keep {
                membership.removed.push(o.key);
            }
            keep
        });

        let present: HashSet<ObjectKey> = self.rendered.iter().map(|o| o.key).collect();
        let mut seen = HashSet::new();
        for key in keys {
            if present.contains(key) || !seen.insert(*key) {
                continue;
            }
            if let Some(entry) = self.entry(*key) {
                let object = self.render(entry);
                self.rendered.push(object);
                membership.added.push(*key);
            }
        }
        membership
    }

    // ─── Fetch lifecycle ─────────────────────────────────────────────────

    /// Start a request for the object set; returns its ticket.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        log::trace!("object fetch #{} started", self.generation);
        self.generation
    }

    /// Apply a response body. Responses for anything but the latest ticket
    /// are dropped; a bad payload leaves the previous set in place.
    pub fn finish_fetch(
        &mut self,
        ticket: u64,
        body: &str,
        key_property: &str,
        label_property: &str,
    ) -> Result<Membership, LayerError> {
        if ticket != self.generation {
            let err = LayerError::Stale {
                ticket,
                latest: self.generation,
            };
            log::debug!("{err}");
            return Err(err);
        }
        let collection = match GeoValue::parse(body) {
            Ok(GeoValue::FeatureCollection(fc)) => fc,
            Ok(GeoValue::Feature(feature)) => FeatureCollection {
                features: vec![feature],
            },
            Ok(GeoValue::Geometry(g)) => {
                let err = LayerError::Payload(GeometryError::UnknownType(g.type_name().into()));
                log::warn!("{err}: expected a FeatureCollection");
                return Err(err);
            }
            Err(e) => {
                let err = LayerError::Payload(e);
                log::warn!("{err}; keeping previous objects");
                return Err(err);
            }
        };
        Ok(self.load(collection, key_property, label_property))
    }

    /// The request failed; the previous object set stays visible.
    pub fn fail_fetch(&mut self, ticket: u64, reason: &str) -> LayerError {
        let err = LayerError::Fetch(reason.to_string());
        if ticket == self.generation {
            log::warn!("{err}; keeping previous objects");
        } else {
            log::debug!("ignoring failure of stale fetch #{ticket}: {reason}");
        }
        err
    }
}
