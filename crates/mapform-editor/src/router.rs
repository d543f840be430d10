//! Multi-field router: several geometry fields sharing one drawing surface.
//!
//! The drawing library exposes a single flat feature store and a single
//! toolbar. The router owns the one `DrawSession` for the map and:
//!
//! - applies the union of every field's tool policy to the toolbar, or the
//!   selected field's own policy when a field selector is in use,
//! - assigns each created shape to exactly one field (the selected field
//!   only, or registration order when nothing is selected),
//! - routes updates, deletes and re-announced creates to the field that
//!   owns the feature, so a shape never leaks into another field's value.
//!
//! A map with a single field goes through the same router.

use crate::capture::{GeometryCapture, GeometryField, decode_drawn};
use crate::config::{EditorConfig, FieldConfig};
use crate::event::{DrawEvent, SurfaceEffect};
use crate::policy::{DrawControls, DrawTool};
use crate::ready::{InitError, ReadyGate, ReadyState};
use crate::session::DrawSession;
use mapform_core::{Family, FeatureId, FieldId, GeometryError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    DuplicateField(FieldId),
    UnknownField(FieldId),
    InvalidField(GeometryError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::DuplicateField(id) => write!(f, "field `{id}` is already registered"),
            EditorError::UnknownField(id) => write!(f, "no field `{id}` on this map"),
            EditorError::InvalidField(e) => write!(f, "invalid field declaration: {e}"),
        }
    }
}

impl std::error::Error for EditorError {}

/// Lifecycle of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Initializing,
    Ready,
    /// The library never became ready: values stay displayed, no tools.
    Failed,
}

/// Outcome of one readiness poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Waiting,
    Ready(Vec<SurfaceEffect>),
    Failed(InitError),
}

pub struct FieldRouter {
    /// Registration order is the assignment tie-break.
    fields: Vec<GeometryCapture>,
    owners: HashMap<FeatureId, FieldId>,
    session: DrawSession,
    gate: ReadyGate,
    status: SurfaceStatus,
    selector: Option<bool>,
    active: Option<FieldId>,
    /// Toolbar state last sent to the host.
    applied: DrawControls,
}

impl FieldRouter {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            fields: Vec::new(),
            owners: HashMap::new(),
            session: DrawSession::new(),
            gate: ReadyGate::new(config.ready_max_attempts),
            status: SurfaceStatus::Initializing,
            selector: config.field_selector,
            active: None,
            applied: DrawControls::none(),
        }
    }

    // ─── Registration ────────────────────────────────────────────────────

    pub fn register(&mut self, field: GeometryField) -> Result<Vec<SurfaceEffect>, EditorError> {
        if self.index_of(field.id).is_some() {
            return Err(EditorError::DuplicateField(field.id));
        }
        log::debug!("registering field {} ({})", field.id, field.kind);
        self.fields.push(GeometryCapture::new(field));
        let mut effects = Vec::new();
        self.refresh(&mut effects);
        Ok(effects)
    }

    /// Register from host configuration, restoring the initial value.
    /// A stored value that does not fit the declared type is logged and
    /// left in the input untouched; the field starts empty.
    pub fn register_config(
        &mut self,
        config: &FieldConfig,
    ) -> Result<Vec<SurfaceEffect>, EditorError> {
        let field = config.to_field().map_err(EditorError::InvalidField)?;
        let id = field.id;
        let mut effects = self.register(field)?;
        if let Some(text) = config.initial_value.as_deref() {
            effects.extend(self.load_value(id, text)?);
        }
        Ok(effects)
    }

    pub fn load_value(
        &mut self,
        id: FieldId,
        text: &str,
    ) -> Result<Vec<SurfaceEffect>, EditorError> {
        let index = self.index_of(id).ok_or(EditorError::UnknownField(id))?;
        let mut effects = match self.fields[index].load(text) {
            Ok(effects) => effects,
            Err(e) => {
                log::warn!("field {id}: stored value ignored: {e}");
                return Ok(Vec::new());
            }
        };
        self.sync_owners(index);
        self.refresh(&mut effects);
        Ok(effects)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    fn index_of(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|f| f.id() == id)
    }

    pub fn field(&self, id: FieldId) -> Option<&GeometryCapture> {
        self.fields.iter().find(|f| f.id() == id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &GeometryCapture> {
        self.fields.iter()
    }

    pub fn value(&self, id: FieldId) -> Option<&str> {
        self.field(id).map(GeometryCapture::value)
    }

    pub fn owner_of(&self, feature: FeatureId) -> Option<FieldId> {
        self.owners.get(&feature).copied()
    }

    pub fn session(&self) -> &DrawSession {
        &self.session
    }

    pub fn status(&self) -> SurfaceStatus {
        self.status
    }

    pub fn active_field(&self) -> Option<FieldId> {
        self.active
    }

    pub fn has_selector(&self) -> bool {
        self.selector.unwrap_or(self.fields.len() > 1)
    }

    /// Union of every registered field's policy.
    pub fn aggregate_controls(&self) -> DrawControls {
        self.fields
            .iter()
            .fold(DrawControls::none(), |acc, f| acc.union(f.controls()))
    }

    /// What the toolbar should show right now.
    pub fn effective_controls(&self) -> DrawControls {
        if self.status != SurfaceStatus::Ready {
            return DrawControls::none();
        }
        match self.scoped_field() {
            Some(field) => field.controls(),
            None => self.aggregate_controls(),
        }
    }

    fn scoped_field(&self) -> Option<&GeometryCapture> {
        if !self.has_selector() {
            return None;
        }
        self.active.and_then(|id| self.field(id))
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    pub fn poll_ready(&mut self, library_ready: bool) -> Readiness {
        match self.gate.poll(library_ready) {
            Ok(ReadyState::Waiting { .. }) => Readiness::Waiting,
            Ok(ReadyState::Ready) => {
                if self.status == SurfaceStatus::Ready {
                    return Readiness::Ready(Vec::new());
                }
                self.status = SurfaceStatus::Ready;
                self.applied = self.effective_controls();
                Readiness::Ready(vec![SurfaceEffect::SetControls {
                    controls: self.applied,
                }])
            }
            Err(e) => {
                self.status = SurfaceStatus::Failed;
                self.session.cancel();
                Readiness::Failed(e)
            }
        }
    }

    /// Cancel anything in progress; called when the form is torn down.
    pub fn teardown(&mut self) -> Vec<SurfaceEffect> {
        self.session.cancel()
    }

    // ─── Field selector ──────────────────────────────────────────────────

    /// Scope drawing to one field. An in-progress shape is cancelled first.
    pub fn select_field(&mut self, id: FieldId) -> Result<Vec<SurfaceEffect>, EditorError> {
        if self.index_of(id).is_none() {
            return Err(EditorError::UnknownField(id));
        }
        if self.active == Some(id) {
            return Ok(Vec::new());
        }
        let mut effects = self.session.cancel();
        self.active = Some(id);
        log::debug!("field selector: {id}");
        self.refresh(&mut effects);
        Ok(effects)
    }

    pub fn clear_selection(&mut self) -> Vec<SurfaceEffect> {
        if self.active.is_none() {
            return Vec::new();
        }
        let mut effects = self.session.cancel();
        self.active = None;
        self.refresh(&mut effects);
        effects
    }

    // ─── Event dispatch ──────────────────────────────────────────────────

    /// Process one drawing-library event. Events are handled strictly in
    /// the order they are passed in.
    pub fn handle(&mut self, event: DrawEvent) -> Vec<SurfaceEffect> {
        if self.status != SurfaceStatus::Ready {
            log::warn!("ignoring {event:?}: drawing surface is {:?}", self.status);
            return Vec::new();
        }
        let mut effects = match event {
            DrawEvent::ToolActivated { tool } => self.activate(tool),
            DrawEvent::ToolDeactivated => self.session.end(),
            DrawEvent::VertexAdded { at } => self.session.vertex_added(at),
            DrawEvent::PointerMoved { at } => self.session.pointer_moved(at),
            DrawEvent::Created { feature, geometry } => self.created(feature, geometry),
            DrawEvent::Updated { feature, geometry } => self.updated(feature, geometry),
            DrawEvent::Deleted { feature } => self.deleted(feature),
        };
        self.refresh(&mut effects);
        effects
    }

    fn activate(&mut self, tool: DrawTool) -> Vec<SurfaceEffect> {
        if !self.effective_controls().allows(tool) {
            log::warn!("tool {tool:?} is not offered here, refusing");
            let mut effects = self.session.cancel();
            if !effects.contains(&SurfaceEffect::CancelDrawing) {
                effects.push(SurfaceEffect::CancelDrawing);
            }
            return effects;
        }
        let owner = match self.scoped_field() {
            Some(field) => Some(field.id()),
            None if self.fields.len() == 1 => Some(self.fields[0].id()),
            None => None,
        };
        self.session.activate(tool, owner)
    }

    /// Field that receives a new shape of `family`. With a field selected,
    /// only that field may take it.
    fn assign(&self, family: Family) -> Option<usize> {
        if let Some(field) = self.scoped_field() {
            if field.kind().accepts(family) {
                return self.index_of(field.id());
            }
            log::warn!(
                "selected field {} does not take {} shapes",
                field.id(),
                family.as_str()
            );
            return None;
        }
        let mut matching = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind().accepts(family))
            .map(|(i, _)| i);
        let first = matching.next()?;
        if matching.next().is_some() {
            log::debug!(
                "{} shape matches several fields, assigning to {}",
                family.as_str(),
                self.fields[first].id()
            );
        }
        Some(first)
    }

    fn created(&mut self, feature: FeatureId, raw: Value) -> Vec<SurfaceEffect> {
        if self.owner_index(feature).is_some() {
            // Re-announced shape stays with the field that holds it.
            return self.updated(feature, raw);
        }
        let mut effects = self.session.end();
        let geometry = match decode_drawn(raw) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("discarding drawn shape {feature:?}: {e}");
                effects.push(SurfaceEffect::RemoveFeature { feature });
                return effects;
            }
        };
        let index = geometry.family().and_then(|family| self.assign(family));
        let Some(index) = index else {
            log::warn!(
                "no field accepts a {} shape, discarding {feature:?}",
                geometry.type_name()
            );
            effects.push(SurfaceEffect::RemoveFeature { feature });
            return effects;
        };
        effects.extend(self.fields[index].created(feature, geometry));
        self.sync_owners(index);
        effects
    }

    fn updated(&mut self, feature: FeatureId, raw: Value) -> Vec<SurfaceEffect> {
        let mut effects = self.session.end();
        let Some(index) = self.owner_index(feature) else {
            log::debug!("update for unowned feature {feature:?} ignored");
            return effects;
        };
        match decode_drawn(raw) {
            Ok(geometry) => effects.extend(self.fields[index].updated(feature, geometry)),
            Err(e) => {
                log::warn!("discarding edit of {feature:?}: {e}");
                if let Some(previous) = self.fields[index].shape(feature) {
                    effects.push(SurfaceEffect::ResetFeature {
                        feature,
                        geometry: previous.clone(),
                    });
                }
            }
        }
        effects
    }

    fn deleted(&mut self, feature: FeatureId) -> Vec<SurfaceEffect> {
        let mut effects = self.session.end();
        let Some(index) = self.owner_index(feature) else {
            log::debug!("delete for unowned feature {feature:?} ignored");
            return effects;
        };
        effects.extend(self.fields[index].deleted(feature));
        self.sync_owners(index);
        effects
    }

    fn owner_index(&self, feature: FeatureId) -> Option<usize> {
        self.owners.get(&feature).and_then(|id| self.index_of(*id))
    }

    fn sync_owners(&mut self, index: usize) {
        let id = self.fields[index].id();
        self.owners.retain(|_, owner| *owner != id);
        for feature in self.fields[index].features() {
            self.owners.insert(feature, id);
        }
    }

    fn refresh(&mut self, effects: &mut Vec<SurfaceEffect>) {
        if self.status != SurfaceStatus::Ready {
            return;
        }
        let controls = self.effective_controls();
        if controls != self.applied {
            self.applied = controls;
            effects.push(SurfaceEffect::SetControls { controls });
        }
    }
}
