//! Object layer interaction engine.
//!
//! Keeps map pointer events, list-row events and popup/tooltip visibility
//! consistent. Map-side changes come back as `LayerEffect`s; row-side
//! changes are delivered to subscribed `LayerObserver`s.
//!
//! Every handler is idempotent: a repeated enter, leave, or click for the
//! same object with no state change in between produces no effects.

use crate::config::{LayerConfig, LayerMode};
use crate::event::{
    LayerEffect, LayerEvent, LayerObserver, ObjectInput, PointerSource, SubscriptionId,
};
use crate::layer::{LayerError, Membership, ObjectLayer, RenderedObject};
use crate::paint::ResolvedPaint;
use mapform_core::{
    ContextStore, ContextTracker, FeatureCollection, MapContext, ObjectKey, Position,
    resolve_context,
};

#[derive(Debug, Clone, PartialEq)]
struct Tooltip {
    key: ObjectKey,
    /// Follows the pointer; point features pin it to their coordinate.
    follows_pointer: bool,
}

pub struct InteractionEngine {
    config: LayerConfig,
    layer: ObjectLayer,
    hovered: Option<(ObjectKey, PointerSource)>,
    selected: Option<ObjectKey>,
    popup: Option<ObjectKey>,
    tooltip: Option<Tooltip>,
    observers: Vec<(SubscriptionId, Box<dyn LayerObserver>)>,
    next_subscription: u32,
    context: ContextTracker,
}

impl InteractionEngine {
    pub fn new(config: LayerConfig) -> Self {
        let layer = ObjectLayer::new(config.current_key());
        Self {
            config,
            layer,
            hovered: None,
            selected: None,
            popup: None,
            tooltip: None,
            observers: Vec::new(),
            next_subscription: 0,
            context: ContextTracker::default(),
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn layer(&self) -> &ObjectLayer {
        &self.layer
    }

    pub fn hovered(&self) -> Option<ObjectKey> {
        self.hovered.map(|(key, _)| key)
    }

    pub fn selected(&self) -> Option<ObjectKey> {
        self.selected
    }

    pub fn popup(&self) -> Option<ObjectKey> {
        self.popup
    }

    pub fn tooltip(&self) -> Option<ObjectKey> {
        self.tooltip.as_ref().map(|t| t.key)
    }

    // ─── Observers ───────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: Box<dyn LayerObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: LayerEvent) {
        for (_, observer) in &mut self.observers {
            observer.notify(&event);
        }
    }

    // ─── Object set ──────────────────────────────────────────────────────

    pub fn load(&mut self, collection: FeatureCollection) -> Vec<LayerEffect> {
        let membership = self.layer.load(
            collection,
            &self.config.primary_key_property,
            &self.config.label_property,
        );
        self.apply_membership(membership)
    }

    pub fn apply_filter(&mut self, keys: &[ObjectKey]) -> Vec<LayerEffect> {
        let membership = self.layer.apply_filter(keys);
        self.apply_membership(membership)
    }

    pub fn begin_fetch(&mut self) -> u64 {
        self.layer.begin_fetch()
    }

    pub fn finish_fetch(
        &mut self,
        ticket: u64,
        body: &str,
    ) -> Result<Vec<LayerEffect>, LayerError> {
        let membership = self.layer.finish_fetch(
            ticket,
            body,
            &self.config.primary_key_property,
            &self.config.label_property,
        )?;
        Ok(self.apply_membership(membership))
    }

    pub fn fail_fetch(&mut self, ticket: u64, reason: &str) -> LayerError {
        self.layer.fail_fetch(ticket, reason)
    }

    fn apply_membership(&mut self, membership: Membership) -> Vec<LayerEffect> {
        let mut effects = Vec::new();
        if membership.is_empty() {
            return effects;
        }
        for key in &membership.removed {
            if self.tooltip.as_ref().is_some_and(|t| t.key == *key) {
                self.tooltip = None;
                effects.push(LayerEffect::HideTooltip);
            }
            if self.popup == Some(*key) {
                self.popup = None;
                effects.push(LayerEffect::ClosePopup);
            }
            if self.hovered.is_some_and(|(k, _)| k == *key) {
                self.hovered = None;
            }
            effects.push(LayerEffect::RemoveObject { key: *key });
        }
        for key in membership.reshaped.iter().chain(&membership.added) {
            if membership.reshaped.contains(key) {
                effects.push(LayerEffect::RemoveObject { key: *key });
            }
            if let Some(object) = self.layer.get(*key) {
                effects.push(LayerEffect::AddObject {
                    key: *key,
                    geometry: object.geometry().clone(),
                    paint: self.paint_of(object),
                });
            }
        }
        let selection_lost = self
            .selected
            .is_some_and(|key| membership.removed.contains(&key));
        self.emit(LayerEvent::MembershipChanged {
            added: membership.added,
            removed: membership.removed,
        });
        if selection_lost {
            self.selected = None;
            self.emit(LayerEvent::SelectionChanged { selected: None });
        }
        effects
    }

    // ─── Paint ───────────────────────────────────────────────────────────

    fn paint_of(&self, object: &RenderedObject) -> ResolvedPaint {
        self.config
            .paint
            .resolve(object.is_current(), object.is_selected(), object.is_hovered())
    }

    fn repaint(&self, key: ObjectKey, effects: &mut Vec<LayerEffect>) {
        if let Some(object) = self.layer.get(key) {
            effects.push(LayerEffect::SetPaint {
                key,
                paint: self.paint_of(object),
            });
        }
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    pub fn handle(&mut self, input: ObjectInput) -> Vec<LayerEffect> {
        match input {
            ObjectInput::MapEnter { key, at } => {
                self.hover_enter(key, PointerSource::Map, Some(at))
            }
            ObjectInput::MapMove { at } => self.pointer_moved(at),
            ObjectInput::MapLeave { key } => self.hover_leave(key, PointerSource::Map),
            ObjectInput::MapClick { key: Some(key), at } => self.click_object(key, at),
            ObjectInput::MapClick { key: None, .. } => self.click_empty(),
            ObjectInput::RowEnter { key } => self.hover_enter(key, PointerSource::Row, None),
            ObjectInput::RowLeave { key } => self.hover_leave(key, PointerSource::Row),
            ObjectInput::RowClick { key } => self.row_clicked(key),
        }
    }

    // ─── Hover ───────────────────────────────────────────────────────────

    /// Hover `key` from the map (`pointer` given) or from its list row.
    /// A different hovered object is left first: last one wins.
    pub fn hover_enter(
        &mut self,
        key: ObjectKey,
        source: PointerSource,
        pointer: Option<Position>,
    ) -> Vec<LayerEffect> {
        if self.hovered.is_some_and(|(k, _)| k == key) {
            return Vec::new();
        }
        let Some(object) = self.layer.get(key) else {
            log::debug!("hover on unrendered object {key}");
            return Vec::new();
        };
        let tooltip = match (source, object.label(), object.is_current()) {
            (PointerSource::Map, Some(label), false) => {
                let anchor = object.geometry().point_coordinate().cloned();
                let follows_pointer = anchor.is_none();
                anchor
                    .or(pointer)
                    .map(|at| (label.to_string(), at, follows_pointer))
            }
            _ => None,
        };

        let mut effects = match self.hovered {
            Some((previous, previous_source)) => self.hover_leave(previous, previous_source),
            None => Vec::new(),
        };
        if let Some(object) = self.layer.get_mut(key) {
            object.hover = true;
        }
        self.hovered = Some((key, source));
        self.repaint(key, &mut effects);
        if let Some((label, at, follows_pointer)) = tooltip {
            self.tooltip = Some(Tooltip {
                key,
                follows_pointer,
            });
            effects.push(LayerEffect::ShowTooltip { key, label, at });
        }
        self.emit(LayerEvent::HoverChanged {
            key,
            hovered: true,
            source,
        });
        effects
    }

    pub fn hover_leave(&mut self, key: ObjectKey, source: PointerSource) -> Vec<LayerEffect> {
        if !self.hovered.is_some_and(|(k, _)| k == key) {
            return Vec::new();
        }
        self.hovered = None;
        let mut effects = Vec::new();
        if let Some(object) = self.layer.get_mut(key) {
            object.hover = false;
        }
        self.repaint(key, &mut effects);
        if self.tooltip.take().is_some() {
            effects.push(LayerEffect::HideTooltip);
        }
        self.emit(LayerEvent::HoverChanged {
            key,
            hovered: false,
            source,
        });
        effects
    }

    /// Pointer moved over the map: a pointer-anchored tooltip follows it.
    pub fn pointer_moved(&mut self, at: Position) -> Vec<LayerEffect> {
        match &self.tooltip {
            Some(tooltip) if tooltip.follows_pointer => {
                let key = tooltip.key;
                match self.layer.get(key).and_then(RenderedObject::label) {
                    Some(label) => vec![LayerEffect::ShowTooltip {
                        key,
                        label: label.to_string(),
                        at,
                    }],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    // ─── Click ───────────────────────────────────────────────────────────

    pub fn click_object(&mut self, key: ObjectKey, at: Position) -> Vec<LayerEffect> {
        let Some(object) = self.layer.get(key) else {
            log::debug!("click on unrendered object {key}");
            return self.click_empty();
        };
        if let LayerMode::List { .. } = self.config.mode {
            return match self.config.detail_url(key) {
                Some(url) => {
                    log::debug!("navigating to {url}");
                    vec![LayerEffect::Navigate { url }]
                }
                None => Vec::new(),
            };
        }
        if object.is_current() {
            return self.click_empty();
        }
        if self.popup == Some(key) {
            return Vec::new();
        }
        let at = object.geometry().point_coordinate().cloned().unwrap_or(at);
        let label = object.label().map(str::to_string);
        let properties = self
            .layer
            .entry(key)
            .map(|e| e.properties.clone())
            .unwrap_or_default();

        let mut effects = self.click_empty();
        self.popup = Some(key);
        effects.push(LayerEffect::OpenPopup {
            key,
            label,
            properties,
            at,
        });
        effects
    }

    /// Click on empty map: close the popup, if any.
    pub fn click_empty(&mut self) -> Vec<LayerEffect> {
        match self.popup.take() {
            Some(_) => vec![LayerEffect::ClosePopup],
            None => Vec::new(),
        }
    }

    /// The host closed the popup itself (close button).
    pub fn popup_closed(&mut self) {
        self.popup = None;
    }

    // ─── Select ──────────────────────────────────────────────────────────

    /// Row click: select-once toggle. Selecting a row deselects the
    /// previous one; clicking the selected row clears the selection.
    pub fn row_clicked(&mut self, key: ObjectKey) -> Vec<LayerEffect> {
        let mut effects = Vec::new();
        if self.layer.get(key).is_none() {
            log::debug!("row click on {key}, which is not rendered");
            return effects;
        }
        let previous = self.selected.take();
        if let Some(prev) = previous {
            if let Some(object) = self.layer.get_mut(prev) {
                object.selected = false;
            }
            self.repaint(prev, &mut effects);
        }
        if previous != Some(key) {
            if let Some(object) = self.layer.get_mut(key) {
                object.selected = true;
                self.selected = Some(key);
            }
            self.repaint(key, &mut effects);
        }
        self.emit(LayerEvent::SelectionChanged {
            selected: self.selected,
        });
        effects
    }

    // ─── Context ─────────────────────────────────────────────────────────

    /// Viewport and layers to restore on page load.
    pub fn restore_context(
        &mut self,
        url_param: Option<&str>,
        store: &dyn ContextStore,
    ) -> Option<MapContext> {
        let ctx = resolve_context(url_param, store);
        self.context = ContextTracker::new(ctx.clone());
        ctx
    }

    /// Persist the context; returns `true` if the store was written.
    pub fn save_context(&mut self, ctx: MapContext, store: &mut dyn ContextStore) -> bool {
        self.context.update(ctx, store)
    }
}
