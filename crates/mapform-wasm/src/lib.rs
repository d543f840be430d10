//! WASM bridge for mapform: exposes the geometry field editor and the
//! object layer to the hosting page.
//!
//! Compiled via `wasm-pack build --target web`. Every method takes and
//! returns JSON text; effects come back as arrays the page applies in order
//! to the map, the drawing library, and the form.

mod logger;
mod storage;

use mapform_core::{GeoValue, GeometryKind, MapContext, ObjectKey, parse_field_value};
use mapform_editor::{DrawEvent, EditorConfig, FieldConfig, FieldRouter, Readiness};
use mapform_objects::{
    InteractionEngine, LayerConfig, LayerEvent, LayerObserver, ObjectInput, SubscriptionId,
};
use serde::Serialize;
use storage::LocalStorageStore;
use wasm_bindgen::prelude::*;

/// Reply envelope: `{"ok":true,"effects":[...]}` or `{"ok":false,"error":"..."}`.
#[derive(Serialize)]
struct Reply<'a, T: Serialize> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    effects: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn reply_ok<T: Serialize>(effects: &T) -> String {
    let reply = Reply {
        ok: true,
        effects: Some(effects),
        error: None,
    };
    serde_json::to_string(&reply)
        .unwrap_or_else(|e| error_json(&format!("serialization error: {e}")))
}

fn reply_err(error: impl std::fmt::Display) -> String {
    error_json(&error.to_string())
}

fn error_json(message: &str) -> String {
    let reply: Reply<'_, ()> = Reply {
        ok: false,
        effects: None,
        error: Some(message.to_string()),
    };
    serde_json::to_string(&reply).unwrap_or_else(|_| r#"{"ok":false}"#.to_string())
}

/// Geometry fields of one form, sharing one map and one drawing library.
#[wasm_bindgen]
pub struct MapForm {
    router: FieldRouter,
    poll_interval_ms: u32,
}

#[wasm_bindgen]
impl MapForm {
    /// `config_json` is an `EditorConfig`; empty or invalid text uses defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_error_panic_hook_setup();
        logger::init(log::LevelFilter::Warn);

        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            serde_json::from_str(config_json).unwrap_or_else(|e| {
                log::warn!("bad editor config, using defaults: {e}");
                EditorConfig::default()
            })
        };
        Self {
            router: FieldRouter::new(&config),
            poll_interval_ms: config.ready_poll_interval_ms,
        }
    }

    /// Register a field from a `FieldConfig` JSON object.
    pub fn register_field(&mut self, field_json: &str) -> String {
        let config: FieldConfig = match serde_json::from_str(field_json) {
            Ok(c) => c,
            Err(e) => return reply_err(e),
        };
        match self.router.register_config(&config) {
            Ok(effects) => reply_ok(&effects),
            Err(e) => reply_err(e),
        }
    }

    /// Delay the page should wait between `poll_ready` calls.
    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_ms
    }

    /// Returns `{"state":"waiting"}`, `{"state":"ready","effects":[...]}`
    /// or `{"state":"failed","error":"..."}`.
    pub fn poll_ready(&mut self, library_ready: bool) -> String {
        let value = match self.router.poll_ready(library_ready) {
            Readiness::Waiting => serde_json::json!({ "state": "waiting" }),
            Readiness::Ready(effects) => match serde_json::to_value(&effects) {
                Ok(effects) => serde_json::json!({ "state": "ready", "effects": effects }),
                Err(e) => return reply_err(e),
            },
            Readiness::Failed(e) => {
                serde_json::json!({ "state": "failed", "error": e.to_string() })
            }
        };
        value.to_string()
    }

    /// Feed one drawing-library event (`DrawEvent` JSON).
    pub fn handle_event(&mut self, event_json: &str) -> String {
        match serde_json::from_str::<DrawEvent>(event_json) {
            Ok(event) => reply_ok(&self.router.handle(event)),
            Err(e) => {
                log::warn!("undecodable draw event: {e}");
                reply_err(e)
            }
        }
    }

    pub fn select_field(&mut self, field_id: &str) -> String {
        match self
            .router
            .select_field(mapform_core::FieldId::intern(field_id))
        {
            Ok(effects) => reply_ok(&effects),
            Err(e) => reply_err(e),
        }
    }

    pub fn clear_selection(&mut self) -> String {
        reply_ok(&self.router.clear_selection())
    }

    pub fn has_selector(&self) -> bool {
        self.router.has_selector()
    }

    /// Current toolbar visibility as JSON.
    pub fn get_controls(&self) -> String {
        serde_json::to_string(&self.router.effective_controls()).unwrap_or_else(|_| "{}".into())
    }

    /// Serialized value of a field, or an empty string.
    pub fn get_value(&self, field_id: &str) -> String {
        self.router
            .value(mapform_core::FieldId::intern(field_id))
            .unwrap_or_default()
            .to_string()
    }

    /// Cancel anything in progress before the page goes away.
    pub fn teardown(&mut self) -> String {
        reply_ok(&self.router.teardown())
    }
}

/// Forwards layer notifications to a JS callback as JSON text.
struct JsObserver(js_sys::Function);

impl LayerObserver for JsObserver {
    fn notify(&mut self, event: &LayerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("could not encode layer event: {e}");
                return;
            }
        };
        if let Err(e) = self.0.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            log::warn!("layer observer threw: {e:?}");
        }
    }
}

/// Read-only object layer of a list or detail page.
#[wasm_bindgen]
pub struct ObjectMap {
    engine: InteractionEngine,
    store: LocalStorageStore,
}

#[wasm_bindgen]
impl ObjectMap {
    /// `config_json` is a `LayerConfig`; the map context is persisted in
    /// `localStorage` under `storage_key`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, storage_key: &str) -> Result<ObjectMap, JsError> {
        console_error_panic_hook_setup();
        logger::init(log::LevelFilter::Warn);

        let config: LayerConfig = if config_json.trim().is_empty() {
            LayerConfig::default()
        } else {
            serde_json::from_str(config_json)?
        };
        Ok(Self {
            engine: InteractionEngine::new(config),
            store: LocalStorageStore::new(storage_key),
        })
    }

    /// Replace the object set with a GeoJSON FeatureCollection.
    pub fn load_objects(&mut self, geojson: &str) -> String {
        match GeoValue::parse(geojson) {
            Ok(GeoValue::FeatureCollection(fc)) => reply_ok(&self.engine.load(fc)),
            Ok(other) => reply_err(format!(
                "expected a FeatureCollection, got {}",
                match other {
                    GeoValue::Feature(_) => "a Feature",
                    _ => "a bare geometry",
                }
            )),
            Err(e) => reply_err(e),
        }
    }

    pub fn begin_fetch(&mut self) -> u64 {
        self.engine.begin_fetch()
    }

    pub fn finish_fetch(&mut self, ticket: u64, body: &str) -> String {
        match self.engine.finish_fetch(ticket, body) {
            Ok(effects) => reply_ok(&effects),
            Err(e) => reply_err(e),
        }
    }

    pub fn fail_fetch(&mut self, ticket: u64, reason: &str) {
        self.engine.fail_fetch(ticket, reason);
    }

    /// `keys_json` is an array of primary keys matching the list filter.
    pub fn apply_filter(&mut self, keys_json: &str) -> String {
        match serde_json::from_str::<Vec<ObjectKey>>(keys_json) {
            Ok(keys) => reply_ok(&self.engine.apply_filter(&keys)),
            Err(e) => reply_err(e),
        }
    }

    /// Feed one pointer or row event (`ObjectInput` JSON).
    pub fn handle_input(&mut self, input_json: &str) -> String {
        match serde_json::from_str::<ObjectInput>(input_json) {
            Ok(input) => reply_ok(&self.engine.handle(input)),
            Err(e) => reply_err(e),
        }
    }

    pub fn popup_closed(&mut self) {
        self.engine.popup_closed();
    }

    /// Call `callback(eventJson)` for every hover/selection/membership change.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u32 {
        self.engine.subscribe(Box::new(JsObserver(callback))).0
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        self.engine.unsubscribe(SubscriptionId(id))
    }

    /// Context to restore: the URL parameter wins over `localStorage`.
    /// Returns the context JSON or `null`.
    pub fn restore_context(&mut self, url_param: Option<String>) -> String {
        match self.engine.restore_context(url_param.as_deref(), &self.store) {
            Some(ctx) => ctx.to_json(),
            None => "null".to_string(),
        }
    }

    /// Persist the context if it changed. Returns `true` if written.
    pub fn save_context(&mut self, context_json: &str) -> bool {
        match MapContext::from_json(context_json) {
            Ok(ctx) => self.engine.save_context(ctx, &mut self.store),
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Compact URL parameter for a context, for shareable links.
    pub fn context_url_param(&self, context_json: &str) -> String {
        MapContext::from_json(context_json)
            .map(|ctx| ctx.to_url_param())
            .unwrap_or_default()
    }

    pub fn get_hovered(&self) -> String {
        self.engine.hovered().map(|k| k.to_string()).unwrap_or_default()
    }

    pub fn get_selected(&self) -> String {
        self.engine.selected().map(|k| k.to_string()).unwrap_or_default()
    }
}

#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    logger::init(logger::parse_level(level));
}

/// Check a stored value against a declared type.
/// Returns `{"ok":true,"shapes":N}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_value(declared_type: &str, text: &str) -> String {
    let result = declared_type
        .parse::<GeometryKind>()
        .and_then(|kind| parse_field_value(kind, text));
    match result {
        Ok(shapes) => serde_json::json!({ "ok": true, "shapes": shapes.len() }).to_string(),
        Err(e) => reply_err(e),
    }
}

// ─── Panic hook ──────────────────────────────────────────────────────────

/// Route panics to `console.error` instead of an opaque `unreachable`.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("mapform panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
