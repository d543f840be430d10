//! Map viewport + active layer context persistence.
//!
//! On page load the context is read from a URL query parameter (highest
//! priority) or from a client-side persisted store (fallback). Whenever the
//! viewport or the active layer set changes it is written back to the store.
//!
//! URL form (compact, parsed with `winnow`):
//!
//! ```text
//! <zoom>/<lat>/<lng>[/<layer>,<layer>,...]
//! ```
//!
//! Layer names are percent-encoded. The persisted store form is JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use winnow::ascii::float;
use winnow::combinator::{opt, preceded};
use winnow::prelude::*;
use winnow::token::take_while;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapContext {
    pub viewport: Viewport,
    #[serde(default)]
    pub active_layer_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextError {
    Url(String),
    Json(String),
    OutOfRange(&'static str),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::Url(msg) => write!(f, "malformed context parameter: {msg}"),
            ContextError::Json(msg) => write!(f, "malformed stored context: {msg}"),
            ContextError::OutOfRange(what) => write!(f, "context {what} out of range"),
        }
    }
}

impl std::error::Error for ContextError {}

impl MapContext {
    fn check(self) -> Result<Self, ContextError> {
        let v = self.viewport;
        if !(-90.0..=90.0).contains(&v.lat) {
            return Err(ContextError::OutOfRange("latitude"));
        }
        if !(-180.0..=180.0).contains(&v.lng) {
            return Err(ContextError::OutOfRange("longitude"));
        }
        if !(0.0..=30.0).contains(&v.zoom) {
            return Err(ContextError::OutOfRange("zoom"));
        }
        Ok(self)
    }

    /// Parse the compact URL parameter form.
    pub fn from_url_param(text: &str) -> Result<Self, ContextError> {
        let ctx = context_param
            .parse(text.trim())
            .map_err(|e| ContextError::Url(e.to_string()))?;
        let names = ctx
            .active_layer_names
            .iter()
            .map(|n| percent_decode(n))
            .collect::<Result<Vec<_>, _>>()?;
        MapContext {
            active_layer_names: names,
            ..ctx
        }
        .check()
    }

    pub fn to_url_param(&self) -> String {
        let v = self.viewport;
        let mut out = format!("{}/{:.5}/{:.5}", v.zoom, v.lat, v.lng);
        if !self.active_layer_names.is_empty() {
            out.push('/');
            let names: Vec<String> = self
                .active_layer_names
                .iter()
                .map(|n| percent_encode(n))
                .collect();
            out.push_str(&names.join(","));
        }
        out
    }

    pub fn from_json(text: &str) -> Result<Self, ContextError> {
        let ctx: MapContext =
            serde_json::from_str(text).map_err(|e| ContextError::Json(e.to_string()))?;
        ctx.check()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ─── URL parameter grammar ───────────────────────────────────────────────

fn number(input: &mut &str) -> ModalResult<f64> {
    float.parse_next(input)
}

fn slash(input: &mut &str) -> ModalResult<char> {
    '/'.parse_next(input)
}

fn layer_list<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(slash, take_while(0.., |c: char| c != '/')).parse_next(input)
}

fn context_param(input: &mut &str) -> ModalResult<MapContext> {
    let zoom = number.parse_next(input)?;
    slash.parse_next(input)?;
    let lat = number.parse_next(input)?;
    slash.parse_next(input)?;
    let lng = number.parse_next(input)?;
    let layers = opt(layer_list).parse_next(input)?;
    let active_layer_names = layers
        .map(|list| {
            list.split(',')
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(MapContext {
        viewport: Viewport { lat, lng, zoom },
        active_layer_names,
    })
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn percent_decode(s: &str) -> Result<String, ContextError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_val);
            let lo = bytes.get(i + 2).copied().and_then(hex_val);
            match (hi, lo) {
                (Some(hi), Some(lo)) => out.push(hi << 4 | lo),
                _ => return Err(ContextError::Url(format!("bad escape in `{s}`"))),
            }
            i += 3;
        } else {
            out.push(if bytes[i] == b'+' { b' ' } else { bytes[i] });
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| ContextError::Url(e.to_string()))
}

fn percent_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0xF) as usize] as char);
        }
    }
    out
}

// ─── Persistence ─────────────────────────────────────────────────────────

/// Client-side key/value store holding one serialized context.
pub trait ContextStore {
    fn load(&self) -> Option<String>;
    fn save(&mut self, text: &str);
}

/// In-memory store; used natively and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub text: Option<String>,
    pub writes: usize,
}

impl ContextStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.text.clone()
    }

    fn save(&mut self, text: &str) {
        self.text = Some(text.to_string());
        self.writes += 1;
    }
}

/// Context to restore on load: URL parameter first, then the store.
/// Malformed sources are logged and skipped.
pub fn resolve_context(url_param: Option<&str>, store: &dyn ContextStore) -> Option<MapContext> {
    if let Some(param) = url_param.filter(|p| !p.trim().is_empty()) {
        match MapContext::from_url_param(param) {
            Ok(ctx) => return Some(ctx),
            Err(e) => log::warn!("ignoring URL context: {e}"),
        }
    }
    let stored = store.load()?;
    match MapContext::from_json(&stored) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            log::warn!("ignoring stored context: {e}");
            None
        }
    }
}

/// Writes the context back to the store only when it changed.
#[derive(Debug, Default)]
pub struct ContextTracker {
    last_saved: Option<MapContext>,
}

impl ContextTracker {
    pub fn new(initial: Option<MapContext>) -> Self {
        Self {
            last_saved: initial,
        }
    }

    pub fn current(&self) -> Option<&MapContext> {
        self.last_saved.as_ref()
    }

    /// Returns `true` if the store was written.
    pub fn update(&mut self, ctx: MapContext, store: &mut dyn ContextStore) -> bool {
        if self.last_saved.as_ref() == Some(&ctx) {
            return false;
        }
        store.save(&ctx.to_json());
        log::trace!("context saved: {}", ctx.to_url_param());
        self.last_saved = Some(ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MapContext {
        MapContext {
            viewport: Viewport {
                lat: 44.5,
                lng: 6.25,
                zoom: 13.0,
            },
            active_layer_names: vec!["trails".into(), "land use/zones".into()],
        }
    }

    #[test]
    fn parses_url_param() {
        let ctx = MapContext::from_url_param("13/44.5/6.25/trails,land%20use%2Fzones").unwrap();
        assert_eq!(ctx, sample());
    }

    #[test]
    fn url_param_without_layers() {
        let ctx = MapContext::from_url_param("7/-12.5/130").unwrap();
        assert!(ctx.active_layer_names.is_empty());
        assert_eq!(ctx.viewport.zoom, 7.0);
    }

    #[test]
    fn url_param_roundtrip() {
        let text = sample().to_url_param();
        assert_eq!(MapContext::from_url_param(&text).unwrap(), sample());
    }

    #[test]
    fn rejects_garbage_and_out_of_range() {
        assert!(matches!(
            MapContext::from_url_param("zoom/lat/lng"),
            Err(ContextError::Url(_))
        ));
        assert_eq!(
            MapContext::from_url_param("10/95/0"),
            Err(ContextError::OutOfRange("latitude"))
        );
        assert!(matches!(
            MapContext::from_url_param("10/45/0/bad%zz"),
            Err(ContextError::Url(_))
        ));
    }

    #[test]
    fn url_wins_over_store() {
        let mut store = MemoryStore::default();
        store.save(&sample().to_json());
        let ctx = resolve_context(Some("3/10/20"), &store).unwrap();
        assert_eq!(ctx.viewport.zoom, 3.0);
    }

    #[test]
    fn falls_back_to_store_on_bad_url() {
        let mut store = MemoryStore::default();
        store.save(&sample().to_json());
        assert_eq!(resolve_context(Some("nonsense"), &store), Some(sample()));
        assert_eq!(resolve_context(None, &MemoryStore::default()), None);
    }

    #[test]
    fn tracker_writes_only_on_change() {
        let mut store = MemoryStore::default();
        let mut tracker = ContextTracker::new(None);
        assert!(tracker.update(sample(), &mut store));
        assert!(!tracker.update(sample(), &mut store));
        let mut moved = sample();
        moved.viewport.zoom = 14.0;
        assert!(tracker.update(moved, &mut store));
        assert_eq!(store.writes, 2);
    }
}
