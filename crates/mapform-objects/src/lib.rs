pub mod config;
pub mod event;
pub mod interaction;
pub mod layer;
pub mod paint;

pub use config::{LayerConfig, LayerMode};
pub use event::{LayerEffect, LayerEvent, LayerObserver, ObjectInput, PointerSource, SubscriptionId};
pub use interaction::InteractionEngine;
pub use layer::{CatalogEntry, LayerError, Membership, ObjectLayer, RenderedObject};
pub use paint::{Color, Paint, PaintStyles, ResolvedPaint};
