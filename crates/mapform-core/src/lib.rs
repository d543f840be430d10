pub mod context;
pub mod error;
pub mod id;
pub mod kind;
pub mod measure;
pub mod model;
pub mod normalize;

pub use context::{ContextStore, ContextTracker, MapContext, MemoryStore, Viewport, resolve_context};
pub use error::GeometryError;
pub use id::{FeatureId, FieldId, ObjectKey};
pub use kind::{Capabilities, Family, GeometryKind};
pub use model::*;
pub use normalize::{CollectionEncoding, accept_shape, parse_field_value, serialize_shapes};
