pub mod capture;
pub mod config;
pub mod event;
pub mod policy;
pub mod ready;
pub mod router;
pub mod session;

pub use capture::{GeometryCapture, GeometryField};
pub use config::{EditorConfig, FieldConfig};
pub use event::{DrawEvent, SurfaceEffect};
pub use policy::{DrawControls, DrawTool};
pub use ready::InitError;
pub use router::{EditorError, FieldRouter, Readiness, SurfaceStatus};
pub use session::{DrawMode, DrawSession};
