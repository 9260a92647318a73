//! Canvas session lifecycle and the drawing surface abstraction.

mod error;
mod session;
mod surface;

pub use error::{CanvasError, SurfaceError};
pub use session::{CanvasConfig, CanvasConfigUpdate, CanvasSession, InteractionMode, SessionState};
pub use surface::{
    HeadlessBackend, HeadlessElement, HeadlessSurface, Interactivity, Shape, ShapeRole,
    ShapeStyle, Surface, SurfaceBackend, SurfaceOptions,
};
