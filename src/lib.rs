//! planmark - tag annotation for engineering drawings
//!
//! Users drag rectangles over a rendered drawing page. Each rectangle is
//! stored in document space, mirrored onto a scaled canvas, and its pixels
//! can be handed to a text recognition engine to read the tag inside.

pub mod canvas;
pub mod config;
pub mod constants;
pub mod drawing;
pub mod extract;
pub mod manager;
pub mod model;
pub mod recognition;
pub mod state;
pub mod transform;

#[cfg(test)]
mod tests;

pub use canvas::{CanvasConfig, CanvasSession, InteractionMode};
pub use config::AppConfig;
pub use drawing::{DrawingMachine, GestureOutcome, PointerEvent};
pub use manager::{AnnotationError, AnnotationManager};
pub use model::{Annotation, AnnotationId};
pub use recognition::{RecognitionConfig, RecognitionPool, RegionRecognizer};
