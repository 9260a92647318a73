//! Error types for canvas session lifecycle.

use thiserror::Error;

/// Failure reported by a drawing surface implementation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct SurfaceError(pub String);

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lifecycle misuse of a [`CanvasSession`](super::CanvasSession).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    /// The surface could not be created; the session is left disposed.
    #[error("Canvas initialization failed: {0}")]
    Initialization(String),

    /// The session has been disposed and cannot be used again.
    #[error("Canvas session is disposed")]
    Disposed,

    /// The session has no surface yet.
    #[error("Canvas session is not initialized")]
    NotInitialized,
}
