//! The seam between the pool and a concrete recognition engine.

use async_trait::async_trait;
use image::RgbaImage;

use super::types::{EngineOutput, EngineParameters, RecognitionError};

/// A stateful text recognition engine.
///
/// Engines are driven from one thread. Calls are not queued by the caller;
/// an engine that cannot run two `recognize` calls at once must serialise
/// them itself.
#[async_trait(?Send)]
pub trait RecognitionEngine {
    /// Load the trained data for `language`.
    async fn load_language(&self, language: &str) -> Result<(), RecognitionError>;

    /// Make `language` the active language.
    async fn initialize(&self, language: &str) -> Result<(), RecognitionError>;

    async fn set_parameters(&self, parameters: &EngineParameters) -> Result<(), RecognitionError>;

    async fn recognize(&self, image: &RgbaImage) -> Result<EngineOutput, RecognitionError>;

    /// Release the engine. Further calls may fail.
    async fn terminate(&self) -> Result<(), RecognitionError>;
}

/// Creates engine instances for the pool.
#[async_trait(?Send)]
pub trait EngineFactory {
    async fn create(&self) -> Result<Box<dyn RecognitionEngine>, RecognitionError>;
}
