//! Text recognition: engine seam, single-flight pool and the annotation
//! pipeline.

mod engine;
mod pipeline;
mod pool;
mod tesseract;
mod types;

pub use engine::{EngineFactory, RecognitionEngine};
pub use pipeline::{RecognitionFailure, RecognizedText, RegionRecognizer};
pub use pool::{EngineHandle, PoolStatus, RecognitionPool, shared_pool};
pub use tesseract::{TesseractCli, TesseractFactory, parse_tsv};
pub use types::{
    BoundingBox, DEFAULT_WHITELIST, EngineOutput, EngineParameters, Recognition,
    RecognitionConfig, RecognitionError, RecognitionMode, RecognizedWord,
};
