//! Recognition configuration, results and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::psm;

/// Characters accepted by default: tag numbers are upper-case
/// alphanumerics with dashes.
pub const DEFAULT_WHITELIST: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-";

/// Page segmentation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionMode {
    /// The region holds one line of text.
    #[default]
    SingleLine,
    /// The region is a block of text with automatic layout analysis.
    Document,
}

impl RecognitionMode {
    /// Tesseract page segmentation mode for this strategy.
    pub fn page_segmentation_mode(&self) -> u8 {
        match self {
            RecognitionMode::SingleLine => psm::SINGLE_LINE,
            RecognitionMode::Document => psm::AUTO,
        }
    }
}

/// Engine configuration supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub language: String,
    #[serde(default)]
    pub mode: RecognitionMode,
    /// Restrict recognised characters to this set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<String>,
    /// Advisory only; results are not filtered by it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            mode: RecognitionMode::SingleLine,
            whitelist: Some(DEFAULT_WHITELIST.to_string()),
            confidence: None,
        }
    }
}

/// Parameters pushed to an engine after initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParameters {
    pub page_segmentation_mode: u8,
    pub char_whitelist: Option<String>,
}

impl From<&RecognitionConfig> for EngineParameters {
    fn from(config: &RecognitionConfig) -> Self {
        Self {
            page_segmentation_mode: config.mode.page_segmentation_mode(),
            char_whitelist: config.whitelist.clone().filter(|w| !w.is_empty()),
        }
    }
}

/// Pixel box `(x0, y0)`-`(x1, y1)` inside the recognised image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// One recognised word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Raw engine output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineOutput {
    pub text: String,
    /// Engine-native score, 0 to 100.
    pub confidence: f64,
    pub words: Vec<RecognizedWord>,
}

/// Result of one recognise call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Trimmed text.
    pub text: String,
    pub confidence: f64,
    /// First word box, or a zero box when the engine reported none.
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<RecognizedWord>,
}

impl From<EngineOutput> for Recognition {
    fn from(output: EngineOutput) -> Self {
        let bbox = output.words.first().map(|w| w.bbox).unwrap_or_default();
        Self {
            text: output.text.trim().to_string(),
            confidence: output.confidence.clamp(0.0, 100.0),
            bbox,
            words: output.words,
        }
    }
}

/// Recognition failures.
///
/// `Clone` so that one failed start can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecognitionError {
    #[error("Recognition engine failed to start: {0}")]
    Initialization(String),

    #[error("Recognition failed: {0}")]
    Engine(String),

    #[error("Recognition engine was terminated")]
    Terminated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde_names() {
        let config: RecognitionConfig =
            serde_json::from_str(r#"{"language":"eng","mode":"document"}"#).expect("parse");
        assert_eq!(config.mode, RecognitionMode::Document);
        assert_eq!(config.whitelist, None);
        assert_eq!(
            serde_json::to_value(RecognitionMode::SingleLine).expect("serialize"),
            "single-line"
        );
    }

    #[test]
    fn test_parameters_from_config() {
        let params = EngineParameters::from(&RecognitionConfig::default());
        assert_eq!(params.page_segmentation_mode, 7);
        assert_eq!(params.char_whitelist.as_deref(), Some(DEFAULT_WHITELIST));

        let doc = RecognitionConfig {
            mode: RecognitionMode::Document,
            whitelist: Some(String::new()),
            ..Default::default()
        };
        let params = EngineParameters::from(&doc);
        assert_eq!(params.page_segmentation_mode, 3);
        assert_eq!(params.char_whitelist, None);
    }

    #[test]
    fn test_recognition_defaults_to_zero_box() {
        let recognition = Recognition::from(EngineOutput {
            text: "  P-101\n".to_string(),
            confidence: 87.5,
            words: Vec::new(),
        });
        assert_eq!(recognition.text, "P-101");
        assert_eq!(recognition.bbox, BoundingBox::default());
    }
}
