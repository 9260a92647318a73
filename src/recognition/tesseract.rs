//! Engine backed by the `tesseract` command line tool.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use uuid::Uuid;

use super::engine::{EngineFactory, RecognitionEngine};
use super::types::{BoundingBox, EngineOutput, EngineParameters, RecognitionError, RecognizedWord};

/// Word rows of the TSV output have this level.
const WORD_LEVEL: &str = "5";

/// Runs `tesseract` once per recognise call.
pub struct TesseractCli {
    binary: PathBuf,
    language: RefCell<Option<String>>,
    parameters: RefCell<Option<EngineParameters>>,
    terminated: Cell<bool>,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            language: RefCell::new(None),
            parameters: RefCell::new(None),
            terminated: Cell::new(false),
        }
    }

    fn check_alive(&self) -> Result<(), RecognitionError> {
        if self.terminated.get() {
            Err(RecognitionError::Terminated)
        } else {
            Ok(())
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, RecognitionError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| {
                RecognitionError::Engine(format!(
                    "Failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Engine(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn recognize_file(&self, input: &Path) -> Result<EngineOutput, RecognitionError> {
        let language = self
            .language
            .borrow()
            .clone()
            .ok_or_else(|| RecognitionError::Engine("engine is not initialized".to_string()))?;

        let input = input.to_string_lossy();
        let mut args: Vec<String> = vec![
            input.into_owned(),
            "stdout".to_string(),
            "-l".to_string(),
            language,
        ];
        if let Some(parameters) = self.parameters.borrow().as_ref() {
            args.push("--psm".to_string());
            args.push(parameters.page_segmentation_mode.to_string());
            if let Some(whitelist) = &parameters.char_whitelist {
                args.push("-c".to_string());
                args.push(format!("tessedit_char_whitelist={}", whitelist));
            }
        }
        args.push("tsv".to_string());

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let tsv = self.run(&args)?;
        Ok(parse_tsv(&tsv))
    }
}

#[async_trait(?Send)]
impl RecognitionEngine for TesseractCli {
    async fn load_language(&self, language: &str) -> Result<(), RecognitionError> {
        self.check_alive()?;
        let listing = self.run(&["--list-langs"])?;
        // First line is a header
        if listing.lines().skip(1).any(|l| l.trim() == language) {
            Ok(())
        } else {
            Err(RecognitionError::Initialization(format!(
                "language '{}' is not installed",
                language
            )))
        }
    }

    async fn initialize(&self, language: &str) -> Result<(), RecognitionError> {
        self.check_alive()?;
        *self.language.borrow_mut() = Some(language.to_string());
        Ok(())
    }

    async fn set_parameters(&self, parameters: &EngineParameters) -> Result<(), RecognitionError> {
        self.check_alive()?;
        *self.parameters.borrow_mut() = Some(parameters.clone());
        Ok(())
    }

    async fn recognize(&self, image: &RgbaImage) -> Result<EngineOutput, RecognitionError> {
        self.check_alive()?;
        let input = std::env::temp_dir().join(format!("planmark_region_{}.png", Uuid::new_v4()));
        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| RecognitionError::Engine(format!("Failed to write temp image: {}", e)))?;

        let result = self.recognize_file(&input);
        let _ = std::fs::remove_file(&input);
        result
    }

    async fn terminate(&self) -> Result<(), RecognitionError> {
        self.terminated.set(true);
        self.language.borrow_mut().take();
        self.parameters.borrow_mut().take();
        Ok(())
    }
}

/// Creates [`TesseractCli`] engines after checking the binary runs.
pub struct TesseractFactory {
    binary: PathBuf,
}

impl TesseractFactory {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractFactory {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait(?Send)]
impl EngineFactory for TesseractFactory {
    async fn create(&self) -> Result<Box<dyn RecognitionEngine>, RecognitionError> {
        let engine = TesseractCli::new(self.binary.clone());
        let version = engine
            .run(&["--version"])
            .map_err(|e| RecognitionError::Initialization(e.to_string()))?;
        log::debug!(
            "Using {}",
            version.lines().next().unwrap_or("tesseract (unknown version)")
        );
        Ok(Box::new(engine))
    }
}

/// Parse `tesseract ... tsv` output.
///
/// Words on the same line are joined with spaces and lines with newlines.
/// Confidence is the mean word confidence; rows with a negative confidence
/// or no text are skipped.
pub fn parse_tsv(tsv: &str) -> EngineOutput {
    let mut words = Vec::new();
    let mut text = String::new();
    let mut current_line: Option<(&str, &str, &str)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let word = cols[11].trim();
        let Ok(confidence) = cols[10].trim().parse::<f64>() else {
            continue;
        };
        if word.is_empty() || confidence < 0.0 {
            continue;
        }
        let number = |i: usize| cols[i].trim().parse::<f64>().unwrap_or(0.0);
        let (left, top, width, height) = (number(6), number(7), number(8), number(9));

        let line = (cols[2], cols[3], cols[4]);
        match current_line {
            Some(prev) if prev == line => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line);
        text.push_str(word);

        words.push(RecognizedWord {
            text: word.to_string(),
            confidence,
            bbox: BoundingBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        });
    }

    let confidence = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
    };

    EngineOutput {
        text,
        confidence,
        words,
    }
}
