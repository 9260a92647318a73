//! Recognising the text under one annotation.
//!
//! Extraction, optional preprocessing and the pool call run in sequence.
//! The result carries the annotation id so a host can drop it when the
//! annotation was deleted while the engine was busy.

use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use super::pool::RecognitionPool;
use super::types::{BoundingBox, RecognitionConfig, RecognitionError};
use crate::canvas::SurfaceBackend;
use crate::config::AppConfig;
use crate::constants::TRANSIENT_ERROR_SECS;
use crate::extract::{PixelRect, PixelSource, extract_region, preprocess};
use crate::manager::{AnnotationError, AnnotationManager};
use crate::model::{Annotation, AnnotationFields, AnnotationId};
use crate::transform::to_canvas_rect;

/// Text recognised for one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub annotation_id: AnnotationId,
    pub text: String,
    /// Engine-native score, 0 to 100.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl RecognizedText {
    /// Whether the annotation went away while recognition was running.
    pub fn is_stale<B: SurfaceBackend>(&self, manager: &AnnotationManager<B>) -> bool {
        !manager.contains(&self.annotation_id)
    }

    /// Attach the text to its annotation. Stale results are dropped and
    /// yield `None`.
    pub fn apply<B: SurfaceBackend>(
        &self,
        manager: &mut AnnotationManager<B>,
    ) -> Result<Option<Annotation>, AnnotationError> {
        if self.is_stale(manager) {
            log::debug!(
                "Discarding recognition result for deleted annotation {}",
                self.annotation_id
            );
            return Ok(None);
        }
        manager.apply_fields(
            &self.annotation_id,
            &AnnotationFields::recognition(self.text.clone(), self.confidence),
        )
    }
}

/// A failed recognition, shown inline until it expires.
#[derive(Debug, Clone)]
pub struct RecognitionFailure {
    pub annotation_id: AnnotationId,
    pub message: String,
    pub error: RecognitionError,
    pub expires_at: Instant,
}

impl RecognitionFailure {
    fn new(annotation_id: AnnotationId, error: RecognitionError, ttl: Duration) -> Self {
        Self {
            annotation_id,
            message: error.to_string(),
            error,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Runs recognition for annotations against a shared pool.
pub struct RegionRecognizer {
    pool: Rc<RecognitionPool>,
    config: RecognitionConfig,
    preprocess: bool,
    error_ttl: Duration,
}

impl RegionRecognizer {
    pub fn new(pool: Rc<RecognitionPool>, config: RecognitionConfig) -> Self {
        Self {
            pool,
            config,
            preprocess: true,
            error_ttl: Duration::from_secs(TRANSIENT_ERROR_SECS),
        }
    }

    /// Recogniser using the recognition and preprocessing settings of `config`.
    pub fn from_config(pool: Rc<RecognitionPool>, config: &AppConfig) -> Self {
        Self::new(pool, config.recognition.clone()).with_preprocess(config.drawing.preprocess)
    }

    pub fn with_preprocess(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    pub fn with_error_ttl(mut self, ttl: Duration) -> Self {
        self.error_ttl = ttl;
        self
    }

    pub fn pool(&self) -> &RecognitionPool {
        &self.pool
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Recognise the text under `annotation`.
    ///
    /// `pixels` is the rendered page at `scale`, in device pixels at `dpr`.
    /// `Ok(None)` means there was nothing to read.
    pub async fn recognize_annotation(
        &self,
        pixels: &dyn PixelSource,
        annotation: &Annotation,
        scale: f64,
        dpr: f64,
    ) -> Result<Option<RecognizedText>, RecognitionFailure> {
        let rect = PixelRect::from_canvas_rect(&to_canvas_rect(&annotation.position, scale), dpr);
        let Some(region) = extract_region(pixels, rect) else {
            return Ok(None);
        };
        let region = if self.preprocess {
            preprocess(&region)
        } else {
            region
        };

        match self.pool.recognize(&self.config, &region).await {
            Ok(recognition) => {
                log::info!(
                    "Recognised '{}' ({:.1}%) for annotation {}",
                    recognition.text,
                    recognition.confidence,
                    annotation.id
                );
                Ok(Some(RecognizedText {
                    annotation_id: annotation.id.clone(),
                    text: recognition.text,
                    confidence: recognition.confidence,
                    bbox: recognition.bbox,
                }))
            }
            Err(e) => {
                log::warn!("Recognition failed for annotation {}: {}", annotation.id, e);
                Err(RecognitionFailure::new(
                    annotation.id.clone(),
                    e,
                    self.error_ttl,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::tests::fakes::FakeEngineFactory;
    use crate::transform::DocRect;

    fn page() -> RgbaImage {
        RgbaImage::from_pixel(400, 300, Rgba([200, 200, 200, 255]))
    }

    fn annotation() -> Annotation {
        Annotation::new("tag-1".into(), DocRect::new(10.0, 10.0, 50.0, 20.0)).expect("valid")
    }

    fn recognizer(factory: FakeEngineFactory) -> RegionRecognizer {
        RegionRecognizer::new(
            Rc::new(RecognitionPool::new(factory)),
            RecognitionConfig::default(),
        )
    }

    fn run(
        recognizer: &RegionRecognizer,
        scale: f64,
    ) -> Result<Option<RecognizedText>, RecognitionFailure> {
        pollster::block_on(recognizer.recognize_annotation(&page(), &annotation(), scale, 1.0))
    }

    #[test]
    fn test_recognize_annotation() {
        let factory = FakeEngineFactory::new();
        let controls = factory.controls();
        controls.set_word(
            "PT-3",
            77.0,
            BoundingBox {
                x0: 1.0,
                y0: 2.0,
                x1: 30.0,
                y1: 18.0,
            },
        );
        let recognizer = recognizer(factory);

        let result = run(&recognizer, 2.0)
            .expect("no failure")
            .expect("region in bounds");
        assert_eq!(result.annotation_id.as_str(), "tag-1");
        assert_eq!(result.text, "PT-3");
        assert_eq!(result.confidence, 77.0);
        assert_eq!(result.bbox.x1, 30.0);
        assert_eq!(controls.recognize_calls.get(), 1);
    }

    #[test]
    fn test_region_outside_page_is_nothing() {
        let factory = FakeEngineFactory::new();
        let controls = factory.controls();
        let recognizer = recognizer(factory);

        assert!(matches!(run(&recognizer, 20.0), Ok(None)));
        assert_eq!(controls.recognize_calls.get(), 0);
    }

    #[test]
    fn test_failure_expires() {
        let factory = FakeEngineFactory::new();
        factory.controls().fail_recognize.set(true);
        let recognizer = recognizer(factory).with_error_ttl(Duration::from_secs(3));

        let failure = run(&recognizer, 1.0).unwrap_err();
        assert_eq!(failure.annotation_id.as_str(), "tag-1");
        assert!(failure.message.contains("simulated engine crash"));
        assert!(!failure.is_expired(Instant::now()));
        assert!(failure.is_expired(failure.expires_at + Duration::from_millis(1)));
    }

    #[test]
    fn test_from_config_uses_recognition_settings() {
        let mut config = AppConfig::default();
        config.recognition.language = "deu".to_string();
        config.drawing.preprocess = false;
        let factory = FakeEngineFactory::new();
        let controls = factory.controls();
        let recognizer =
            RegionRecognizer::from_config(Rc::new(RecognitionPool::new(factory)), &config);

        assert_eq!(recognizer.config().language, "deu");
        assert!(!recognizer.preprocess);
        run(&recognizer, 1.0).expect("no failure");
        assert_eq!(*controls.languages.borrow(), vec!["deu".to_string()]);
    }
}
