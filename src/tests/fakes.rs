//! In-memory stand-ins for the recognition engine.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use image::RgbaImage;

use crate::recognition::{
    BoundingBox, EngineFactory, EngineOutput, EngineParameters, RecognitionEngine,
    RecognitionError, RecognizedWord,
};

/// Suspends once, so concurrent callers interleave.
pub struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub fn yield_now() -> YieldNow {
    YieldNow(false)
}

/// Counters and switches shared by a fake factory and its engines.
#[derive(Default)]
pub struct EngineControls {
    pub created: Cell<u32>,
    pub terminated: Cell<u32>,
    /// Number of upcoming `load_language` calls that fail.
    pub fail_loads: Cell<u32>,
    pub fail_recognize: Cell<bool>,
    pub recognize_calls: Cell<u32>,
    pub languages: RefCell<Vec<String>>,
    pub parameters: RefCell<Vec<EngineParameters>>,
    pub output: RefCell<EngineOutput>,
}

impl EngineControls {
    pub fn set_output(&self, text: &str, confidence: f64) {
        *self.output.borrow_mut() = EngineOutput {
            text: text.to_string(),
            confidence,
            words: Vec::new(),
        };
    }

    pub fn set_word(&self, text: &str, confidence: f64, bbox: BoundingBox) {
        *self.output.borrow_mut() = EngineOutput {
            text: text.to_string(),
            confidence,
            words: vec![RecognizedWord {
                text: text.to_string(),
                confidence,
                bbox,
            }],
        };
    }
}

#[derive(Default)]
pub struct FakeEngineFactory {
    controls: Rc<EngineControls>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> Rc<EngineControls> {
        Rc::clone(&self.controls)
    }
}

#[async_trait(?Send)]
impl EngineFactory for FakeEngineFactory {
    async fn create(&self) -> Result<Box<dyn RecognitionEngine>, RecognitionError> {
        yield_now().await;
        self.controls.created.set(self.controls.created.get() + 1);
        Ok(Box::new(FakeEngine {
            controls: Rc::clone(&self.controls),
            terminated: Cell::new(false),
        }))
    }
}

pub struct FakeEngine {
    controls: Rc<EngineControls>,
    terminated: Cell<bool>,
}

impl FakeEngine {
    fn check_alive(&self) -> Result<(), RecognitionError> {
        if self.terminated.get() {
            Err(RecognitionError::Terminated)
        } else {
            Ok(())
        }
    }
}

#[async_trait(?Send)]
impl RecognitionEngine for FakeEngine {
    async fn load_language(&self, language: &str) -> Result<(), RecognitionError> {
        self.check_alive()?;
        yield_now().await;
        let remaining = self.controls.fail_loads.get();
        if remaining > 0 {
            self.controls.fail_loads.set(remaining - 1);
            return Err(RecognitionError::Engine(format!(
                "simulated failure loading '{}'",
                language
            )));
        }
        self.controls.languages.borrow_mut().push(language.to_string());
        Ok(())
    }

    async fn initialize(&self, _language: &str) -> Result<(), RecognitionError> {
        self.check_alive()
    }

    async fn set_parameters(&self, parameters: &EngineParameters) -> Result<(), RecognitionError> {
        self.check_alive()?;
        self.controls.parameters.borrow_mut().push(parameters.clone());
        Ok(())
    }

    async fn recognize(&self, _image: &RgbaImage) -> Result<EngineOutput, RecognitionError> {
        self.check_alive()?;
        self.controls
            .recognize_calls
            .set(self.controls.recognize_calls.get() + 1);
        yield_now().await;
        if self.controls.fail_recognize.get() {
            return Err(RecognitionError::Engine("simulated engine crash".to_string()));
        }
        Ok(self.controls.output.borrow().clone())
    }

    async fn terminate(&self) -> Result<(), RecognitionError> {
        if !self.terminated.replace(true) {
            self.controls.terminated.set(self.controls.terminated.get() + 1);
        }
        Ok(())
    }
}
