//! Single-flight pool around one stateful recognition engine.
//!
//! The pool lazily starts a single engine. Callers that arrive while the
//! engine is starting all await the same initialisation, so two engines are
//! never started side by side. A failed start puts the pool back to
//! unstarted and the next call retries from scratch.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use image::RgbaImage;
use web_time::Instant;

use super::engine::{EngineFactory, RecognitionEngine};
use super::types::{EngineParameters, Recognition, RecognitionConfig, RecognitionError};

/// Shared handle to a ready engine.
pub type EngineHandle = Rc<dyn RecognitionEngine>;

type InitFuture = Shared<LocalBoxFuture<'static, Result<EngineHandle, RecognitionError>>>;

enum PoolState {
    Unstarted,
    Starting(InitFuture),
    Ready(EngineHandle),
}

/// Observable pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Unstarted,
    Starting,
    Ready,
}

struct PoolInner {
    state: PoolState,
    /// Bumped on every reset; a start that finishes under an older
    /// generation does not publish its engine.
    generation: u64,
}

/// Lazily started, single-instance recognition engine.
pub struct RecognitionPool {
    factory: Rc<dyn EngineFactory>,
    inner: Rc<RefCell<PoolInner>>,
    init_runs: Cell<u64>,
}

impl RecognitionPool {
    pub fn new(factory: impl EngineFactory + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
            inner: Rc::new(RefCell::new(PoolInner {
                state: PoolState::Unstarted,
                generation: 0,
            })),
            init_runs: Cell::new(0),
        }
    }

    pub fn status(&self) -> PoolStatus {
        match self.inner.borrow().state {
            PoolState::Unstarted => PoolStatus::Unstarted,
            PoolState::Starting(_) => PoolStatus::Starting,
            PoolState::Ready(_) => PoolStatus::Ready,
        }
    }

    /// Number of initialisation sequences started so far.
    pub fn init_runs(&self) -> u64 {
        self.init_runs.get()
    }

    /// Return the engine, starting it with `config` if needed.
    ///
    /// While a start is in flight every caller awaits it and receives the
    /// same handle, or the same error. `config` only matters for the call
    /// that triggers the start.
    pub async fn get_worker(
        &self,
        config: &RecognitionConfig,
    ) -> Result<EngineHandle, RecognitionError> {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            let generation = inner.generation;
            match &inner.state {
                PoolState::Ready(engine) => return Ok(Rc::clone(engine)),
                PoolState::Starting(init) => init.clone(),
                PoolState::Unstarted => {
                    let init = self.start(config.clone(), generation);
                    inner.state = PoolState::Starting(init.clone());
                    init
                }
            }
        };
        pending.await
    }

    fn start(&self, config: RecognitionConfig, generation: u64) -> InitFuture {
        self.init_runs.set(self.init_runs.get() + 1);
        let factory = Rc::clone(&self.factory);
        let inner: Weak<RefCell<PoolInner>> = Rc::downgrade(&self.inner);

        async move {
            let started = Instant::now();
            log::info!(
                "Starting recognition engine (language {}, {:?})",
                config.language,
                config.mode
            );
            let result = start_engine(factory.as_ref(), &config).await;

            match &result {
                Ok(_) => log::info!("Recognition engine ready in {:?}", started.elapsed()),
                Err(e) => log::error!("Failed to start recognition engine: {}", e),
            }

            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.borrow_mut();
                if inner.generation == generation {
                    inner.state = match &result {
                        Ok(engine) => PoolState::Ready(Rc::clone(engine)),
                        Err(_) => PoolState::Unstarted,
                    };
                }
            }
            result
        }
        .boxed_local()
        .shared()
    }

    /// Recognise `image` with the pooled engine, starting it if needed.
    ///
    /// An engine failure resets the pool so the next call starts afresh.
    /// Overlapping calls are passed straight to the engine.
    pub async fn recognize(
        &self,
        config: &RecognitionConfig,
        image: &RgbaImage,
    ) -> Result<Recognition, RecognitionError> {
        let engine = self.get_worker(config).await?;
        match engine.recognize(image).await {
            Ok(output) => Ok(Recognition::from(output)),
            Err(e) => {
                log::error!("Recognition failed, resetting engine: {}", e);
                self.discard(&engine).await;
                Err(e)
            }
        }
    }

    /// Drop `engine` if it is still the published one.
    async fn discard(&self, engine: &EngineHandle) {
        let current = {
            let mut inner = self.inner.borrow_mut();
            match &inner.state {
                PoolState::Ready(ready) if Rc::ptr_eq(ready, engine) => {
                    inner.generation += 1;
                    inner.state = PoolState::Unstarted;
                    true
                }
                _ => false,
            }
        };
        if current {
            shutdown(engine.as_ref()).await;
        }
    }

    /// Tear down the engine and return to unstarted. Idempotent; teardown
    /// failures are logged.
    ///
    /// A start in flight is awaited and its engine shut down; callers that
    /// were waiting on it still receive the handle.
    pub async fn terminate(&self) {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            inner.generation += 1;
            std::mem::replace(&mut inner.state, PoolState::Unstarted)
        };
        let engine = match previous {
            PoolState::Unstarted => return,
            PoolState::Ready(engine) => engine,
            PoolState::Starting(init) => match init.await {
                Ok(engine) => engine,
                Err(_) => return,
            },
        };
        shutdown(engine.as_ref()).await;
        log::info!("Recognition engine terminated");
    }
}

async fn configure(
    engine: &dyn RecognitionEngine,
    config: &RecognitionConfig,
) -> Result<(), RecognitionError> {
    engine.load_language(&config.language).await?;
    engine.initialize(&config.language).await?;
    engine
        .set_parameters(&EngineParameters::from(config))
        .await
}

async fn start_engine(
    factory: &dyn EngineFactory,
    config: &RecognitionConfig,
) -> Result<EngineHandle, RecognitionError> {
    let engine: EngineHandle = Rc::from(factory.create().await.map_err(as_initialization)?);
    if let Err(e) = configure(engine.as_ref(), config).await {
        shutdown(engine.as_ref()).await;
        return Err(as_initialization(e));
    }
    Ok(engine)
}

async fn shutdown(engine: &dyn RecognitionEngine) {
    if let Err(e) = engine.terminate().await {
        log::warn!("Error terminating recognition engine: {}", e);
    }
}

fn as_initialization(error: RecognitionError) -> RecognitionError {
    match error {
        RecognitionError::Initialization(_) => error,
        other => RecognitionError::Initialization(other.to_string()),
    }
}

thread_local! {
    static SHARED_POOL: OnceCell<Rc<RecognitionPool>> = const { OnceCell::new() };
}

/// The pool shared by everything on this thread, built by `init` on first use.
pub fn shared_pool(init: impl FnOnce() -> RecognitionPool) -> Rc<RecognitionPool> {
    SHARED_POOL.with(|cell| Rc::clone(cell.get_or_init(|| Rc::new(init()))))
}
