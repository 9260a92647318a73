//! Canvas session: owns one live surface bound to one element.
//!
//! Lifecycle is `Uninitialized -> Active -> Disposed`. Re-initialising an
//! active session tears the old surface down first, so two surfaces never
//! fight over one element.

use serde::{Deserialize, Serialize};

use super::error::CanvasError;
use super::surface::{Interactivity, Surface, SurfaceBackend, SurfaceOptions};
use crate::transform::{CanvasPoint, ViewportTransform, ViewportUpdate};

/// Pointer interaction mode of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Select,
    Draw,
}

/// Size, mode and viewport of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub mode: InteractionMode,
    pub transform: ViewportTransform,
}

impl CanvasConfig {
    /// Select mode with an identity viewport.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            mode: InteractionMode::Select,
            transform: ViewportTransform::identity(width, height),
        }
    }

    pub fn with_mode(mut self, mode: InteractionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_transform(mut self, transform: ViewportTransform) -> Self {
        self.transform = transform;
        self
    }

    fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            width: self.width,
            height: self.height,
            selection: self.mode == InteractionMode::Select,
            preserve_object_stacking: true,
            render_on_add_remove: true,
            enable_retina_scaling: true,
            device_pixel_ratio: self.transform.dimensions().dpr,
        }
    }
}

/// Partial config change; only the present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasConfigUpdate {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub mode: Option<InteractionMode>,
    pub transform: Option<ViewportTransform>,
}

impl CanvasConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn mode(mut self, mode: InteractionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn transform(mut self, transform: ViewportTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.mode.is_none()
            && self.transform.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Disposed,
}

/// Exclusive owner of one live drawing surface.
///
/// Not `Clone`: the handle moves between owners. Dropping it disposes the
/// surface.
pub struct CanvasSession<B: SurfaceBackend> {
    backend: B,
    surface: Option<Box<dyn Surface>>,
    config: Option<CanvasConfig>,
    state: SessionState,
}

impl<B: SurfaceBackend> CanvasSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            surface: None,
            config: None,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_not_disposed(&self) -> Result<(), CanvasError> {
        if self.state == SessionState::Disposed {
            Err(CanvasError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Bind a new surface to `element`, tearing down any current one first.
    ///
    /// On failure the session is left disposed.
    pub fn initialize(
        &mut self,
        element: &B::Element,
        config: CanvasConfig,
    ) -> Result<(), CanvasError> {
        self.ensure_not_disposed()?;

        if self.state == SessionState::Active {
            log::debug!("Re-initializing active canvas session, disposing previous surface");
            self.teardown();
        }

        if !(config.width > 0.0 && config.height > 0.0) {
            log::error!(
                "Refusing to create canvas of size {}x{}",
                config.width,
                config.height
            );
            self.mark_disposed();
            return Err(CanvasError::Initialization(format!(
                "invalid canvas size {}x{}",
                config.width, config.height
            )));
        }

        match self.backend.create_surface(element, &config.surface_options()) {
            Ok(mut surface) => {
                surface.set_viewport_transform(config.transform.css_matrix());
                log::info!(
                    "Canvas initialized: {}x{} in {:?} mode",
                    config.width,
                    config.height,
                    config.mode
                );
                self.surface = Some(surface);
                self.config = Some(config);
                self.state = SessionState::Active;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to initialize canvas: {}", e);
                self.mark_disposed();
                Err(CanvasError::Initialization(e.to_string()))
            }
        }
    }

    /// Apply the supplied fields, then request a single re-render.
    pub fn update_config(&mut self, update: CanvasConfigUpdate) -> Result<(), CanvasError> {
        self.ensure_not_disposed()?;
        log::debug!("Updating canvas config: {:?}", update);
        let (Some(surface), Some(config)) = (self.surface.as_mut(), self.config.as_mut()) else {
            return Err(CanvasError::NotInitialized);
        };

        let resized = update.width.is_some() || update.height.is_some();
        if resized {
            config.width = update.width.unwrap_or(config.width);
            config.height = update.height.unwrap_or(config.height);
            surface.set_dimensions(config.width, config.height);
        }

        if let Some(mode) = update.mode {
            config.mode = mode;
            surface.set_selection(mode == InteractionMode::Select);
            let flags = Interactivity::for_mode(mode);
            for shape in surface.objects_mut() {
                shape.interactivity = flags;
            }
        }

        if let Some(transform) = update.transform {
            config.transform = transform;
            surface.set_viewport_transform(config.transform.css_matrix());
        } else if resized {
            // The pivot follows the visual centre of the resized canvas.
            config.transform.update(ViewportUpdate {
                width: Some(config.width),
                height: Some(config.height),
                ..Default::default()
            });
            surface.set_viewport_transform(config.transform.css_matrix());
        }

        surface.request_render_all();
        Ok(())
    }

    /// Release the surface. Idempotent and infallible: teardown errors are
    /// logged and cleanup continues.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        self.teardown();
        self.mark_disposed();
        log::debug!("Canvas session disposed");
    }

    fn mark_disposed(&mut self) {
        self.surface = None;
        self.config = None;
        self.state = SessionState::Disposed;
    }

    fn teardown(&mut self) {
        let Some(mut surface) = self.surface.take() else {
            return;
        };
        if let Err(e) = surface.detach_listeners() {
            log::warn!("Error detaching canvas listeners: {}", e);
        }
        if let Err(e) = surface.clear() {
            log::warn!("Error clearing canvas: {}", e);
        }
        if let Err(e) = surface.dispose() {
            log::warn!("Error disposing canvas: {}", e);
        }
    }

    pub fn config(&self) -> Result<&CanvasConfig, CanvasError> {
        self.ensure_not_disposed()?;
        self.config.as_ref().ok_or(CanvasError::NotInitialized)
    }

    pub fn mode(&self) -> Result<InteractionMode, CanvasError> {
        Ok(self.config()?.mode)
    }

    pub fn surface(&self) -> Result<&(dyn Surface + 'static), CanvasError> {
        self.ensure_not_disposed()?;
        self.surface.as_deref().ok_or(CanvasError::NotInitialized)
    }

    pub fn surface_mut(&mut self) -> Result<&mut (dyn Surface + 'static), CanvasError> {
        self.ensure_not_disposed()?;
        self.surface.as_deref_mut().ok_or(CanvasError::NotInitialized)
    }

    /// Map an element-local pointer position into canvas space.
    pub fn pointer(&self, x: f64, y: f64) -> Result<CanvasPoint, CanvasError> {
        Ok(self.config()?.transform.pointer_to_canvas(x, y))
    }

    pub fn request_render(&mut self) -> Result<(), CanvasError> {
        self.surface_mut()?.request_render_all();
        Ok(())
    }
}

impl<B: SurfaceBackend> Drop for CanvasSession<B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
