//! Drawing surface abstraction and the headless implementation.
//!
//! A surface is the retained scene bound to one canvas element: a list of
//! shapes, a size, a viewport matrix and a selection flag. Backends create
//! surfaces from elements.

use super::error::SurfaceError;
use super::session::InteractionMode;
use crate::constants::style;
use crate::model::{AnnotationId, AnnotationStyle};
use crate::transform::{CanvasRect, Matrix6};

/// Per-shape interaction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interactivity {
    pub selectable: bool,
    pub evented: bool,
    pub has_controls: bool,
    pub has_borders: bool,
}

impl Interactivity {
    pub const NONE: Interactivity = Interactivity {
        selectable: false,
        evented: false,
        has_controls: false,
        has_borders: false,
    };

    pub const FULL: Interactivity = Interactivity {
        selectable: true,
        evented: true,
        has_controls: true,
        has_borders: true,
    };

    /// Shapes are only interactive in select mode.
    pub fn for_mode(mode: InteractionMode) -> Self {
        match mode {
            InteractionMode::Select => Self::FULL,
            InteractionMode::Draw => Self::NONE,
        }
    }
}

/// What a shape on the surface represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRole {
    /// The live representation of a committed annotation.
    Annotation,
    /// The rubber-band box of a gesture in progress.
    Provisional,
}

/// Render style of a shape, already divided by the active scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
    pub corner_size: f64,
    pub opacity: f64,
}

impl ShapeStyle {
    pub fn scaled(base: &AnnotationStyle, scale: f64) -> Self {
        Self {
            fill: base.fill.clone(),
            stroke: base.stroke.clone(),
            stroke_width: base.stroke_width / scale,
            corner_size: style::CORNER_SIZE / scale,
            opacity: base.opacity,
        }
    }
}

/// A renderable rectangle in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: AnnotationId,
    pub role: ShapeRole,
    pub rect: CanvasRect,
    pub style: ShapeStyle,
    pub interactivity: Interactivity,
}

/// Options a surface is created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    pub width: f64,
    pub height: f64,
    /// Group selection enabled.
    pub selection: bool,
    pub preserve_object_stacking: bool,
    pub render_on_add_remove: bool,
    /// Scale the backing store by the device pixel ratio.
    pub enable_retina_scaling: bool,
    pub device_pixel_ratio: f64,
}

/// One live drawing surface.
///
/// Mutations do not render by themselves; callers batch them and finish
/// with a single [`Surface::request_render_all`].
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Resize without recreating; shapes are kept.
    fn set_dimensions(&mut self, width: f64, height: f64);

    fn selection(&self) -> bool;
    fn set_selection(&mut self, enabled: bool);

    fn viewport_transform(&self) -> Matrix6;
    fn set_viewport_transform(&mut self, matrix: Matrix6);

    /// Shapes in stacking order.
    fn objects(&self) -> &[Shape];
    fn objects_mut(&mut self) -> &mut [Shape];
    fn add(&mut self, shape: Shape);
    fn remove(&mut self, id: &AnnotationId) -> Option<Shape>;

    fn request_render_all(&mut self);

    /// Drop every pointer and object listener.
    fn detach_listeners(&mut self) -> Result<(), SurfaceError>;
    /// Remove every shape.
    fn clear(&mut self) -> Result<(), SurfaceError>;
    /// Release the underlying resources. The surface is unusable afterwards.
    fn dispose(&mut self) -> Result<(), SurfaceError>;
}

/// Creates surfaces bound to host elements.
pub trait SurfaceBackend {
    type Element;

    fn create_surface(
        &mut self,
        element: &Self::Element,
        options: &SurfaceOptions,
    ) -> Result<Box<dyn Surface>, SurfaceError>;
}

/// Element handle for the headless backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessElement {
    pub id: String,
    /// Whether the element is attached to a document.
    pub connected: bool,
}

impl HeadlessElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: true,
        }
    }

    pub fn detached(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: false,
        }
    }
}

/// Backend producing in-memory surfaces, for offscreen use and tests.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    created: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of surfaces created so far.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl SurfaceBackend for HeadlessBackend {
    type Element = HeadlessElement;

    fn create_surface(
        &mut self,
        element: &HeadlessElement,
        options: &SurfaceOptions,
    ) -> Result<Box<dyn Surface>, SurfaceError> {
        if element.id.trim().is_empty() {
            return Err(SurfaceError::new("element has no id"));
        }
        if !element.connected {
            return Err(SurfaceError::new(format!(
                "element '{}' is not attached to a document",
                element.id
            )));
        }
        self.created += 1;
        Ok(Box::new(HeadlessSurface::new(&element.id, options)))
    }
}

/// In-memory scene.
#[derive(Debug)]
pub struct HeadlessSurface {
    element_id: String,
    width: f64,
    height: f64,
    selection: bool,
    viewport: Matrix6,
    objects: Vec<Shape>,
    render_requests: u64,
    disposed: bool,
}

impl HeadlessSurface {
    pub fn new(element_id: &str, options: &SurfaceOptions) -> Self {
        Self {
            element_id: element_id.to_string(),
            width: options.width,
            height: options.height,
            selection: options.selection,
            viewport: Matrix6::IDENTITY,
            objects: Vec::new(),
            render_requests: 0,
            disposed: false,
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }
}

impl Surface for HeadlessSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn set_dimensions(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn selection(&self) -> bool {
        self.selection
    }

    fn set_selection(&mut self, enabled: bool) {
        self.selection = enabled;
    }

    fn viewport_transform(&self) -> Matrix6 {
        self.viewport
    }

    fn set_viewport_transform(&mut self, matrix: Matrix6) {
        self.viewport = matrix;
    }

    fn objects(&self) -> &[Shape] {
        &self.objects
    }

    fn objects_mut(&mut self) -> &mut [Shape] {
        &mut self.objects
    }

    fn add(&mut self, shape: Shape) {
        self.objects.push(shape);
    }

    fn remove(&mut self, id: &AnnotationId) -> Option<Shape> {
        let index = self.objects.iter().position(|s| &s.id == id)?;
        Some(self.objects.remove(index))
    }

    fn request_render_all(&mut self) {
        self.render_requests += 1;
    }

    fn detach_listeners(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.objects.clear();
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), SurfaceError> {
        if self.disposed {
            return Err(SurfaceError::new("surface already disposed"));
        }
        self.disposed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SurfaceOptions {
        SurfaceOptions {
            width: 800.0,
            height: 600.0,
            selection: true,
            preserve_object_stacking: true,
            render_on_add_remove: true,
            enable_retina_scaling: true,
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_headless_backend_rejects_detached_element() {
        let mut backend = HeadlessBackend::new();
        assert!(
            backend
                .create_surface(&HeadlessElement::detached("page"), &options())
                .is_err()
        );
        assert!(
            backend
                .create_surface(&HeadlessElement::new(""), &options())
                .is_err()
        );
        assert_eq!(backend.created(), 0);

        assert!(
            backend
                .create_surface(&HeadlessElement::new("page"), &options())
                .is_ok()
        );
        assert_eq!(backend.created(), 1);
    }

    #[test]
    fn test_headless_surface_shapes() {
        let mut surface = HeadlessSurface::new("page", &options());
        let shape = Shape {
            id: "a".into(),
            role: ShapeRole::Annotation,
            rect: CanvasRect::new(1.0, 2.0, 3.0, 4.0),
            style: ShapeStyle::scaled(&AnnotationStyle::default(), 2.0),
            interactivity: Interactivity::FULL,
        };
        surface.add(shape.clone());
        assert_eq!(surface.objects().len(), 1);
        assert_eq!(surface.objects()[0].style.stroke_width, 1.0);
        assert_eq!(surface.remove(&"a".into()), Some(shape));
        assert!(surface.remove(&"a".into()).is_none());
    }

    #[test]
    fn test_interactivity_per_mode() {
        assert_eq!(
            Interactivity::for_mode(InteractionMode::Select),
            Interactivity::FULL
        );
        assert_eq!(
            Interactivity::for_mode(InteractionMode::Draw),
            Interactivity::NONE
        );
    }
}
