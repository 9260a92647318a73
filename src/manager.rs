//! Annotation manager: keeps annotation records and their live shapes in sync.
//!
//! Records are stored in document space. Shapes on the surface carry the
//! same geometry multiplied by the current scale; every scale change
//! re-derives them from the records.

use std::collections::HashMap;

use thiserror::Error;

use crate::canvas::{
    CanvasConfigUpdate, CanvasError, CanvasSession, InteractionMode, Interactivity, Shape,
    ShapeRole, ShapeStyle, SurfaceBackend,
};
use crate::model::{
    Annotation, AnnotationConfig, AnnotationEvent, AnnotationFields, AnnotationId,
    AnnotationStyle, AnnotationUpdate, ValidationError, validate_position, validate_scale,
};
use crate::transform::{CanvasPoint, CanvasRect, DocRect, to_canvas_rect, to_document_rect};

/// Errors from annotation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

/// Callback fired with the new record after a shape was moved or resized.
pub type ModifiedObserver = Box<dyn FnMut(&Annotation)>;

struct Entry {
    annotation: Annotation,
    style: AnnotationStyle,
}

/// Creates, updates and deletes annotation shapes on a canvas session.
pub struct AnnotationManager<B: SurfaceBackend> {
    session: CanvasSession<B>,
    scale: f64,
    entries: Vec<Entry>,
    observers: HashMap<AnnotationId, Vec<ModifiedObserver>>,
    events: Vec<AnnotationEvent>,
    selected: Option<AnnotationId>,
}

impl<B: SurfaceBackend> AnnotationManager<B> {
    pub fn new(session: CanvasSession<B>, scale: f64) -> Result<Self, AnnotationError> {
        validate_scale(scale)?;
        Ok(Self {
            session,
            scale,
            entries: Vec::new(),
            observers: HashMap::new(),
            events: Vec::new(),
            selected: None,
        })
    }

    pub fn session(&self) -> &CanvasSession<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CanvasSession<B> {
        &mut self.session
    }

    /// Current zoom scale used to map document space to canvas space.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mode(&self) -> Result<InteractionMode, AnnotationError> {
        Ok(self.session.mode()?)
    }

    pub fn set_mode(&mut self, mode: InteractionMode) -> Result<(), AnnotationError> {
        self.session
            .update_config(CanvasConfigUpdate::new().mode(mode))?;
        Ok(())
    }

    /// Element-local pointer position in canvas space.
    pub fn pointer(&self, x: f64, y: f64) -> Result<CanvasPoint, AnnotationError> {
        Ok(self.session.pointer(x, y)?)
    }

    fn position_of(&self, id: &AnnotationId) -> Option<usize> {
        self.entries.iter().position(|e| &e.annotation.id == id)
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.entries
            .iter()
            .find(|e| &e.annotation.id == id)
            .map(|e| &e.annotation)
    }

    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.position_of(id).is_some()
    }

    /// Records in creation order.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.entries.iter().map(|e| &e.annotation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create an annotation and its shape.
    ///
    /// A missing, blank or already used id is replaced by a generated one.
    pub fn create_annotation(
        &mut self,
        config: AnnotationConfig,
    ) -> Result<Annotation, AnnotationError> {
        validate_scale(config.scale)?;
        validate_position(&config.position)?;

        let id = match config.id {
            Some(id) if !id.is_empty() && !self.contains(&id) => id,
            Some(id) => {
                log::warn!("Annotation id '{}' is blank or taken, generating a new one", id);
                AnnotationId::generate()
            }
            None => AnnotationId::generate(),
        };

        let annotation = Annotation::new(id.clone(), config.position)?;
        let style = config.style.unwrap_or_default();
        let mode = self.session.mode()?;
        let shape = Shape {
            id: id.clone(),
            role: ShapeRole::Annotation,
            rect: to_canvas_rect(&config.position, config.scale),
            style: ShapeStyle::scaled(&style, config.scale),
            interactivity: Interactivity::for_mode(mode),
        };

        let surface = self.session.surface_mut()?;
        surface.add(shape);
        surface.request_render_all();

        self.entries.push(Entry {
            annotation: annotation.clone(),
            style,
        });
        self.observers.entry(id).or_default();
        self.events.push(AnnotationEvent::Created(annotation.clone()));

        log::info!(
            "Created annotation {} at {:?}",
            annotation.id,
            annotation.position
        );
        Ok(annotation)
    }

    /// Move an annotation. Unknown ids are a no-op and return `None`.
    pub fn update_annotation(
        &mut self,
        id: &AnnotationId,
        update: AnnotationUpdate,
    ) -> Result<Option<Annotation>, AnnotationError> {
        let Some(index) = self.position_of(id) else {
            log::debug!("Ignoring update of unknown annotation {}", id);
            return Ok(None);
        };

        if let Some(position) = update.position {
            self.reposition(index, position, update.scale.unwrap_or(self.scale))?;
        }

        let annotation = self.entries[index].annotation.clone();
        self.events.push(AnnotationEvent::Updated(annotation.clone()));
        log::debug!("Updated annotation {}", id);
        Ok(Some(annotation))
    }

    fn reposition(
        &mut self,
        index: usize,
        position: DocRect,
        scale: f64,
    ) -> Result<(), AnnotationError> {
        validate_position(&position)?;
        validate_scale(scale)?;

        let id = &self.entries[index].annotation.id;
        let surface = self.session.surface_mut()?;
        if let Some(shape) = surface.objects_mut().iter_mut().find(|s| &s.id == id) {
            shape.rect = to_canvas_rect(&position, scale);
        }
        surface.request_render_all();
        self.entries[index].annotation.position = position;
        Ok(())
    }

    /// Apply record fields such as recognised text. Unknown ids return `None`.
    pub fn apply_fields(
        &mut self,
        id: &AnnotationId,
        fields: &AnnotationFields,
    ) -> Result<Option<Annotation>, AnnotationError> {
        fields.validate()?;
        let Some(index) = self.position_of(id) else {
            log::debug!("Ignoring fields for unknown annotation {}", id);
            return Ok(None);
        };
        if let Some(position) = fields.position {
            self.reposition(index, position, self.scale)?;
        }
        fields.apply_to(&mut self.entries[index].annotation);
        let annotation = self.entries[index].annotation.clone();
        self.events.push(AnnotationEvent::Updated(annotation.clone()));
        Ok(Some(annotation))
    }

    /// Remove an annotation and its shape. Returns whether anything was removed.
    pub fn delete_annotation(&mut self, id: &AnnotationId) -> Result<bool, AnnotationError> {
        let Some(index) = self.position_of(id) else {
            log::debug!("Ignoring delete of unknown annotation {}", id);
            return Ok(false);
        };

        let surface = self.session.surface_mut()?;
        surface.remove(id);
        surface.request_render_all();

        self.entries.remove(index);
        self.observers.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            self.events.push(AnnotationEvent::Selected(None));
        }
        self.events.push(AnnotationEvent::Deleted(id.clone()));
        log::info!("Deleted annotation {}", id);
        Ok(true)
    }

    /// Register a callback for manual moves of one annotation.
    ///
    /// Returns `false` when the id is unknown.
    pub fn observe(&mut self, id: &AnnotationId, observer: ModifiedObserver) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.observers.entry(id.clone()).or_default().push(observer);
        true
    }

    /// Report that the user dragged or resized a shape to `rect`.
    ///
    /// The document position is recomputed with the current scale, the
    /// observers of the shape run and an update event is emitted.
    pub fn shape_modified(
        &mut self,
        id: &AnnotationId,
        rect: CanvasRect,
    ) -> Result<Option<Annotation>, AnnotationError> {
        let Some(index) = self.position_of(id) else {
            return Ok(None);
        };

        let position = to_document_rect(&rect, self.scale);
        validate_position(&position)?;

        let surface = self.session.surface_mut()?;
        if let Some(shape) = surface.objects_mut().iter_mut().find(|s| &s.id == id) {
            shape.rect = rect;
        }

        self.entries[index].annotation.position = position;
        let annotation = self.entries[index].annotation.clone();
        if let Some(observers) = self.observers.get_mut(id) {
            for observer in observers.iter_mut() {
                observer(&annotation);
            }
        }
        self.events.push(AnnotationEvent::Updated(annotation.clone()));
        log::debug!("Annotation {} modified to {:?}", id, position);
        Ok(Some(annotation))
    }

    /// Change the zoom scale and re-derive every shape from its record.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), AnnotationError> {
        validate_scale(scale)?;
        self.scale = scale;

        let surface = self.session.surface_mut()?;
        for shape in surface.objects_mut() {
            if shape.role != ShapeRole::Annotation {
                continue;
            }
            if let Some(entry) = self.entries.iter().find(|e| e.annotation.id == shape.id) {
                shape.rect = to_canvas_rect(&entry.annotation.position, scale);
                shape.style = ShapeStyle::scaled(&entry.style, scale);
            }
        }
        surface.request_render_all();
        log::debug!("Rescaled {} annotations to {}", self.entries.len(), scale);
        Ok(())
    }

    pub fn selected(&self) -> Option<&AnnotationId> {
        self.selected.as_ref()
    }

    /// Select an annotation, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<&AnnotationId>) {
        let next = id.filter(|id| self.contains(id)).cloned();
        if next != self.selected {
            self.selected = next.clone();
            self.events.push(AnnotationEvent::Selected(next));
        }
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<AnnotationEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn add_provisional(
        &mut self,
        id: &AnnotationId,
        rect: CanvasRect,
    ) -> Result<(), AnnotationError> {
        let scale = self.scale;
        let surface = self.session.surface_mut()?;
        surface.add(Shape {
            id: id.clone(),
            role: ShapeRole::Provisional,
            rect,
            style: ShapeStyle::scaled(&AnnotationStyle::default(), scale),
            interactivity: Interactivity::NONE,
        });
        surface.request_render_all();
        Ok(())
    }

    pub(crate) fn resize_provisional(
        &mut self,
        id: &AnnotationId,
        rect: CanvasRect,
    ) -> Result<(), AnnotationError> {
        let surface = self.session.surface_mut()?;
        if let Some(shape) = surface
            .objects_mut()
            .iter_mut()
            .find(|s| &s.id == id && s.role == ShapeRole::Provisional)
        {
            shape.rect = rect;
        }
        surface.request_render_all();
        Ok(())
    }

    pub(crate) fn remove_provisional(&mut self, id: &AnnotationId) -> Result<(), AnnotationError> {
        let surface = self.session.surface_mut()?;
        surface.remove(id);
        surface.request_render_all();
        Ok(())
    }

    /// Drop every record and release the canvas session.
    pub fn dispose(&mut self) {
        self.entries.clear();
        self.observers.clear();
        self.selected = None;
        self.session.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::canvas::{CanvasConfig, HeadlessBackend, HeadlessElement};

    fn manager(scale: f64) -> AnnotationManager<HeadlessBackend> {
        let mut session = CanvasSession::new(HeadlessBackend::new());
        session
            .initialize(&HeadlessElement::new("page"), CanvasConfig::new(1200.0, 1800.0))
            .expect("initialize");
        AnnotationManager::new(session, scale).expect("valid scale")
    }

    fn shape_rect(manager: &AnnotationManager<HeadlessBackend>, id: &AnnotationId) -> CanvasRect {
        manager
            .session()
            .surface()
            .expect("surface")
            .objects()
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.rect)
            .expect("shape present")
    }

    #[test]
    fn test_create_projects_to_canvas() {
        let mut m = manager(1.5);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(10.0, 20.0, 30.0, 40.0), 1.5))
            .expect("create");

        assert_eq!(shape_rect(&m, &a.id), CanvasRect::new(15.0, 30.0, 45.0, 60.0));
        let shape = &m.session().surface().expect("surface").objects()[0];
        assert!((shape.style.stroke_width - 2.0 / 1.5).abs() < 1e-12);
        assert!(matches!(m.drain_events().as_slice(), [AnnotationEvent::Created(_)]));
    }

    #[test]
    fn test_create_rejects_bad_geometry() {
        let mut m = manager(1.0);
        let err = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, -1.0, 5.0), 1.0))
            .unwrap_err();
        assert!(matches!(err, AnnotationError::Validation(_)));
        assert!(m.is_empty());
    }

    #[test]
    fn test_duplicate_id_is_replaced() {
        let mut m = manager(1.0);
        let rect = DocRect::new(0.0, 0.0, 10.0, 10.0);
        let first = m
            .create_annotation(AnnotationConfig::new(rect, 1.0).with_id("fixed".into()))
            .expect("first");
        let second = m
            .create_annotation(AnnotationConfig::new(rect, 1.0).with_id("fixed".into()))
            .expect("second");
        assert_eq!(first.id.as_str(), "fixed");
        assert_ne!(second.id, first.id);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_update_and_delete_unknown_are_noops() {
        let mut m = manager(1.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 1.0))
            .expect("create");
        assert!(m.delete_annotation(&a.id).expect("delete"));

        let update = AnnotationUpdate {
            position: Some(DocRect::new(1.0, 1.0, 5.0, 5.0)),
            scale: None,
        };
        assert_eq!(m.update_annotation(&a.id, update), Ok(None));
        assert_eq!(m.delete_annotation(&a.id), Ok(false));
        assert!(m.session().surface().expect("surface").objects().is_empty());
    }

    #[test]
    fn test_update_uses_current_scale() {
        let mut m = manager(2.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 2.0))
            .expect("create");
        let updated = m
            .update_annotation(
                &a.id,
                AnnotationUpdate {
                    position: Some(DocRect::new(5.0, 5.0, 20.0, 10.0)),
                    scale: None,
                },
            )
            .expect("update")
            .expect("known id");
        assert_eq!(updated.position, DocRect::new(5.0, 5.0, 20.0, 10.0));
        assert_eq!(shape_rect(&m, &a.id), CanvasRect::new(10.0, 10.0, 40.0, 20.0));
    }

    #[test]
    fn test_shape_modified_notifies_observers() {
        let mut m = manager(2.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 2.0))
            .expect("create");
        m.drain_events();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        assert!(m.observe(&a.id, Box::new(move |annotation| {
            sink.borrow_mut().push(annotation.position);
        })));
        assert!(!m.observe(&"missing".into(), Box::new(|_| {})));

        m.shape_modified(&a.id, CanvasRect::new(40.0, 20.0, 60.0, 30.0))
            .expect("modified");

        assert_eq!(*seen.borrow(), vec![DocRect::new(20.0, 10.0, 30.0, 15.0)]);
        assert_eq!(
            m.get(&a.id).map(|a| a.position),
            Some(DocRect::new(20.0, 10.0, 30.0, 15.0))
        );
        assert!(matches!(m.drain_events().as_slice(), [AnnotationEvent::Updated(_)]));
    }

    #[test]
    fn test_set_scale_rederives_shapes() {
        let mut m = manager(1.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(10.0, 10.0, 20.0, 20.0), 1.0))
            .expect("create");
        m.set_scale(4.0).expect("rescale");

        assert_eq!(shape_rect(&m, &a.id), CanvasRect::new(40.0, 40.0, 80.0, 80.0));
        let shape = &m.session().surface().expect("surface").objects()[0];
        assert_eq!(shape.style.stroke_width, 0.5);
        assert_eq!(shape.style.corner_size, 2.0);
        // Records stay in document space
        assert_eq!(
            m.get(&a.id).map(|a| a.position),
            Some(DocRect::new(10.0, 10.0, 20.0, 20.0))
        );
        assert!(m.set_scale(0.0).is_err());
    }

    #[test]
    fn test_apply_recognition_fields() {
        let mut m = manager(1.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 1.0))
            .expect("create");
        m.drain_events();

        let updated = m
            .apply_fields(&a.id, &AnnotationFields::recognition("V-204", 91.0))
            .expect("apply")
            .expect("known id");
        assert_eq!(updated.extracted_text.as_deref(), Some("V-204"));
        assert_eq!(m.drain_events().len(), 1);
    }

    #[test]
    fn test_selection_cleared_on_delete() {
        let mut m = manager(1.0);
        let a = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 1.0))
            .expect("create");
        m.select(Some(&a.id));
        assert_eq!(m.selected(), Some(&a.id));
        m.delete_annotation(&a.id).expect("delete");
        assert_eq!(m.selected(), None);

        let events = m.drain_events();
        assert!(events.contains(&AnnotationEvent::Selected(None)));
        assert_eq!(events.last(), Some(&AnnotationEvent::Deleted(a.id)));
    }

    #[test]
    fn test_shapes_follow_mode() {
        let mut m = manager(1.0);
        m.set_mode(InteractionMode::Draw).expect("draw mode");
        m.create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 1.0))
            .expect("create");
        let shape = &m.session().surface().expect("surface").objects()[0];
        assert_eq!(shape.interactivity, Interactivity::NONE);
    }

    #[test]
    fn test_operations_after_dispose() {
        let mut m = manager(1.0);
        m.dispose();
        m.dispose();
        let err = m
            .create_annotation(AnnotationConfig::new(DocRect::new(0.0, 0.0, 10.0, 10.0), 1.0))
            .unwrap_err();
        assert_eq!(err, AnnotationError::Canvas(CanvasError::Disposed));
    }
}
