//! Draw-mode gesture handling.
//!
//! A gesture is `down, move*, up`. The machine is a plain value; the three
//! transitions take the annotation manager explicitly so gestures can be
//! replayed without a pointing device.

use crate::canvas::{InteractionMode, SurfaceBackend};
use crate::config::DrawingConfig;
use crate::constants::MIN_DRAW_SIZE;
use crate::manager::{AnnotationError, AnnotationManager};
use crate::model::{Annotation, AnnotationConfig, AnnotationId};
use crate::transform::{CanvasPoint, CanvasRect, to_document_rect};

/// State for a box currently being drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DrawingState {
    /// Not currently drawing anything.
    #[default]
    Idle,
    /// Drawing a box: the canvas-space anchor, the provisional shape and
    /// its current extent.
    Drawing {
        start: CanvasPoint,
        provisional: AnnotationId,
        rect: CanvasRect,
    },
}

impl DrawingState {
    pub fn is_drawing(&self) -> bool {
        matches!(self, DrawingState::Drawing { .. })
    }
}

/// Element-local pointer position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Result of feeding one pointer event to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Wrong mode, no gesture in progress, or a duplicate pointer-down.
    Ignored,
    Started(CanvasPoint),
    Resized(CanvasRect),
    Committed(Annotation),
    /// The box was too small and was dropped.
    Discarded,
}

/// Box spanned by the anchor and the current pointer.
pub fn next_rect(start: CanvasPoint, current: CanvasPoint) -> CanvasRect {
    CanvasRect::from_corners(start, current)
}

/// Both sides must exceed `min_size` canvas pixels.
pub fn should_commit(rect: &CanvasRect, min_size: f64) -> bool {
    rect.width > min_size && rect.height > min_size
}

/// Callback fired once per committed box.
pub type CompletionCallback = Box<dyn FnMut(&Annotation)>;

/// Turns draw-mode gestures into annotations.
pub struct DrawingMachine {
    state: DrawingState,
    min_size: f64,
    on_complete: Option<CompletionCallback>,
}

impl Default for DrawingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingMachine {
    pub fn new() -> Self {
        Self::with_min_size(MIN_DRAW_SIZE)
    }

    pub fn with_min_size(min_size: f64) -> Self {
        Self {
            state: DrawingState::Idle,
            min_size,
            on_complete: None,
        }
    }

    pub fn from_config(config: &DrawingConfig) -> Self {
        Self::with_min_size(config.min_draw_size)
    }

    pub fn on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    pub fn pointer_down<B: SurfaceBackend>(
        &mut self,
        manager: &mut AnnotationManager<B>,
        event: PointerEvent,
    ) -> Result<GestureOutcome, AnnotationError> {
        if self.state.is_drawing() {
            log::debug!("Pointer down while drawing, ignored");
            return Ok(GestureOutcome::Ignored);
        }
        if manager.mode()? != InteractionMode::Draw {
            return Ok(GestureOutcome::Ignored);
        }

        let start = manager.pointer(event.x, event.y)?;
        let provisional = AnnotationId::generate();
        let rect = CanvasRect::new(start.x, start.y, 0.0, 0.0);
        manager.add_provisional(&provisional, rect)?;
        self.state = DrawingState::Drawing {
            start,
            provisional,
            rect,
        };
        log::debug!("Gesture started at {:?}", start);
        Ok(GestureOutcome::Started(start))
    }

    pub fn pointer_move<B: SurfaceBackend>(
        &mut self,
        manager: &mut AnnotationManager<B>,
        event: PointerEvent,
    ) -> Result<GestureOutcome, AnnotationError> {
        let DrawingState::Drawing {
            start,
            provisional,
            rect,
        } = &mut self.state
        else {
            return Ok(GestureOutcome::Ignored);
        };
        let next = next_rect(*start, manager.pointer(event.x, event.y)?);
        manager.resize_provisional(provisional, next)?;
        *rect = next;
        Ok(GestureOutcome::Resized(next))
    }

    /// Finish the gesture with the box as last resized. The release
    /// position is not measured again. The machine is back to idle whatever
    /// the outcome.
    pub fn pointer_up<B: SurfaceBackend>(
        &mut self,
        manager: &mut AnnotationManager<B>,
        _event: PointerEvent,
    ) -> Result<GestureOutcome, AnnotationError> {
        let DrawingState::Drawing {
            provisional, rect, ..
        } = std::mem::take(&mut self.state)
        else {
            return Ok(GestureOutcome::Ignored);
        };

        manager.remove_provisional(&provisional)?;

        if !should_commit(&rect, self.min_size) {
            log::debug!(
                "Discarding {}x{} box below the {}px threshold",
                rect.width,
                rect.height,
                self.min_size
            );
            return Ok(GestureOutcome::Discarded);
        }

        let scale = manager.scale();
        let position = to_document_rect(&rect, scale);
        let annotation = manager
            .create_annotation(AnnotationConfig::new(position, scale).with_id(provisional))?;
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&annotation);
        }
        Ok(GestureOutcome::Committed(annotation))
    }

    /// Abandon a gesture in progress, removing its provisional box.
    pub fn cancel<B: SurfaceBackend>(
        &mut self,
        manager: &mut AnnotationManager<B>,
    ) -> Result<(), AnnotationError> {
        if let DrawingState::Drawing { provisional, .. } = std::mem::take(&mut self.state) {
            manager.remove_provisional(&provisional)?;
            log::debug!("Gesture cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::canvas::{
        CanvasConfig, CanvasSession, HeadlessBackend, HeadlessElement, ShapeRole,
    };

    fn draw_manager(scale: f64) -> AnnotationManager<HeadlessBackend> {
        let mut session = CanvasSession::new(HeadlessBackend::new());
        session
            .initialize(
                &HeadlessElement::new("page"),
                CanvasConfig::new(1200.0, 1800.0).with_mode(InteractionMode::Draw),
            )
            .expect("initialize");
        AnnotationManager::new(session, scale).expect("valid scale")
    }

    fn provisional_count(manager: &AnnotationManager<HeadlessBackend>) -> usize {
        manager
            .session()
            .surface()
            .expect("surface")
            .objects()
            .iter()
            .filter(|s| s.role == ShapeRole::Provisional)
            .count()
    }

    #[test]
    fn test_should_commit_threshold() {
        assert!(!should_commit(&CanvasRect::new(0.0, 0.0, 5.0, 50.0), 5.0));
        assert!(!should_commit(&CanvasRect::new(0.0, 0.0, 50.0, 4.0), 5.0));
        assert!(should_commit(&CanvasRect::new(0.0, 0.0, 5.1, 5.1), 5.0));
    }

    #[test]
    fn test_next_rect_normalizes_drag_direction() {
        let rect = next_rect(CanvasPoint::new(50.0, 40.0), CanvasPoint::new(10.0, 60.0));
        assert_eq!(rect, CanvasRect::new(10.0, 40.0, 40.0, 20.0));
    }

    #[test]
    fn test_select_mode_ignores_pointer_down() {
        let mut manager = draw_manager(1.0);
        manager.set_mode(InteractionMode::Select).expect("select");
        let mut machine = DrawingMachine::new();

        let outcome = machine
            .pointer_down(&mut manager, PointerEvent::new(10.0, 10.0))
            .expect("down");
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert_eq!(machine.state(), &DrawingState::Idle);
    }

    #[test]
    fn test_move_and_up_without_down_are_ignored() {
        let mut manager = draw_manager(1.0);
        let mut machine = DrawingMachine::new();
        assert_eq!(
            machine.pointer_move(&mut manager, PointerEvent::new(1.0, 1.0)),
            Ok(GestureOutcome::Ignored)
        );
        assert_eq!(
            machine.pointer_up(&mut manager, PointerEvent::new(1.0, 1.0)),
            Ok(GestureOutcome::Ignored)
        );
    }

    #[test]
    fn test_gesture_commits_document_space_box() {
        let mut manager = draw_manager(2.0);
        let completed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&completed);
        let mut machine =
            DrawingMachine::new().on_complete(Box::new(move |_| counter.set(counter.get() + 1)));

        machine
            .pointer_down(&mut manager, PointerEvent::new(20.0, 40.0))
            .expect("down");
        assert_eq!(provisional_count(&manager), 1);

        let resized = machine
            .pointer_move(&mut manager, PointerEvent::new(120.0, 90.0))
            .expect("move");
        assert_eq!(
            resized,
            GestureOutcome::Resized(CanvasRect::new(20.0, 40.0, 100.0, 50.0))
        );
        assert!(manager.is_empty());

        let outcome = machine
            .pointer_up(&mut manager, PointerEvent::new(120.0, 90.0))
            .expect("up");
        let GestureOutcome::Committed(annotation) = outcome else {
            panic!("expected a committed annotation, got {outcome:?}");
        };
        assert_eq!(annotation.position.left, 10.0);
        assert_eq!(annotation.position.top, 20.0);
        assert_eq!(annotation.position.width, 50.0);
        assert_eq!(annotation.position.height, 25.0);
        assert_eq!(completed.get(), 1);
        assert_eq!(provisional_count(&manager), 0);
        assert_eq!(manager.len(), 1);
        assert!(!machine.state().is_drawing());
    }

    #[test]
    fn test_duplicate_pointer_down_keeps_anchor() {
        let mut manager = draw_manager(1.0);
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&mut manager, PointerEvent::new(10.0, 10.0))
            .expect("down");
        let outcome = machine
            .pointer_down(&mut manager, PointerEvent::new(500.0, 500.0))
            .expect("second down");
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert_eq!(provisional_count(&manager), 1);

        let DrawingState::Drawing { start, .. } = machine.state() else {
            panic!("gesture should still be in progress");
        };
        assert_eq!(*start, CanvasPoint::new(10.0, 10.0));
    }

    #[test]
    fn test_click_is_discarded() {
        let mut manager = draw_manager(1.0);
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&mut manager, PointerEvent::new(10.0, 10.0))
            .expect("down");
        let outcome = machine
            .pointer_up(&mut manager, PointerEvent::new(10.0, 10.0))
            .expect("up");
        assert_eq!(outcome, GestureOutcome::Discarded);
        assert!(manager.is_empty());
        assert!(manager.session().surface().expect("surface").objects().is_empty());
    }

    #[test]
    fn test_release_far_from_last_move_uses_provisional_box() {
        let mut manager = draw_manager(1.0);
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&mut manager, PointerEvent::new(100.0, 100.0))
            .expect("down");
        machine
            .pointer_move(&mut manager, PointerEvent::new(102.0, 102.0))
            .expect("move");

        let outcome = machine
            .pointer_up(&mut manager, PointerEvent::new(300.0, 300.0))
            .expect("up");
        assert_eq!(outcome, GestureOutcome::Discarded);
        assert!(manager.is_empty());
        assert_eq!(provisional_count(&manager), 0);
    }

    #[test]
    fn test_min_size_from_config() {
        let config = DrawingConfig {
            min_draw_size: 12.0,
            preprocess: true,
        };
        assert_eq!(DrawingMachine::from_config(&config).min_size(), 12.0);
        assert_eq!(DrawingMachine::new().min_size(), MIN_DRAW_SIZE);
    }

    #[test]
    fn test_cancel_removes_provisional() {
        let mut manager = draw_manager(1.0);
        let mut machine = DrawingMachine::new();
        machine
            .pointer_down(&mut manager, PointerEvent::new(10.0, 10.0))
            .expect("down");
        machine.cancel(&mut manager).expect("cancel");
        assert_eq!(provisional_count(&manager), 0);
        assert_eq!(machine.state(), &DrawingState::Idle);
    }
}
