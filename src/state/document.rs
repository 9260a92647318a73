//! Per-document view state: zoom, rotation and the annotation list.

use std::collections::HashMap;

use crate::config::ViewerConfig;
use crate::constants::zoom;
use crate::model::{
    Annotation, AnnotationFields, AnnotationId, Rotation, ValidationError, check_uuid,
    validate_uuid,
};
use crate::transform::DocRect;

use super::record_store::{AnnotationRecordStore, StoreError};

/// View state of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentState {
    pub scale: f64,
    pub rotation: Rotation,
    /// Annotations in insertion order.
    pub annotations: Vec<Annotation>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation::Deg0,
            annotations: Vec::new(),
        }
    }
}

/// `(job, document)` pair with both ids validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub job_id: String,
    pub document_id: String,
    /// Whether either id was invalid and replaced.
    pub substituted: bool,
}

impl DocumentKey {
    /// Invalid ids are replaced by generated ones and logged.
    pub fn new(job_id: &str, document_id: &str) -> Self {
        let substituted =
            check_uuid(job_id, "Job").is_err() || check_uuid(document_id, "Document").is_err();
        Self {
            job_id: validate_uuid(job_id, "Job"),
            document_id: validate_uuid(document_id, "Document"),
            substituted,
        }
    }
}

/// Document states keyed by `(job, document)`, backed by a record store.
///
/// States are created on first access and live as long as the store.
pub struct DocumentStateStore<S: AnnotationRecordStore> {
    store: S,
    documents: HashMap<DocumentKey, DocumentState>,
    /// Throwaway state handed out for substituted keys.
    scratch: DocumentState,
    min_scale: f64,
    max_scale: f64,
    /// Scale of documents seen for the first time.
    default_scale: f64,
    zoom_factor: f64,
    selected: Option<AnnotationId>,
    hovered: Option<AnnotationId>,
}

impl<S: AnnotationRecordStore> DocumentStateStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            documents: HashMap::new(),
            scratch: DocumentState::default(),
            min_scale: zoom::MIN,
            max_scale: zoom::MAX,
            default_scale: 1.0,
            zoom_factor: zoom::FACTOR,
            selected: None,
            hovered: None,
        }
    }

    /// Store with the zoom limits and initial scale of `viewer`.
    ///
    /// Unusable limits are logged and the built-in ones kept. The initial
    /// scale is clamped into the limits.
    pub fn from_config(store: S, viewer: &ViewerConfig) -> Self {
        let mut this = Self::new(store);
        let (min, max) = (viewer.min_scale, viewer.max_scale);
        if min.is_finite() && max.is_finite() && min > 0.0 && min <= max {
            this = this.with_scale_limits(min, max);
        } else {
            log::warn!("Ignoring invalid scale limits {}..{}", min, max);
        }
        if viewer.default_scale.is_finite() {
            this.default_scale = viewer.default_scale.clamp(this.min_scale, this.max_scale);
        } else {
            log::warn!("Ignoring invalid default scale {}", viewer.default_scale);
        }
        this
    }

    /// # Panics
    /// If the limits are not positive or `min > max`.
    pub fn with_scale_limits(mut self, min: f64, max: f64) -> Self {
        assert!(min > 0.0 && min <= max, "invalid scale limits {min}..{max}");
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scale_limits(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// State of a document, defaults when never touched.
    pub fn document_state(&self, job_id: &str, document_id: &str) -> DocumentState {
        self.documents
            .get(&DocumentKey::new(job_id, document_id))
            .cloned()
            .unwrap_or_else(|| self.fresh_state())
    }

    fn fresh_state(&self) -> DocumentState {
        DocumentState {
            scale: self.default_scale,
            ..Default::default()
        }
    }

    /// Mutable state of a document, created on first access.
    pub fn document_state_mut(&mut self, job_id: &str, document_id: &str) -> &mut DocumentState {
        self.entry(DocumentKey::new(job_id, document_id))
    }

    /// Number of documents with retained state.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// A substituted key can never be looked up again, so its state is not
    /// retained.
    fn entry(&mut self, key: DocumentKey) -> &mut DocumentState {
        let fresh = self.fresh_state();
        if key.substituted {
            self.scratch = fresh;
            return &mut self.scratch;
        }
        self.documents.entry(key).or_insert(fresh)
    }

    /// Set the zoom, clamped into the configured limits. Returns the applied value.
    pub fn set_scale(
        &mut self,
        job_id: &str,
        document_id: &str,
        scale: f64,
    ) -> Result<f64, ValidationError> {
        if !scale.is_finite() {
            return Err(ValidationError::InvalidScale(scale));
        }
        let clamped = scale.clamp(self.min_scale, self.max_scale);
        self.document_state_mut(job_id, document_id).scale = clamped;
        Ok(clamped)
    }

    pub fn zoom_in(&mut self, job_id: &str, document_id: &str) -> f64 {
        let next = self.document_state(job_id, document_id).scale * self.zoom_factor;
        let clamped = next.clamp(self.min_scale, self.max_scale);
        self.document_state_mut(job_id, document_id).scale = clamped;
        clamped
    }

    pub fn zoom_out(&mut self, job_id: &str, document_id: &str) -> f64 {
        let next = self.document_state(job_id, document_id).scale / self.zoom_factor;
        let clamped = next.clamp(self.min_scale, self.max_scale);
        self.document_state_mut(job_id, document_id).scale = clamped;
        clamped
    }

    /// Snap `degrees` to a right angle and store it.
    pub fn set_rotation(&mut self, job_id: &str, document_id: &str, degrees: f64) -> Rotation {
        let rotation = Rotation::from_degrees(degrees);
        self.document_state_mut(job_id, document_id).rotation = rotation;
        rotation
    }

    pub fn rotate_clockwise(&mut self, job_id: &str, document_id: &str) -> Rotation {
        let state = self.document_state_mut(job_id, document_id);
        state.rotation = state.rotation.clockwise();
        state.rotation
    }

    /// Replace the local list with the persisted records.
    pub async fn fetch_annotations(
        &mut self,
        job_id: &str,
        document_id: &str,
    ) -> Result<usize, StoreError> {
        let key = DocumentKey::new(job_id, document_id);
        let annotations = self
            .store
            .list_records(&key.document_id)
            .await
            .inspect_err(|e| log::error!("Failed to fetch annotations: {}", e))?;
        let count = annotations.len();
        self.entry(key).annotations = annotations;
        log::info!("Fetched {} annotations", count);
        Ok(count)
    }

    pub async fn add_annotation(
        &mut self,
        job_id: &str,
        document_id: &str,
        position: DocRect,
    ) -> Result<Annotation, StoreError> {
        let key = DocumentKey::new(job_id, document_id);
        let annotation = self
            .store
            .create_record(&key.document_id, position)
            .await
            .inspect_err(|e| log::error!("Failed to add annotation: {}", e))?;
        self.entry(key).annotations.push(annotation.clone());
        log::info!("Annotation {} added", annotation.id);
        Ok(annotation)
    }

    pub async fn update_annotation(
        &mut self,
        job_id: &str,
        document_id: &str,
        id: &AnnotationId,
        fields: &AnnotationFields,
    ) -> Result<Annotation, StoreError> {
        let key = DocumentKey::new(job_id, document_id);
        let updated = self
            .store
            .update_record(id, fields)
            .await
            .inspect_err(|e| log::error!("Failed to update annotation {}: {}", id, e))?;
        let state = self.entry(key);
        match state.annotations.iter_mut().find(|a| &a.id == id) {
            Some(local) => *local = updated.clone(),
            None => state.annotations.push(updated.clone()),
        }
        log::debug!("Annotation {} updated", id);
        Ok(updated)
    }

    pub async fn delete_annotation(
        &mut self,
        job_id: &str,
        document_id: &str,
        id: &AnnotationId,
    ) -> Result<(), StoreError> {
        let key = DocumentKey::new(job_id, document_id);
        self.store
            .delete_record(id)
            .await
            .inspect_err(|e| log::error!("Failed to delete annotation {}: {}", id, e))?;
        self.entry(key).annotations.retain(|a| &a.id != id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        log::info!("Annotation {} deleted", id);
        Ok(())
    }

    /// Delete every annotation of a document. Scale and rotation are kept.
    pub async fn clear_annotations(
        &mut self,
        job_id: &str,
        document_id: &str,
    ) -> Result<(), StoreError> {
        let key = DocumentKey::new(job_id, document_id);
        self.store
            .delete_document_records(&key.document_id)
            .await
            .inspect_err(|e| log::error!("Failed to clear annotations: {}", e))?;
        log::info!("Annotations cleared for document {}", key.document_id);
        self.entry(key).annotations.clear();
        self.selected = None;
        self.hovered = None;
        Ok(())
    }

    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.selected = id;
    }

    pub fn selected(&self) -> Option<&AnnotationId> {
        self.selected.as_ref()
    }

    pub fn hover(&mut self, id: Option<AnnotationId>) {
        self.hovered = id;
    }

    pub fn hovered(&self) -> Option<&AnnotationId> {
        self.hovered.as_ref()
    }
}
