//! Persistence seam for annotation records.

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Annotation, AnnotationFields, AnnotationId, ValidationError};
use crate::transform::DocRect;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Annotation {0} not found")]
    NotFound(AnnotationId),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Fallible async access to persisted annotations.
///
/// Ids are assigned by the store.
#[async_trait(?Send)]
pub trait AnnotationRecordStore {
    async fn create_record(
        &self,
        document_id: &str,
        position: DocRect,
    ) -> Result<Annotation, StoreError>;

    async fn update_record(
        &self,
        id: &AnnotationId,
        fields: &AnnotationFields,
    ) -> Result<Annotation, StoreError>;

    async fn delete_record(&self, id: &AnnotationId) -> Result<(), StoreError>;

    /// Delete every record of a document.
    async fn delete_document_records(&self, document_id: &str) -> Result<(), StoreError>;

    /// Records of a document in insertion order.
    async fn list_records(&self, document_id: &str) -> Result<Vec<Annotation>, StoreError>;
}

/// In-memory store. Can be switched offline to exercise failure paths.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RefCell<Vec<(String, Annotation)>>,
    offline: Cell<bool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`StoreError::Backend`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.get() {
            Err(StoreError::Backend("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait(?Send)]
impl AnnotationRecordStore for MemoryRecordStore {
    async fn create_record(
        &self,
        document_id: &str,
        position: DocRect,
    ) -> Result<Annotation, StoreError> {
        self.check_online()?;
        let annotation = Annotation::new(AnnotationId::generate(), position)?;
        self.records
            .borrow_mut()
            .push((document_id.to_string(), annotation.clone()));
        Ok(annotation)
    }

    async fn update_record(
        &self,
        id: &AnnotationId,
        fields: &AnnotationFields,
    ) -> Result<Annotation, StoreError> {
        self.check_online()?;
        fields.validate()?;
        let mut records = self.records.borrow_mut();
        let (_, annotation) = records
            .iter_mut()
            .find(|(_, a)| &a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        fields.apply_to(annotation);
        Ok(annotation.clone())
    }

    async fn delete_record(&self, id: &AnnotationId) -> Result<(), StoreError> {
        self.check_online()?;
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|(_, a)| &a.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    async fn delete_document_records(&self, document_id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        self.records
            .borrow_mut()
            .retain(|(doc, _)| doc != document_id);
        Ok(())
    }

    async fn list_records(&self, document_id: &str) -> Result<Vec<Annotation>, StoreError> {
        self.check_online()?;
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|(doc, _)| doc == document_id)
            .map(|(_, a)| a.clone())
            .collect())
    }
}
