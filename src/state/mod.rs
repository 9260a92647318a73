//! Document view state and the annotation record store.

mod document;
mod record_store;

pub use document::{DocumentKey, DocumentState, DocumentStateStore};
pub use record_store::{AnnotationRecordStore, MemoryRecordStore, StoreError};
