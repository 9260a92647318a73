//! Data models for planmark.

mod annotation;
mod page;
mod validation;

pub use annotation::{
    Annotation, AnnotationConfig, AnnotationEvent, AnnotationFields, AnnotationId,
    AnnotationKind, AnnotationStyle, AnnotationUpdate,
};
pub use page::{PageDimensions, Rotation};
pub use validation::{
    ValidationError, check_uuid, validate_position, validate_scale, validate_uuid,
};
