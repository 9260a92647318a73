//! Annotation records and the inputs used to create and update them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{ValidationError, validate_position};
use crate::constants::style;
use crate::transform::DocRect;

/// Opaque annotation identifier, unique within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AnnotationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Annotation type tag. Only boxes exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    #[default]
    Box,
}

/// A persisted annotation. The position is always in document space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(rename = "type", default)]
    pub kind: AnnotationKind,
    pub position: DocRect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_pattern_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Engine-native recognition confidence, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Annotation {
    /// Create a box annotation, rejecting non-positive sizes.
    pub fn new(id: AnnotationId, position: DocRect) -> Result<Self, ValidationError> {
        validate_position(&position)?;
        Ok(Self {
            id,
            kind: AnnotationKind::Box,
            position,
            tag_pattern_id: None,
            extracted_text: None,
            confidence: None,
        })
    }

    pub fn with_recognition(mut self, text: impl Into<String>, confidence: f64) -> Self {
        self.extracted_text = Some(text.into());
        self.confidence = Some(confidence.clamp(0.0, 100.0));
        self
    }
}

/// Field-wise changes to a stored annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<DocRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_pattern_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AnnotationFields {
    pub fn position(position: DocRect) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn recognition(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            extracted_text: Some(text.into()),
            confidence: Some(confidence),
            ..Default::default()
        }
    }

    /// Every field of the annotation, as a full overwrite.
    pub fn from_annotation(annotation: &Annotation) -> Self {
        Self {
            position: Some(annotation.position),
            tag_pattern_id: annotation.tag_pattern_id.clone(),
            extracted_text: annotation.extracted_text.clone(),
            confidence: annotation.confidence,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.position {
            Some(position) => validate_position(position),
            None => Ok(()),
        }
    }

    /// Copy the present fields onto `annotation`.
    pub fn apply_to(&self, annotation: &mut Annotation) {
        if let Some(position) = self.position {
            annotation.position = position;
        }
        if let Some(tag) = &self.tag_pattern_id {
            annotation.tag_pattern_id = Some(tag.clone());
        }
        if let Some(text) = &self.extracted_text {
            annotation.extracted_text = Some(text.clone());
        }
        if let Some(confidence) = self.confidence {
            annotation.confidence = Some(confidence.clamp(0.0, 100.0));
        }
    }
}

/// Fill and stroke of an annotation box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    pub fill: String,
    pub stroke: String,
    /// Stroke width at scale 1.
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            fill: style::FILL.to_string(),
            stroke: style::STROKE.to_string(),
            stroke_width: style::STROKE_WIDTH,
            opacity: 1.0,
        }
    }
}

/// Input of `AnnotationManager::create_annotation`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationConfig {
    /// Reuse this id; a fresh one is generated when absent or blank.
    pub id: Option<AnnotationId>,
    pub position: DocRect,
    pub scale: f64,
    pub style: Option<AnnotationStyle>,
}

impl AnnotationConfig {
    pub fn new(position: DocRect, scale: f64) -> Self {
        Self {
            id: None,
            position,
            scale,
            style: None,
        }
    }

    pub fn with_id(mut self, id: AnnotationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// Input of `AnnotationManager::update_annotation`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationUpdate {
    pub position: Option<DocRect>,
    /// Scale to project the position with; the manager's current scale when absent.
    pub scale: Option<f64>,
}

/// Change notifications emitted by the annotation manager.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationEvent {
    Created(Annotation),
    Updated(Annotation),
    Deleted(AnnotationId),
    Selected(Option<AnnotationId>),
}
