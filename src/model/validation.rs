//! Input validation for ids and annotation geometry.

use thiserror::Error;
use uuid::Uuid;

use crate::transform::DocRect;

/// Rejected input. Recovered locally by the caller: a replacement id is
/// generated, or the single offending operation is refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid {context} id: {id:?}")]
    InvalidId { context: String, id: String },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Scale must be a positive number, got {0}")]
    InvalidScale(f64),
}

/// Check that `id` is an RFC 4122 version 4 UUID.
pub fn check_uuid(id: &str, context: &str) -> Result<Uuid, ValidationError> {
    match Uuid::parse_str(id) {
        Ok(uuid) if uuid.get_version_num() == 4 => Ok(uuid),
        _ => Err(ValidationError::InvalidId {
            context: context.to_string(),
            id: id.to_string(),
        }),
    }
}

/// Return `id` if it is a valid v4 UUID, otherwise a freshly generated one.
pub fn validate_uuid(id: &str, context: &str) -> String {
    match check_uuid(id, context) {
        Ok(_) => id.to_string(),
        Err(e) => {
            let generated = Uuid::new_v4().to_string();
            log::warn!("{}, using generated id {}", e, generated);
            generated
        }
    }
}

/// Width and height strictly positive, every coordinate finite.
pub fn validate_position(position: &DocRect) -> Result<(), ValidationError> {
    let values = [
        position.left,
        position.top,
        position.width,
        position.height,
        position.angle,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidGeometry(format!(
            "non-finite coordinate in {:?}",
            position
        )));
    }
    if position.width <= 0.0 {
        return Err(ValidationError::InvalidGeometry(
            "width must be positive".to_string(),
        ));
    }
    if position.height <= 0.0 {
        return Err(ValidationError::InvalidGeometry(
            "height must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_scale(scale: f64) -> Result<(), ValidationError> {
    if scale > 0.0 && scale.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidScale(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_uuid_is_kept() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(validate_uuid(&id, "Job"), id);
    }

    #[test]
    fn test_invalid_uuid_is_replaced() {
        let replaced = validate_uuid("not-a-uuid", "Document");
        assert_ne!(replaced, "not-a-uuid");
        assert!(check_uuid(&replaced, "Document").is_ok());

        // A nil UUID parses but is not version 4
        assert!(check_uuid(&Uuid::nil().to_string(), "Job").is_err());
    }

    #[test]
    fn test_position_validation() {
        assert!(validate_position(&DocRect::new(0.0, 0.0, 10.0, 5.0)).is_ok());
        assert!(validate_position(&DocRect::new(0.0, 0.0, 0.0, 5.0)).is_err());
        assert!(validate_position(&DocRect::new(0.0, 0.0, 10.0, -1.0)).is_err());
        assert!(validate_position(&DocRect::new(f64::NAN, 0.0, 10.0, 5.0)).is_err());
    }

    #[test]
    fn test_scale_validation() {
        assert!(validate_scale(1.5).is_ok());
        assert_eq!(validate_scale(0.0), Err(ValidationError::InvalidScale(0.0)));
        assert!(validate_scale(f64::INFINITY).is_err());
    }
}
