use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Not authorized: {reason}")]
    Authorization { reason: String },

    #[error("Operation not allowed in current state: {reason}")]
    InvalidState { reason: String },

    #[error("Unknown or missing identity: {0}")]
    Unauthenticated(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

impl BookingError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// HTTP status an HTTP adapter should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::Conflict { .. } | Self::InvalidState { .. } => 400,
            Self::Unauthenticated(_) => 401,
            Self::Authorization { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Config(_) | Self::Storage(_) | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => {
                500
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = BookingError::validation("check-in must be before check-out");
        let msg = err.to_string();
        assert!(msg.contains("check-in must be before check-out"));
        assert!(msg.contains("Validation"));
    }

    #[test]
    fn not_found_display() {
        let err = BookingError::not_found("Farmhouse", "42");
        let msg = err.to_string();
        assert_eq!(msg, "Farmhouse not found: 42");
    }

    #[test]
    fn conflict_display() {
        let err = BookingError::conflict("room already booked");
        assert!(err.to_string().contains("room already booked"));
    }

    #[test]
    fn status_codes_follow_http_mapping() {
        assert_eq!(BookingError::validation("x").status_code(), 400);
        assert_eq!(BookingError::conflict("x").status_code(), 400);
        assert_eq!(BookingError::invalid_state("x").status_code(), 400);
        assert_eq!(BookingError::Unauthenticated("x".into()).status_code(), 401);
        assert_eq!(BookingError::unauthorized("x").status_code(), 403);
        assert_eq!(BookingError::not_found("Booking", "1").status_code(), 404);
        assert_eq!(BookingError::Storage("down".into()).status_code(), 500);
    }

    #[test]
    fn error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{invalid").unwrap_err();
        let err: BookingError = json_err.into();
        assert!(matches!(err, BookingError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
        assert_eq!(err.status_code(), 500);
    }
}
