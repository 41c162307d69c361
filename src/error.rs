//! Unified error handling for the travel-trails library.
//!
//! Most data problems in a corpus are not errors at all: records with
//! unusable coordinates are skipped and empty filter results are a normal
//! state. This type covers what is left: unreadable resources, bad user
//! input and lookups of sessions that do not exist.

use std::fmt;

use crate::SessionId;

/// Unified error type for travel-trails operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailError {
    /// The corpus resource is not valid JSON or has neither `cities` nor `travels`
    CorpusParse { message: String },
    /// Reading a file from disk failed
    Io { path: String, message: String },
    /// No filter session with this id exists
    UnknownSession { session: SessionId },
    /// A user-supplied query field could not be interpreted
    InvalidQuery { field: String, value: String },
    /// Configuration error
    ConfigError { message: String },
    /// HTTP error while fetching the corpus
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for TrailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailError::CorpusParse { message } => {
                write!(f, "Corpus parse error: {}", message)
            }
            TrailError::Io { path, message } => {
                write!(f, "Failed to read '{}': {}", path, message)
            }
            TrailError::UnknownSession { session } => {
                write!(f, "Unknown filter session {}", session)
            }
            TrailError::InvalidQuery { field, value } => {
                write!(f, "Invalid value '{}' for {}", value, field)
            }
            TrailError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TrailError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            TrailError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for TrailError {}

impl From<serde_json::Error> for TrailError {
    fn from(err: serde_json::Error) -> Self {
        TrailError::CorpusParse {
            message: err.to_string(),
        }
    }
}

/// Result type alias for travel-trails operations.
pub type Result<T> = std::result::Result<T, TrailError>;

/// Extension trait for converting Option to TrailError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an unknown session error.
    fn ok_or_unknown_session(self, session: SessionId) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_session(self, session: SessionId) -> Result<T> {
        self.ok_or(TrailError::UnknownSession { session })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrailError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrailError::InvalidQuery {
            field: "yearBegin".to_string(),
            value: "soon".to_string(),
        };
        assert!(err.to_string().contains("soon"));
        assert!(err.to_string().contains("yearBegin"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_unknown_session(SessionId(3));
        assert!(matches!(
            result,
            Err(TrailError::UnknownSession { session }) if session == SessionId(3)
        ));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: TrailError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, TrailError::CorpusParse { .. }));
    }
}
