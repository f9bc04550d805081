//! Error types for Lexigraph Core

use thiserror::Error;

/// Result type alias using Lexigraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Lexigraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("{}", malformed_message(*line, reason))]
    MalformedRecord { line: Option<usize>, reason: String },

    #[error("Invalid value for field '{field}': {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

fn malformed_message(line: Option<usize>, reason: &str) -> String {
    match line {
        Some(n) => format!("Malformed record on line {}: {}", n, reason),
        None => format!("Malformed record: {}", reason),
    }
}

impl Error {
    /// Attach a 1-based source line number to a record error.
    ///
    /// Errors that are not about a single record are returned unchanged.
    pub fn at_line(self, n: usize) -> Self {
        match self {
            Error::MalformedRecord { reason, .. } => Error::MalformedRecord {
                line: Some(n),
                reason,
            },
            Error::InvalidField { field, value } => Error::MalformedRecord {
                line: Some(n),
                reason: format!("invalid value for field '{}': {:?}", field, value),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = Error::MalformedRecord {
            line: None,
            reason: "missing verb".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed record: missing verb");

        let err = err.at_line(7);
        assert_eq!(err.to_string(), "Malformed record on line 7: missing verb");
    }

    #[test]
    fn test_invalid_field_gets_line() {
        let err = Error::InvalidField {
            field: "front_weight",
            value: "heavy".to_string(),
        }
        .at_line(3);

        assert!(matches!(err, Error::MalformedRecord { line: Some(3), .. }));
        assert!(err.to_string().contains("front_weight"));
    }
}
