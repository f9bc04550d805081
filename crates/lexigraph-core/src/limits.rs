//! Defaults and hard limits shared by the insertion and query engines

/// Entity id meaning "unspecified": matches any id on lookup, and is the id
/// every compound entity is created with.
pub const UNSPECIFIED_ID: i64 = -5;

/// Separator joining subject and object names into a compound entity name.
pub const COMPOUND_SEPARATOR: char = '_';

/// Number of fields in one fact record
pub const FACT_FIELDS: usize = 12;

/// Minimum fuzzy similarity (percent) for a name to become a candidate (60)
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 60;

/// Default recursion guard for query fan-out (32)
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Absolute ceiling for the recursion guard (256)
pub const MAX_QUERY_DEPTH: usize = 256;

/// Default line budget used by front ends (20)
pub const DEFAULT_LINE_BUDGET: usize = 20;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    ThresholdOutOfRange { value: u32 },
    DepthTooLarge { depth: usize, max: usize },
    EmptyName { field: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ThresholdOutOfRange { value } => {
                write!(f, "Similarity threshold out of range: {} (expected 0-100)", value)
            }
            Self::DepthTooLarge { depth, max } => {
                write!(f, "Query depth too large: {} (max {})", depth, max)
            }
            Self::EmptyName { field } => write!(f, "Field '{}' cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for crate::error::Error {
    fn from(e: ValidationError) -> Self {
        crate::error::Error::Validation(e.to_string())
    }
}

/// Validate a similarity threshold percentage
pub fn validate_threshold(value: u32) -> Result<(), ValidationError> {
    if value > 100 {
        return Err(ValidationError::ThresholdOutOfRange { value });
    }
    Ok(())
}

/// Validate a query recursion depth
pub fn validate_depth(depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_QUERY_DEPTH {
        return Err(ValidationError::DepthTooLarge {
            depth,
            max: MAX_QUERY_DEPTH,
        });
    }
    Ok(())
}

/// Validate that a required name field is present
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyName { field });
    }
    Ok(())
}
