use thiserror::Error;

/// Everything a calculator can refuse. `Display` is the message shown next
/// to the form.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("{field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{0}")]
    DomainError(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Keyword planner error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CalcError {
    /// Shorthand for the most common validation failure.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "keywords")]
impl From<csv::Error> for CalcError {
    fn from(e: csv::Error) -> Self {
        CalcError::SerializationError(e.to_string())
    }
}
