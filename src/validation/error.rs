use thiserror::Error;

/// Client-input failures raised by the rule engine. The first violation wins.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    Missing { field: String },

    #[error("Field '{field}' does not satisfy rule '{rule}'")]
    Invalid { field: String, rule: &'static str },

    #[error("Request body must be a JSON object")]
    BodyNotObject,
}

impl ValidationError {
    /// Name of the offending field, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::Missing { field } | ValidationError::Invalid { field, .. } => Some(field),
            ValidationError::BodyNotObject => None,
        }
    }
}
