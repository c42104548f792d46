use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid tag name: {0:?}")]
    InvalidTag(String),

    #[error("Date range start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },
}

impl FilterError {
    /// Request field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidTag(_) => "tag",
            FilterError::InvalidDateRange { .. } => "start",
        }
    }
}
