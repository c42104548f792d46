//! Declarative request validation: rulesets map patterns to field names, the
//! engine resolves each field across body, path and query, rejects missing or
//! malformed values and hands back normalized copies.

pub mod error;
pub mod input;
pub mod pattern;
pub mod rules;

pub use error::ValidationError;
pub use input::{FieldLocation, RequestInput, Resolved};
pub use pattern::Pattern;
pub use rules::{NormalizedField, NormalizedFields, Rule, RuleSet};
