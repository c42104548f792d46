use std::collections::BTreeMap;

use serde_json::Value;

use super::error::ValidationError;
use super::input::{FieldLocation, RequestInput, Resolved};
use super::pattern::Pattern;

/// One pattern and the fields it governs
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub fields: Vec<&'static str>,
}

/// Ordered list of rules checked against a request. Field names are expected
/// to be disjoint across rules; a field listed twice is checked twice and the
/// later rule's normalization wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    optional: bool,
}

impl RuleSet {
    /// Every declared field is required
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared fields may be absent; absent fields are skipped entirely
    pub fn optional() -> Self {
        Self { rules: Vec::new(), optional: true }
    }

    pub fn rule(mut self, pattern: Pattern, fields: &[&'static str]) -> Self {
        self.rules.push(Rule { pattern, fields: fields.to_vec() });
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Check every declared field, failing on the first violation. Returns
    /// the normalized values; the request itself is left untouched.
    pub fn validate(&self, input: &RequestInput) -> Result<NormalizedFields, ValidationError> {
        let mut normalized = NormalizedFields::default();

        for rule in &self.rules {
            for &field in &rule.fields {
                let Some((location, resolved)) = input.resolve(field) else {
                    if self.optional {
                        continue;
                    }
                    return Err(ValidationError::Missing { field: field.to_string() });
                };

                let invalid = || ValidationError::Invalid { field: field.to_string(), rule: rule.pattern.name() };

                let text = match resolved {
                    Resolved::Text(text) => text,
                    Resolved::NonScalar => return Err(invalid()),
                };
                if !rule.pattern.matches(&text) {
                    return Err(invalid());
                }
                let value = rule.pattern.normalize(&text).ok_or_else(invalid)?;

                normalized.insert(field, NormalizedField { location, pattern: rule.pattern, value });
            }
        }

        Ok(normalized)
    }
}

/// A validated value together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedField {
    pub location: FieldLocation,
    pub pattern: Pattern,
    pub value: Value,
}

/// Output of [`RuleSet::validate`], keyed by field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFields {
    fields: BTreeMap<String, NormalizedField>,
}

impl NormalizedFields {
    fn insert(&mut self, name: &str, field: NormalizedField) {
        self.fields.insert(name.to_string(), field);
    }

    pub fn get(&self, name: &str) -> Option<&NormalizedField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|f| f.value.as_i64())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|f| f.value.as_str())
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for NormalizedFields {
    type Item = (String, NormalizedField);
    type IntoIter = std::collections::btree_map::IntoIter<String, NormalizedField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
