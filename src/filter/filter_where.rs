use serde_json::Value;

use super::tags::TagSet;

/// One optional search condition and the values it binds
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Scope to the caller's own diaries
    Owner(i64),
    DateOn(String),
    DateBetween { start: String, end: String },
    Category(i64),
    /// Exact tag-set match via a grouped derived-table join
    Tags(TagSet),
}

impl Predicate {
    /// Request fields the predicate reads
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Predicate::Owner(_) => &[],
            Predicate::DateOn(_) => &["date"],
            Predicate::DateBetween { .. } => &["start", "end"],
            Predicate::Category(_) => &["emotion_idx"],
            Predicate::Tags(_) => &["tag"],
        }
    }

    /// Number of placeholders the predicate consumes
    pub fn placeholders(&self) -> usize {
        match self {
            Predicate::Owner(_) | Predicate::DateOn(_) | Predicate::Category(_) => 1,
            Predicate::DateBetween { .. } => 2,
            Predicate::Tags(tags) => tags.len(),
        }
    }
}

/// Accumulates WHERE conditions, JOIN clauses and bound values behind a
/// single placeholder cursor. Consumed and returned by every `push`.
#[derive(Debug, Default)]
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<String>,
    joins: Vec<String>,
}

/// Output of [`FilterWhere::finish`]
#[derive(Debug, Clone, PartialEq)]
pub struct WhereParts {
    pub joins: Vec<String>,
    pub conditions: Vec<String>,
    pub params: Vec<Value>,
}

impl FilterWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused placeholder number
    pub fn cursor(&self) -> usize {
        self.param_index + 1
    }

    pub fn push(mut self, predicate: Predicate) -> Self {
        let before = self.param_index;
        let expected = predicate.placeholders();

        match predicate {
            Predicate::Owner(idx) => {
                let p = self.param(Value::from(idx));
                self.conditions.push(format!("D.user_idx = {}", p));
            }
            Predicate::DateOn(date) => {
                let p = self.param(Value::String(date));
                self.conditions.push(format!("D.date = {}::date", p));
            }
            Predicate::DateBetween { start, end } => {
                let from = self.param(Value::String(start));
                let to = self.param(Value::String(end));
                self.conditions.push(format!("D.date BETWEEN {}::date AND {}::date", from, to));
            }
            Predicate::Category(idx) => {
                let p = self.param(Value::from(idx));
                self.conditions.push(format!("D.emotion_idx = {}", p));
            }
            Predicate::Tags(tags) => {
                if !tags.is_empty() {
                    let size = tags.len();
                    let members: Vec<String> =
                        tags.names().iter().map(|name| self.param(Value::String(name.clone()))).collect();
                    // Every tag of the diary must be requested and the counts must agree
                    self.joins.push(format!(
                        "JOIN (SELECT diary_idx FROM diary_tag GROUP BY diary_idx \
                         HAVING COUNT(*) = {} AND BOOL_AND(name IN ({}))) TagFilter \
                         ON TagFilter.diary_idx = D.idx",
                        size,
                        members.join(", ")
                    ));
                }
            }
        }

        debug_assert_eq!(self.param_index - before, expected, "placeholder cursor drifted");
        self
    }

    pub fn finish(self) -> WhereParts {
        WhereParts { joins: self.joins, conditions: self.conditions, params: self.param_values }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}
