use serde_json::Value;

/// A finished statement and the values bound to `$1..$n`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

impl SqlResult {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self { query: query.into(), params }
    }

    /// Highest `$n` referenced in the statement text
    pub fn max_placeholder(&self) -> usize {
        let bytes = self.query.as_bytes();
        let mut max = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if let Ok(n) = self.query[start..end].parse::<usize>() {
                    max = max.max(n);
                }
                i = end.max(start);
            } else {
                i += 1;
            }
        }
        max
    }
}

/// Date condition of a diary search. Absence is expressed with `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    On(String),
    Between { start: String, end: String },
}
