use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, RawPathParams, Request},
    http::StatusCode,
};
use serde_json::{Map, Value};

use super::error::ValidationError;
use super::rules::NormalizedFields;
use crate::error::ApiError;

/// Where a request field was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLocation {
    Body,
    Path,
    Query,
}

impl FieldLocation {
    /// Probe order used when resolving a field
    pub const PRIORITY: [FieldLocation; 3] = [FieldLocation::Body, FieldLocation::Path, FieldLocation::Query];
}

/// A field value as seen by the rule engine
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Text(String),
    /// Present but not representable as text (object, nested array)
    NonScalar,
}

/// The three input sources of one request. Repeated query keys are kept as
/// JSON arrays in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    body: Map<String, Value>,
    path: Map<String, Value>,
    query: Map<String, Value>,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a JSON body. `null` is treated as an empty body.
    pub fn with_body(mut self, body: Value) -> Result<Self, ValidationError> {
        match body {
            Value::Object(map) => self.body = map,
            Value::Null => self.body = Map::new(),
            _ => return Err(ValidationError::BodyNotObject),
        }
        Ok(self)
    }

    pub fn with_path<'a, I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in params {
            self.path.insert(key.to_string(), Value::String(value.to_string()));
        }
        self
    }

    /// Parse an urlencoded query string
    pub fn with_query(mut self, raw: Option<&str>) -> Self {
        let Some(raw) = raw else { return self };
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = Value::String(value.into_owned());
            match self.query.get_mut(&*key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    self.query.insert(key.into_owned(), value);
                }
            }
        }
        self
    }

    pub fn location(&self, location: FieldLocation) -> &Map<String, Value> {
        match location {
            FieldLocation::Body => &self.body,
            FieldLocation::Path => &self.path,
            FieldLocation::Query => &self.query,
        }
    }

    fn location_mut(&mut self, location: FieldLocation) -> &mut Map<String, Value> {
        match location {
            FieldLocation::Body => &mut self.body,
            FieldLocation::Path => &mut self.path,
            FieldLocation::Query => &mut self.query,
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// First location holding a non-empty value for `field`
    pub fn resolve(&self, field: &str) -> Option<(FieldLocation, Resolved)> {
        FieldLocation::PRIORITY.iter().find_map(|&location| {
            self.location(location)
                .get(field)
                .and_then(probe)
                .map(|resolved| (location, resolved))
        })
    }

    /// Every textual value supplied for a multi-valued field, taken from the
    /// first location that has any. Empty strings are kept so that callers
    /// can reject them.
    pub fn values(&self, field: &str) -> Vec<String> {
        for location in FieldLocation::PRIORITY {
            let Some(value) = self.location(location).get(field) else { continue };
            let items: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
                other => scalar_text(other).into_iter().collect(),
            };
            if !items.is_empty() {
                return items;
            }
        }
        Vec::new()
    }

    /// Write normalized values back into the location they were read from
    pub fn merge(&mut self, fields: NormalizedFields) {
        for (name, field) in fields {
            self.location_mut(field.location).insert(name, field.value);
        }
    }
}

fn probe(value: &Value) -> Option<Resolved> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(Resolved::Text(s.clone())),
        Value::Number(n) => Some(Resolved::Text(n.to_string())),
        Value::Bool(true) => Some(Resolved::Text("true".to_string())),
        // Repeated keys resolve to their first non-empty occurrence
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Array(_) => Some(Resolved::NonScalar),
            other => probe(other),
        }),
        Value::Object(_) => Some(Resolved::NonScalar),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        // Routes without parameters simply contribute nothing
        let path = RawPathParams::from_request_parts(&mut parts, state).await.ok();
        let query = parts.uri.query().map(str::to_owned);

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::payload_too_large(rejection.body_text())
                } else {
                    ApiError::bad_request(rejection.body_text())
                }
            })?;

        let mut input = RequestInput::new().with_query(query.as_deref());
        if let Some(params) = path {
            input = input.with_path(params.iter());
        }
        if !bytes.is_empty() {
            let body: Value = serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))?;
            input = input.with_body(body)?;
        }

        Ok(input)
    }
}
