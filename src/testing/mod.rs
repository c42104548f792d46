//! In-memory storage double and request helpers for driving the router in-process.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::{generate_jwt, Claims};
use crate::database::{DatabaseError, SharedStorage, Storage};
use crate::filter::SqlResult;

/// Scripted answer for the next storage call
pub enum Reply {
    Rows(Vec<Value>),
    Affected(u64),
    Fail(DatabaseError),
}

/// Records every statement it is asked to run and answers from a script.
/// An empty script answers with no rows and zero affected rows.
#[derive(Default)]
pub struct RecordingStorage {
    statements: Mutex<Vec<SqlResult>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let storage = Self::default();
        storage.replies.lock().unwrap().extend(replies);
        Arc::new(storage)
    }

    pub fn statements(&self) -> Vec<SqlResult> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &SqlResult) -> Option<Reply> {
        self.statements.lock().unwrap().push(sql.clone());
        self.replies.lock().unwrap().pop_front()
    }

    fn rows(reply: Option<Reply>) -> Result<Vec<Value>, DatabaseError> {
        match reply {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    fn affected(reply: Option<Reply>) -> Result<u64, DatabaseError> {
        match reply {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError> {
        Self::rows(self.record(sql))
    }

    async fn fetch_optional(&self, sql: &SqlResult) -> Result<Option<Value>, DatabaseError> {
        Ok(Self::rows(self.record(sql))?.into_iter().next())
    }

    async fn execute(&self, sql: &SqlResult) -> Result<u64, DatabaseError> {
        Self::affected(self.record(sql))
    }

    async fn execute_all(&self, statements: &[SqlResult]) -> Result<u64, DatabaseError> {
        self.statements.lock().unwrap().extend(statements.iter().cloned());
        let reply = self.replies.lock().unwrap().pop_front();
        Self::affected(reply)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub fn shared(storage: &Arc<RecordingStorage>) -> SharedStorage {
    storage.clone()
}

pub fn token_for(idx: i64) -> String {
    generate_jwt(&Claims::new(idx, "user")).unwrap()
}

/// Send one request through a fresh router and return status plus parsed body
pub async fn send(
    storage: &Arc<RecordingStorage>,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = crate::app(shared(storage)).oneshot(request).await.unwrap();
    read(response).await
}

async fn read(response: Response<Body>) -> (u16, Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
