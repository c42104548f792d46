use serde_json::Value;

use crate::database::Storage;
use crate::error::ApiError;
use crate::filter::{SqlResult, TagSet};
use crate::middleware::AuthUser;
use crate::validation::{NormalizedFields, RequestInput};

/// Integer column of a storage row
pub fn row_i64(row: &Value, column: &str) -> Result<i64, ApiError> {
    row.get(column).and_then(Value::as_i64).ok_or_else(|| {
        tracing::error!("Row is missing integer column {}: {}", column, row);
        ApiError::internal_server_error("An error occurred while processing your request")
    })
}

/// Integer field guaranteed by a required ruleset
pub fn field_i64(fields: &NormalizedFields, name: &str) -> Result<i64, ApiError> {
    fields
        .i64(name)
        .ok_or_else(|| ApiError::field_error("Invalid request data", name, "This field is required"))
}

pub fn field_str<'a>(fields: &'a NormalizedFields, name: &str) -> Result<&'a str, ApiError> {
    fields
        .str(name)
        .ok_or_else(|| ApiError::field_error("Invalid request data", name, "This field is required"))
}

/// Tags supplied with a write; any invalid name rejects the request
pub fn write_tags(input: &RequestInput) -> Result<TagSet, ApiError> {
    if let Some(tag) = input.body().get("tag") {
        let well_formed = match tag {
            Value::Null | Value::String(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        };
        if !well_formed {
            return Err(ApiError::field_error("Invalid request data", "tag", "Tags must be a list of strings"));
        }
    }
    Ok(TagSet::parse(input.values("tag"))?)
}

pub fn tag_array(tags: &TagSet) -> Value {
    Value::Array(tags.names().iter().cloned().map(Value::String).collect())
}

/// Look up the owner of a record and compare it with the caller.
/// Missing record is 404, someone else's record is 403.
pub async fn require_owner(
    storage: &dyn Storage,
    lookup: &SqlResult,
    user: &AuthUser,
    resource: &str,
) -> Result<(), ApiError> {
    let row = storage
        .fetch_optional(lookup)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", resource)))?;

    if row_i64(&row, "user_idx")? != user.idx {
        tracing::warn!("User {} tried to modify another user's {}", user.idx, resource.to_lowercase());
        return Err(ApiError::forbidden(format!("Only the author can modify this {}", resource.to_lowercase())));
    }
    Ok(())
}
