// handlers/protected/likes.rs - /posts/:idx/likes
//
// Existence and duplicate checks are left to the post_likes constraints:
// an unknown post fails the foreign key (404), a second like fails the
// primary key (409).

use axum::Extension;
use serde_json::{json, Value};

use crate::database::SharedStorage;
use crate::error::ApiError;
use crate::filter::SqlResult;
use crate::handlers::utils::field_i64;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::{Pattern, RequestInput, RuleSet};

fn post_idx(input: &RequestInput) -> Result<i64, ApiError> {
    let fields = RuleSet::new().rule(Pattern::Id, &["idx"]).validate(input)?;
    field_i64(&fields, "idx")
}

/// POST /posts/:idx/likes
pub async fn create(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let idx = post_idx(&input)?;

    storage
        .execute(&SqlResult::new(
            "INSERT INTO post_likes (post_idx, user_idx) VALUES ($1, $2)",
            vec![json!(idx), json!(user.idx)],
        ))
        .await?;

    Ok(ApiResponse::created(json!({ "post_idx": idx })))
}

/// DELETE /posts/:idx/likes
pub async fn delete(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let idx = post_idx(&input)?;

    let removed = storage
        .execute(&SqlResult::new(
            "DELETE FROM post_likes WHERE post_idx = $1 AND user_idx = $2",
            vec![json!(idx), json!(user.idx)],
        ))
        .await?;

    if removed == 0 {
        return Err(ApiError::not_found("Like not found"));
    }
    Ok(ApiResponse::<Value>::no_content())
}
