// handlers/protected/comments.rs - /posts/:idx/comments[/:comment_idx]

use axum::Extension;
use serde_json::{json, Value};

use crate::database::SharedStorage;
use crate::error::ApiError;
use crate::filter::SqlResult;
use crate::handlers::utils::{field_i64, field_str, require_owner, row_i64};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::{Pattern, RequestInput, RuleSet};

/// GET /posts/:idx/comments
pub async fn list(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = RuleSet::new().rule(Pattern::Id, &["idx"]).validate(&input)?;

    let sql = SqlResult::new(
        r#"SELECT C.idx, C.content, U.nickname, (C.user_idx = $1) AS "isMine", C.created_at AS "date"
           FROM comment C
           JOIN "user" U ON U.idx = C.user_idx
           WHERE C.post_idx = $2
           ORDER BY C.idx"#,
        vec![json!(user.idx), json!(field_i64(&fields, "idx")?)],
    );

    Ok(ApiResponse::list(storage.fetch_all(&sql).await?))
}

/// POST /posts/:idx/comments
pub async fn create(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = RuleSet::new()
        .rule(Pattern::Id, &["idx"])
        .rule(Pattern::Content, &["content"])
        .validate(&input)?;

    let sql = SqlResult::new(
        "INSERT INTO comment (post_idx, user_idx, content) VALUES ($1, $2, $3) RETURNING idx",
        vec![
            json!(field_i64(&fields, "idx")?),
            json!(user.idx),
            json!(field_str(&fields, "content")?),
        ],
    );

    let row = storage
        .fetch_optional(&sql)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Comment was not created"))?;

    Ok(ApiResponse::created(json!({ "idx": row_i64(&row, "idx")? })))
}

/// DELETE /posts/:idx/comments/:comment_idx
pub async fn delete(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = RuleSet::new().rule(Pattern::Id, &["idx", "comment_idx"]).validate(&input)?;
    let post_idx = field_i64(&fields, "idx")?;
    let comment_idx = field_i64(&fields, "comment_idx")?;

    let lookup = SqlResult::new(
        "SELECT user_idx FROM comment WHERE idx = $1 AND post_idx = $2",
        vec![json!(comment_idx), json!(post_idx)],
    );
    require_owner(storage.as_ref(), &lookup, &user, "Comment").await?;

    storage
        .execute(&SqlResult::new("DELETE FROM comment WHERE idx = $1", vec![json!(comment_idx)]))
        .await?;
    Ok(ApiResponse::<Value>::no_content())
}
