// handlers/protected/posts.rs - /posts, /posts/:idx

use axum::Extension;
use serde_json::json;

use crate::database::SharedStorage;
use crate::error::ApiError;
use crate::filter::SqlResult;
use crate::handlers::utils::{field_i64, field_str, row_i64};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::{Pattern, RequestInput, RuleSet};

/// POST /posts
pub async fn create(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = RuleSet::new()
        .rule(Pattern::Title, &["title"])
        .rule(Pattern::Content, &["content"])
        .rule(Pattern::Id, &["emotion_idx"])
        .validate(&input)?;

    let sql = SqlResult::new(
        "INSERT INTO post (title, content, emotion_idx, user_idx) VALUES ($1, $2, $3, $4) RETURNING idx",
        vec![
            json!(field_str(&fields, "title")?),
            json!(field_str(&fields, "content")?),
            json!(field_i64(&fields, "emotion_idx")?),
            json!(user.idx),
        ],
    );

    let row = storage
        .fetch_optional(&sql)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Post was not created"))?;

    Ok(ApiResponse::created(json!({ "idx": row_i64(&row, "idx")? })))
}

/// GET /posts/:idx - post with like summary from the caller's point of view
pub async fn get(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = RuleSet::new().rule(Pattern::Id, &["idx"]).validate(&input)?;
    let idx = field_i64(&fields, "idx")?;

    let sql = SqlResult::new(
        r#"SELECT P.idx, P.title, P.content, (P.user_idx = $1) AS "isMine", P.created_at AS "date",
               (SELECT COUNT(*) FROM post_likes L WHERE L.post_idx = P.idx) AS "likesCount",
               EXISTS (SELECT 1 FROM post_likes L WHERE L.post_idx = P.idx AND L.user_idx = $1) AS "likedByMe"
           FROM post P
           WHERE P.idx = $2"#,
        vec![json!(user.idx), json!(idx)],
    );

    match storage.fetch_optional(&sql).await? {
        Some(post) => Ok(ApiResponse::success(post)),
        None => Err(ApiError::not_found("Post not found")),
    }
}
