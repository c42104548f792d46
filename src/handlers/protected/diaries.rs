// handlers/protected/diaries.rs - /diaries resource, scoped to the caller

use axum::Extension;
use serde_json::{json, Value};

use crate::database::SharedStorage;
use crate::error::ApiError;
use crate::filter::{search_rules, DiaryFilter, SqlResult};
use crate::handlers::utils::{field_i64, field_str, require_owner, row_i64, tag_array, write_tags};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::{Pattern, RequestInput, RuleSet};

fn diary_rules() -> RuleSet {
    RuleSet::new()
        .rule(Pattern::Title, &["title"])
        .rule(Pattern::Content, &["content"])
        .rule(Pattern::Id, &["emotion_idx"])
        .rule(Pattern::Date, &["date"])
}

fn idx_rules() -> RuleSet {
    RuleSet::new().rule(Pattern::Id, &["idx"])
}

fn owner_lookup(diary_idx: i64) -> SqlResult {
    SqlResult::new("SELECT user_idx FROM diary WHERE idx = $1", vec![json!(diary_idx)])
}

/// GET /diaries - search the caller's diaries
pub async fn search(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = search_rules().validate(&input)?;
    let filter = DiaryFilter::from_fields(user.idx, &fields, &input)?;

    let rows = storage.fetch_all(&filter.to_sql()).await?;
    Ok(ApiResponse::list(rows))
}

/// POST /diaries - diary and tags are written by one statement
pub async fn create(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = diary_rules().validate(&input)?;
    let tags = write_tags(&input)?;

    let sql = SqlResult::new(
        "WITH inserted AS ( \
             INSERT INTO diary (user_idx, title, content, emotion_idx, date) \
             VALUES ($1, $2, $3, $4, $5::date) RETURNING idx \
         ), tagged AS ( \
             INSERT INTO diary_tag (name, diary_idx) \
             SELECT t.name, inserted.idx FROM inserted, UNNEST($6::text[]) AS t(name) \
             ON CONFLICT DO NOTHING \
         ) \
         SELECT idx FROM inserted",
        vec![
            json!(user.idx),
            json!(field_str(&fields, "title")?),
            json!(field_str(&fields, "content")?),
            json!(field_i64(&fields, "emotion_idx")?),
            json!(field_str(&fields, "date")?),
            tag_array(&tags),
        ],
    );

    let rows = storage.fetch_all(&sql).await?;
    let row = rows
        .first()
        .ok_or_else(|| ApiError::internal_server_error("Diary was not created"))?;
    let idx = row_i64(row, "idx")?;

    tracing::info!("User {} created diary {} with {} tag(s)", user.idx, idx, tags.len());
    Ok(ApiResponse::created(json!({ "idx": idx })))
}

/// GET /diaries/:idx
pub async fn get(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let fields = idx_rules().validate(&input)?;
    let idx = field_i64(&fields, "idx")?;

    let sql = SqlResult::new(
        "SELECT D.idx, D.title, D.content, D.emotion_idx, TO_CHAR(D.date, 'YYYY-MM-DD') AS date, \
         NULLIF(ARRAY(SELECT name FROM diary_tag WHERE diary_idx = D.idx ORDER BY name), '{}') AS tag \
         FROM diary D WHERE D.idx = $1 AND D.user_idx = $2",
        vec![json!(idx), json!(user.idx)],
    );

    match storage.fetch_optional(&sql).await? {
        Some(diary) => Ok(ApiResponse::success(diary)),
        None => Err(ApiError::not_found("Diary not found")),
    }
}

/// PUT /diaries/:idx - replace fields and tags in one transaction
pub async fn update(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let idx = field_i64(&idx_rules().validate(&input)?, "idx")?;
    let fields = diary_rules().validate(&input)?;
    let tags = write_tags(&input)?;

    require_owner(storage.as_ref(), &owner_lookup(idx), &user, "Diary").await?;

    let mut statements = vec![
        SqlResult::new(
            "UPDATE diary SET title = $1, content = $2, emotion_idx = $3, date = $4::date WHERE idx = $5",
            vec![
                json!(field_str(&fields, "title")?),
                json!(field_str(&fields, "content")?),
                json!(field_i64(&fields, "emotion_idx")?),
                json!(field_str(&fields, "date")?),
                json!(idx),
            ],
        ),
        SqlResult::new("DELETE FROM diary_tag WHERE diary_idx = $1", vec![json!(idx)]),
    ];
    if !tags.is_empty() {
        statements.push(SqlResult::new(
            "INSERT INTO diary_tag (name, diary_idx) SELECT t.name, $1 FROM UNNEST($2::text[]) AS t(name) \
             ON CONFLICT DO NOTHING",
            vec![json!(idx), tag_array(&tags)],
        ));
    }

    storage.execute_all(&statements).await?;
    Ok(ApiResponse::success(json!({ "idx": idx })))
}

/// DELETE /diaries/:idx - tags go with the diary
pub async fn delete(
    Extension(storage): Extension<SharedStorage>,
    Extension(user): Extension<AuthUser>,
    input: RequestInput,
) -> ApiResult {
    let idx = field_i64(&idx_rules().validate(&input)?, "idx")?;

    require_owner(storage.as_ref(), &owner_lookup(idx), &user, "Diary").await?;

    storage
        .execute(&SqlResult::new("DELETE FROM diary WHERE idx = $1", vec![json!(idx)]))
        .await?;
    Ok(ApiResponse::<Value>::no_content())
}
