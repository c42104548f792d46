// handlers/public/users.rs - POST /users, POST /users/login

use axum::Extension;
use serde_json::json;

use crate::auth::{generate_jwt, password_digest, Claims};
use crate::database::SharedStorage;
use crate::error::ApiError;
use crate::filter::SqlResult;
use crate::handlers::utils::{field_str, row_i64};
use crate::middleware::{ApiResponse, ApiResult};
use crate::validation::{Pattern, RequestInput, RuleSet};

/// POST /users - register a new account
///
/// A duplicate e-mail trips the unique constraint and answers 409.
pub async fn register(Extension(storage): Extension<SharedStorage>, input: RequestInput) -> ApiResult {
    let fields = RuleSet::new()
        .rule(Pattern::Email, &["email"])
        .rule(Pattern::Password, &["password"])
        .rule(Pattern::Nickname, &["nickname"])
        .validate(&input)?;

    let email = field_str(&fields, "email")?;
    let sql = SqlResult::new(
        r#"INSERT INTO "user" (email, password, nickname) VALUES ($1, $2, $3) RETURNING idx"#,
        vec![
            json!(email),
            json!(password_digest(email, field_str(&fields, "password")?)),
            json!(field_str(&fields, "nickname")?),
        ],
    );

    let row = storage
        .fetch_optional(&sql)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("User was not created"))?;

    Ok(ApiResponse::created(json!({ "idx": row_i64(&row, "idx")? })))
}

/// POST /users/login - exchange credentials for a bearer token
pub async fn login(Extension(storage): Extension<SharedStorage>, input: RequestInput) -> ApiResult {
    let fields = RuleSet::new()
        .rule(Pattern::Email, &["email"])
        .rule(Pattern::Password, &["password"])
        .validate(&input)?;

    let email = field_str(&fields, "email")?;
    let sql = SqlResult::new(
        r#"SELECT idx, role FROM "user" WHERE email = $1 AND password = $2"#,
        vec![json!(email), json!(password_digest(email, field_str(&fields, "password")?))],
    );

    let Some(user) = storage.fetch_optional(&sql).await? else {
        tracing::warn!("Failed login attempt");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let rank = user.get("role").and_then(|v| v.as_str()).unwrap_or("user");
    let token = generate_jwt(&Claims::new(row_i64(&user, "idx")?, rank))?;

    Ok(ApiResponse::success(json!({ "token": token })))
}
