use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Extension, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod validation;

#[cfg(test)]
pub mod testing;

use database::SharedStorage;
use error::ApiError;
use handlers::{protected, public};

/// Full application router over the given storage
pub fn app(storage: SharedStorage) -> Router {
    let settings = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected
        .merge(protected_routes())
        .fallback(not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes))
        .layer(Extension(storage));

    if settings.security.enable_cors {
        router = router.layer(cors_layer(&settings.security.cors_origins));
    }
    if settings.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn public_routes() -> Router {
    Router::new()
        .route("/users", post(public::users::register))
        .route("/users/login", post(public::users::login))
        .route("/emotions", get(public::emotions::list))
        .route("/posts/preview", get(public::posts::preview))
}

fn protected_routes() -> Router {
    use protected::{comments, diaries, likes, posts};

    Router::new()
        .route("/diaries", get(diaries::search).post(diaries::create))
        .route("/diaries/:idx", get(diaries::get).put(diaries::update).delete(diaries::delete))
        .route("/posts", post(posts::create))
        .route("/posts/:idx", get(posts::get))
        .route("/posts/:idx/likes", post(likes::create).delete(likes::delete))
        .route("/posts/:idx/comments", get(comments::list).post(comments::create))
        .route("/posts/:idx/comments/:comment_idx", delete(comments::delete))
        .route_layer(from_fn(middleware::jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Diary API",
            "version": version,
            "endpoints": {
                "users": "/users, /users/login (public)",
                "emotions": "/emotions (public)",
                "diaries": "/diaries[/:idx] (protected)",
                "posts": "/posts/preview (public), /posts[/:idx[/likes|/comments[/:comment_idx]]] (protected)",
            }
        }
    }))
}

async fn health(Extension(storage): Extension<SharedStorage>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match storage.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
