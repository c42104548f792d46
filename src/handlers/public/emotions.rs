use axum::Extension;

use crate::database::SharedStorage;
use crate::filter::SqlResult;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /emotions
pub async fn list(Extension(storage): Extension<SharedStorage>) -> ApiResult {
    let rows = storage
        .fetch_all(&SqlResult::new("SELECT idx, name FROM emotion ORDER BY idx", Vec::new()))
        .await?;
    Ok(ApiResponse::list(rows))
}
