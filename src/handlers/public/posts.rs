use axum::Extension;

use crate::database::SharedStorage;
use crate::filter::SqlResult;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /posts/preview - titles and emotions only, newest first
pub async fn preview(Extension(storage): Extension<SharedStorage>) -> ApiResult {
    let sql = SqlResult::new(
        "SELECT P.idx, P.title, E.name AS emotion FROM post P JOIN emotion E ON E.idx = P.emotion_idx \
         ORDER BY P.idx DESC",
        Vec::new(),
    );
    Ok(ApiResponse::list(storage.fetch_all(&sql).await?))
}
