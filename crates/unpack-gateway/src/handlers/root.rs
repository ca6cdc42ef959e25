//! Root liveness message.

use crate::models::{RootResponse, ROOT_MESSAGE};
use axum::Json;

/// Handler for GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}
