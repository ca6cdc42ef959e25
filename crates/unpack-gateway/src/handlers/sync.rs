//! Image sync handler.
//!
//! Runs after the route's auth layer has accepted the caller. Relays the
//! `image` query parameter to the provider's pipeline trigger.

use crate::errors::GatewayError;
use crate::models::{AuthenticatedCaller, SyncParams, SyncResponse};
use crate::services::PipelineTrigger;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// State for one provider's sync routes.
#[derive(Clone)]
pub struct SyncState {
    pub trigger: Arc<dyn PipelineTrigger>,
}

/// Handler for POST /api/{provider}/sync/{scheme}
///
/// # Response
///
/// - 200 with `{"status":"triggered","provider":...,"image":...}` on success
/// - 400 if `image` is missing or blank
/// - The provider's status with `Token server error: {body}` if it rejects the trigger
/// - 502 if the provider is unreachable
#[instrument(
    skip_all,
    name = "ug.sync.image",
    fields(provider = %state.trigger.provider(), scheme = %caller.scheme)
)]
pub async fn sync_image(
    State(state): State<Arc<SyncState>>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResponse>, GatewayError> {
    let image = params
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "ug.sync", "Missing image query parameter");
            GatewayError::BadRequest("Missing image query parameter".to_string())
        })?;

    tracing::info!(
        target: "ug.sync",
        image = %image,
        origin = caller.origin.as_deref().unwrap_or("-"),
        "Triggering pipeline"
    );

    state.trigger.trigger(&image).await?;

    Ok(Json(SyncResponse {
        status: "triggered".to_string(),
        provider: state.trigger.provider(),
        image,
    }))
}
