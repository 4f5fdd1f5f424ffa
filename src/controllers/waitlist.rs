use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::services::waitlist::{JoinWaitlistRequest, WaitlistService};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/waitlist", post(join_waitlist))
        .route("/waitlist/{waitlist_id}", delete(leave_waitlist))
}

// POST /api/waitlist
async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinWaitlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let response = WaitlistService::new(state).join_waitlist(&req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// DELETE /api/waitlist/{waitlist_id}
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LeaveWaitlistRequest {
    #[validate(length(min = 1, max = 50))]
    passenger_id: String,
}

async fn leave_waitlist(
    State(state): State<Arc<AppState>>,
    Path(waitlist_id): Path<String>,
    Json(req): Json<LeaveWaitlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    WaitlistService::new(state)
        .leave_waitlist(&waitlist_id, &req.passenger_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Removed from waitlist successfully",
            "waitlistId": waitlist_id,
        })),
    ))
}
