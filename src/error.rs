use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::SeatState;

/// Domain errors surfaced over the API. Every variant maps onto the JSON
/// envelope `{"error": {"code", "message", "details"}}` so callers can branch
/// on `code` instead of parsing messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Seat is no longer available")]
    SeatUnavailable { suggestions: Vec<String> },

    #[error("{0}")]
    NotFound(String),

    #[error("Seat is not held (current state: {state})")]
    NotHeld { state: SeatState },

    #[error("Seat is held by a different passenger")]
    HeldByOther,

    #[error("Seat state changed concurrently, please retry")]
    ConcurrentConflict,

    #[error("You are already on the waitlist for this seat")]
    AlreadyOnWaitlist,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    // Transient store failures. Mutating calls are not auto-retried, the
    // caller decides (see the concurrency notes in DESIGN.md).
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SeatUnavailable { .. }
            | ApiError::NotHeld { .. }
            | ApiError::HeldByOther
            | ApiError::ConcurrentConflict
            | ApiError::AlreadyOnWaitlist => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NotHeld { .. } => "NOT_HELD",
            ApiError::HeldByOther => "HELD_BY_OTHER",
            ApiError::ConcurrentConflict => "CONCURRENT_CONFLICT",
            ApiError::AlreadyOnWaitlist => "ALREADY_ON_WAITLIST",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::SeatUnavailable { suggestions } => {
                Some(json!({ "suggestions": suggestions }))
            }
            ApiError::NotHeld { state } => Some(json!({ "currentState": state })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("database error: {:?}", e);
        }

        let mut body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        if let Some(details) = self.details() {
            body["error"]["details"] = details;
        }

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kinds_are_distinguishable() {
        let not_held = ApiError::NotHeld {
            state: SeatState::Available,
        };
        let held_by_other = ApiError::HeldByOther;
        assert_eq!(not_held.code(), "NOT_HELD");
        assert_eq!(held_by_other.code(), "HELD_BY_OTHER");
        assert_eq!(not_held.status(), StatusCode::CONFLICT);
        assert_eq!(held_by_other.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn status_codes_match_error_classes() {
        assert_eq!(
            ApiError::SeatUnavailable { suggestions: vec![] }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::NotFound("seat".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::AlreadyOnWaitlist.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::ConcurrentConflict.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn seat_unavailable_carries_suggestions() {
        let err = ApiError::SeatUnavailable {
            suggestions: vec!["10A".into(), "11A".into()],
        };
        let details = err.details().expect("details");
        assert_eq!(details["suggestions"][0], "10A");
        assert_eq!(details["suggestions"][1], "11A");
    }
}
