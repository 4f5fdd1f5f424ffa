use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::SeatCategory;
use crate::services::holds::SeatHoldService;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/flights/{flight_id}/seats",
            get(get_seat_map).post(seed_flight),
        )
        .route("/seats/hold", post(hold_seat))
        .route("/seats/release", patch(release_seat))
        .route("/seats/confirm", patch(confirm_seat))
}

/* ---------- SEAT MAP ---------- */

// GET /api/flights/{flight_id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let map = SeatHoldService::new(state).get_seat_map(&flight_id).await?;
    Ok((StatusCode::OK, Json(map)))
}

/* ---------- HOLD / RELEASE / CONFIRM ---------- */

// POST /api/seats/hold
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct HoldSeatRequest {
    #[validate(length(min = 1, max = 20))]
    flight_id: String,
    #[validate(length(min = 1, max = 10))]
    seat_id: String,
    #[validate(length(min = 1, max = 50))]
    passenger_id: String,
    // Seconds; defaults to the configured hold duration.
    #[validate(range(min = 10, max = 3600))]
    duration: Option<u64>,
}

async fn hold_seat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HoldSeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let response = SeatHoldService::new(state)
        .hold_seat(&req.flight_id, &req.seat_id, &req.passenger_id, req.duration)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

// PATCH /api/seats/release
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ReleaseSeatRequest {
    #[validate(length(min = 1, max = 10))]
    seat_id: String,
    #[validate(length(min = 1, max = 20))]
    flight_id: String,
}

async fn release_seat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReleaseSeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    SeatHoldService::new(state)
        .release_seat(&req.seat_id, &req.flight_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Seat released successfully",
            "seatId": req.seat_id,
            "state": "AVAILABLE",
        })),
    ))
}

// PATCH /api/seats/confirm
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ConfirmSeatRequest {
    #[validate(length(min = 1, max = 10))]
    seat_id: String,
    #[validate(length(min = 1, max = 20))]
    flight_id: String,
    #[validate(length(min = 1, max = 50))]
    passenger_id: String,
}

async fn confirm_seat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmSeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    SeatHoldService::new(state)
        .confirm_seat(&req.seat_id, &req.flight_id, &req.passenger_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Seat confirmed successfully",
            "seatId": req.seat_id,
            "state": "CONFIRMED",
        })),
    ))
}

/* ---------- SEEDING ---------- */

// POST /api/flights/{flight_id}/seats - (re)seed the seat grid for a flight.
// Administrative surface; authentication lives at the gateway.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SeedFlightRequest {
    #[validate(range(min = 1, max = 100))]
    rows: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    premium_rows: Option<i32>,
    #[validate(range(min = 0.0))]
    premium_price: Option<f64>,
    #[validate(range(min = 0.0))]
    standard_price: Option<f64>,
}

const COLUMNS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

async fn seed_flight(
    State(state): State<Arc<AppState>>,
    Path(flight_id): Path<String>,
    Json(req): Json<SeedFlightRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if flight_id.is_empty() || flight_id.len() > 20 {
        return Err(ApiError::Validation(
            "flight_id must be 1-20 characters".to_string(),
        ));
    }

    let rows = req.rows.unwrap_or(30);
    let premium_rows = req.premium_rows.unwrap_or(5);
    let premium_price = req.premium_price.unwrap_or(50.0);
    let standard_price = req.standard_price.unwrap_or(25.0);

    let mut tx = state.db.pool.begin().await?;

    sqlx::query("DELETE FROM seats WHERE flight_id = $1")
        .bind(&flight_id)
        .execute(&mut *tx)
        .await?;

    let mut seeded = 0;
    for row in 1..=rows {
        for column in COLUMNS {
            sqlx::query(
                r#"
                INSERT INTO seats (seat_id, flight_id, row_number, column_letter, category, price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(format!("{}{}", row, column))
            .bind(&flight_id)
            .bind(row)
            .bind(column.to_string())
            .bind(SeatCategory::for_column(column))
            .bind(if row <= premium_rows {
                premium_price
            } else {
                standard_price
            })
            .execute(&mut *tx)
            .await?;
            seeded += 1;
        }
    }

    tx.commit().await?;

    state.cache.invalidate_seat_map(&flight_id).await;
    tracing::info!("Seeded {} seats for flight {}", seeded, flight_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "flightId": flight_id, "seatsCreated": seeded })),
    ))
}
