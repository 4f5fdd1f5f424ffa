//! Seat hold/release/confirm state machine.
//!
//! Every transition is a single conditional read-modify-write against the
//! seats table; the database transaction is the only mutual exclusion in the
//! system. Cache invalidation and event publication happen strictly after
//! commit, so a crash in between leaves at worst a stale cache entry (heals
//! at TTL) or a missed event (healed by the sweeper or the next release).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::seat::{parse_seat_id, Seat, SeatCategory, SeatMapView, SeatState};
use crate::AppState;

const MAX_ALTERNATIVE_SEATS: i64 = 3;
const ALTERNATIVE_ROW_SPREAD: i32 = 2;

pub struct SeatHoldService {
    state: Arc<AppState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldSeatResponse {
    pub hold_id: String,
    pub seat_id: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: u64,
}

impl SeatHoldService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// AVAILABLE → HELD, or a `SeatUnavailable` conflict with up to three
    /// same-category suggestions from nearby rows.
    ///
    /// A HELD seat whose expiry has already passed still rejects here: expiry
    /// is reclaimed by the sweeper, never inline (see DESIGN.md).
    pub async fn hold_seat(
        &self,
        flight_id: &str,
        seat_id: &str,
        passenger_id: &str,
        duration: Option<u64>,
    ) -> Result<HoldSeatResponse, ApiError> {
        let duration = duration.unwrap_or(self.state.config.hold.duration_seconds);
        let expires_at = Utc::now() + Duration::seconds(duration as i64);
        let hold_id = format!("hold_{}", Uuid::new_v4());

        let mut tx = self.state.db.pool.begin().await?;

        let held = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE seats
            SET state = 'HELD', held_by = $3, hold_id = $4, hold_expires_at = $5, updated_at = NOW()
            WHERE seat_id = $1 AND flight_id = $2 AND state = 'AVAILABLE'
            RETURNING id
            "#,
        )
        .bind(seat_id)
        .bind(flight_id)
        .bind(passenger_id)
        .bind(&hold_id)
        .bind(expires_at)
        .fetch_optional(&mut *tx)
        .await?;

        if held.is_none() {
            let suggestions = Self::find_alternative_seats(&mut tx, flight_id, seat_id).await?;
            return Err(ApiError::SeatUnavailable { suggestions });
        }

        tx.commit().await?;

        info!(
            "Seat held: {} on {} by {} until {}",
            seat_id, flight_id, passenger_id, expires_at
        );

        self.state.cache.invalidate_seat_map(flight_id).await;
        self.state
            .bus
            .publish(
                "seat.held",
                json!({
                    "seatId": seat_id,
                    "flightId": flight_id,
                    "passengerId": passenger_id,
                    "expiresAt": expires_at,
                }),
            )
            .await;

        Ok(HoldSeatResponse {
            hold_id,
            seat_id: seat_id.to_string(),
            expires_at,
            remaining_seconds: duration,
        })
    }

    /// {HELD, CONFIRMED} → AVAILABLE. Releasing a CONFIRMED seat is the
    /// cancellation path; releasing an AVAILABLE seat is NotFound.
    pub async fn release_seat(&self, seat_id: &str, flight_id: &str) -> Result<(), ApiError> {
        let released = sqlx::query(
            r#"
            UPDATE seats
            SET state = 'AVAILABLE', held_by = NULL, hold_id = NULL,
                hold_expires_at = NULL, confirmed_by = NULL, updated_at = NOW()
            WHERE seat_id = $1 AND flight_id = $2 AND state IN ('HELD', 'CONFIRMED')
            "#,
        )
        .bind(seat_id)
        .bind(flight_id)
        .execute(&self.state.db.pool)
        .await?;

        if released.rows_affected() == 0 {
            return Err(ApiError::NotFound(
                "Seat not found or already released".to_string(),
            ));
        }

        info!("Seat released: {} on {}", seat_id, flight_id);

        self.state.cache.invalidate_seat_map(flight_id).await;
        self.state
            .bus
            .publish(
                "seat.released",
                json!({ "seatId": seat_id, "flightId": flight_id }),
            )
            .await;

        Ok(())
    }

    /// HELD(by passenger) → CONFIRMED.
    ///
    /// Reads the current row first so the caller gets a precise reason
    /// (NotFound / NotHeld / HeldByOther). The write then re-checks the same
    /// condition; losing that second check means another transaction slipped
    /// in between, which is reported as ConcurrentConflict rather than
    /// disguised as NotHeld.
    pub async fn confirm_seat(
        &self,
        seat_id: &str,
        flight_id: &str,
        passenger_id: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.state.db.pool.begin().await?;

        let current: Option<(SeatState, Option<String>)> = sqlx::query_as(
            "SELECT state, held_by FROM seats WHERE seat_id = $1 AND flight_id = $2",
        )
        .bind(seat_id)
        .bind(flight_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (state, held_by) =
            current.ok_or_else(|| ApiError::NotFound("Seat not found".to_string()))?;

        if state != SeatState::Held {
            return Err(ApiError::NotHeld { state });
        }
        if held_by.as_deref() != Some(passenger_id) {
            return Err(ApiError::HeldByOther);
        }

        let confirmed = sqlx::query(
            r#"
            UPDATE seats
            SET state = 'CONFIRMED', confirmed_by = $3, held_by = NULL,
                hold_id = NULL, hold_expires_at = NULL, updated_at = NOW()
            WHERE seat_id = $1 AND flight_id = $2 AND state = 'HELD' AND held_by = $3
            "#,
        )
        .bind(seat_id)
        .bind(flight_id)
        .bind(passenger_id)
        .execute(&mut *tx)
        .await?;

        if confirmed.rows_affected() == 0 {
            return Err(ApiError::ConcurrentConflict);
        }

        tx.commit().await?;

        info!(
            "Seat confirmed: {} on {} by {}",
            seat_id, flight_id, passenger_id
        );

        self.state.cache.invalidate_seat_map(flight_id).await;
        self.state
            .bus
            .publish(
                "seat.confirmed",
                json!({
                    "seatId": seat_id,
                    "flightId": flight_id,
                    "passengerId": passenger_id,
                }),
            )
            .await;

        Ok(())
    }

    /// Read-through seat map: cached public projection, or a fresh read that
    /// repopulates the cache.
    pub async fn get_seat_map(&self, flight_id: &str) -> Result<SeatMapView, ApiError> {
        if let Some(cached) = self.state.cache.get_seat_map(flight_id).await {
            return Ok(cached);
        }

        let seats: Vec<Seat> = sqlx::query_as(
            "SELECT * FROM seats WHERE flight_id = $1 ORDER BY row_number, column_letter",
        )
        .bind(flight_id)
        .fetch_all(&self.state.db.pool)
        .await?;

        if seats.is_empty() {
            return Err(ApiError::NotFound(
                "Flight not found or has no seats".to_string(),
            ));
        }

        let map = SeatMapView::project(flight_id, &seats);
        self.state.cache.store_seat_map(flight_id, &map).await;
        Ok(map)
    }

    // Same category, rows within ±2 of the requested seat, nearest rows
    // first. Category falls back to the column letter when the requested
    // seat does not exist at all.
    async fn find_alternative_seats(
        tx: &mut Transaction<'_, Postgres>,
        flight_id: &str,
        seat_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        let Some((row, column)) = parse_seat_id(seat_id) else {
            return Ok(Vec::new());
        };
        let category = SeatCategory::for_column(column);

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT seat_id FROM seats
            WHERE flight_id = $1 AND state = 'AVAILABLE' AND category = $2
              AND row_number BETWEEN $3 AND $4 AND seat_id <> $5
            ORDER BY row_number, column_letter
            LIMIT $6
            "#,
        )
        .bind(flight_id)
        .bind(category)
        .bind(row - ALTERNATIVE_ROW_SPREAD)
        .bind(row + ALTERNATIVE_ROW_SPREAD)
        .bind(seat_id)
        .bind(MAX_ALTERNATIVE_SEATS)
        .fetch_all(&mut **tx)
        .await
    }
}
