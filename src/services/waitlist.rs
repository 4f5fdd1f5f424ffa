//! Waitlist membership and the event-driven reassignment engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{Baggage, LoyaltyTier, WaitlistEntry};
use crate::services::checkin::CompleteCheckInRequest;
use crate::services::notify::SendNotificationRequest;
use crate::services::priority;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinWaitlistRequest {
    #[validate(length(min = 1, max = 50))]
    pub passenger_id: String,
    #[validate(length(min = 1, max = 50))]
    pub check_in_id: String,
    #[validate(length(min = 1, max = 20))]
    pub flight_id: String,
    #[validate(length(min = 1, max = 10))]
    pub seat_id: String,
    pub loyalty_tier: LoyaltyTier,
    // Defaults to "booked right now", i.e. zero age points.
    pub booking_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub special_needs: bool,
    #[serde(default)]
    pub baggage: Baggage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistResponse {
    pub waitlist_id: String,
    pub position: i64,
    pub estimated_wait_time: String,
}

#[derive(Clone)]
pub struct WaitlistService {
    state: Arc<AppState>,
}

impl WaitlistService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn join_waitlist(
        &self,
        req: &JoinWaitlistRequest,
    ) -> Result<WaitlistResponse, ApiError> {
        let already_waiting: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM waitlist_entries
                WHERE passenger_id = $1 AND flight_id = $2 AND seat_id = $3
            )
            "#,
        )
        .bind(&req.passenger_id)
        .bind(&req.flight_id)
        .bind(&req.seat_id)
        .fetch_one(&self.state.db.pool)
        .await?;

        if already_waiting {
            return Err(ApiError::AlreadyOnWaitlist);
        }

        let booking_timestamp = req.booking_timestamp.unwrap_or_else(Utc::now);
        let priority_score =
            priority::calculate(req.loyalty_tier, booking_timestamp, req.special_needs);
        let waitlist_id = format!("wl_{}", Uuid::new_v4());
        let expires_at =
            Utc::now() + Duration::hours(self.state.config.waitlist.entry_ttl_hours);

        let inserted = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO waitlist_entries
                (waitlist_id, passenger_id, check_in_id, flight_id, seat_id,
                 priority_score, loyalty_tier, special_needs, baggage, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING created_at
            "#,
        )
        .bind(&waitlist_id)
        .bind(&req.passenger_id)
        .bind(&req.check_in_id)
        .bind(&req.flight_id)
        .bind(&req.seat_id)
        .bind(priority_score)
        .bind(req.loyalty_tier)
        .bind(req.special_needs)
        .bind(Json(req.baggage.clone()))
        .bind(expires_at)
        .fetch_one(&self.state.db.pool)
        .await;

        let created_at = match inserted {
            Ok(created_at) => created_at,
            // Lost a race against a duplicate join; the unique index decides.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(ApiError::AlreadyOnWaitlist)
            }
            Err(e) => return Err(e.into()),
        };

        let position = self
            .position(&req.seat_id, &req.flight_id, priority_score, created_at)
            .await?;

        info!(
            "Passenger {} joined waitlist for {} on {} (position {}, score {})",
            req.passenger_id, req.seat_id, req.flight_id, position, priority_score
        );

        self.state
            .bus
            .publish(
                "waitlist.joined",
                json!({
                    "waitlistId": waitlist_id,
                    "passengerId": req.passenger_id,
                    "seatId": req.seat_id,
                    "position": position,
                }),
            )
            .await;

        Ok(WaitlistResponse {
            waitlist_id,
            position,
            estimated_wait_time: priority::estimate_wait_time(position).to_string(),
        })
    }

    pub async fn leave_waitlist(
        &self,
        waitlist_id: &str,
        passenger_id: &str,
    ) -> Result<(), ApiError> {
        let owner: Option<String> = sqlx::query_scalar(
            "SELECT passenger_id FROM waitlist_entries WHERE waitlist_id = $1",
        )
        .bind(waitlist_id)
        .fetch_optional(&self.state.db.pool)
        .await?;

        let owner =
            owner.ok_or_else(|| ApiError::NotFound("Waitlist entry not found".to_string()))?;
        if owner != passenger_id {
            return Err(ApiError::Forbidden(
                "Waitlist entry belongs to a different passenger".to_string(),
            ));
        }

        let deleted = sqlx::query(
            "DELETE FROM waitlist_entries WHERE waitlist_id = $1 AND passenger_id = $2",
        )
        .bind(waitlist_id)
        .bind(passenger_id)
        .execute(&self.state.db.pool)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(ApiError::NotFound("Waitlist entry not found".to_string()));
        }

        info!("Passenger {} left waitlist entry {}", passenger_id, waitlist_id);

        self.state
            .bus
            .publish(
                "waitlist.left",
                json!({ "waitlistId": waitlist_id, "passengerId": passenger_id }),
            )
            .await;

        Ok(())
    }

    // Position = 1 + waiters ahead. "Ahead" means a higher score, or the same
    // score with an earlier join (the deterministic tie-break used everywhere).
    async fn position(
        &self,
        seat_id: &str,
        flight_id: &str,
        priority_score: i32,
        created_at: DateTime<Utc>,
    ) -> Result<i64, ApiError> {
        let ahead: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM waitlist_entries
            WHERE seat_id = $1 AND flight_id = $2
              AND (priority_score > $3
                   OR (priority_score = $3 AND created_at < $4))
            "#,
        )
        .bind(seat_id)
        .bind(flight_id)
        .bind(priority_score)
        .bind(created_at)
        .fetch_one(&self.state.db.pool)
        .await?;

        Ok(ahead + 1)
    }

    /// Reassignment engine, triggered by `seat.released` and
    /// `seat.hold.expired`.
    ///
    /// Walks candidates best-first in a loop (not recursion: a long run of
    /// failing entries must not grow the stack). Every attempted entry is
    /// deleted whether its check-in completion succeeded or not - one bad
    /// entry never blocks the people behind it, and failed entries are never
    /// retried.
    pub async fn process_seat_available(
        &self,
        seat_id: &str,
        flight_id: &str,
    ) -> Result<(), ApiError> {
        loop {
            let mut tx = self.state.db.pool.begin().await?;

            let entry: Option<WaitlistEntry> = sqlx::query_as(
                r#"
                SELECT * FROM waitlist_entries
                WHERE seat_id = $1 AND flight_id = $2
                ORDER BY priority_score DESC, created_at ASC
                LIMIT 1
                "#,
            )
            .bind(seat_id)
            .bind(flight_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(entry) = entry else {
                info!("No waitlist entries for seat {} on {}", seat_id, flight_id);
                return Ok(());
            };

            info!(
                "Processing waitlist assignment: {} for {} on seat {} (score {})",
                entry.waitlist_id, entry.passenger_id, seat_id, entry.priority_score
            );

            let completion = self
                .state
                .checkin
                .complete_check_in(&CompleteCheckInRequest {
                    check_in_id: entry.check_in_id.clone(),
                    passenger_id: entry.passenger_id.clone(),
                    seat_id: seat_id.to_string(),
                    baggage: entry.baggage.0.clone(),
                })
                .await;

            sqlx::query("DELETE FROM waitlist_entries WHERE waitlist_id = $1")
                .bind(&entry.waitlist_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            match completion {
                Ok(completed) => {
                    self.state
                        .bus
                        .publish(
                            "waitlist.checkin.completed",
                            json!({
                                "waitlistId": entry.waitlist_id,
                                "checkInId": entry.check_in_id,
                                "passengerId": entry.passenger_id,
                                "seatId": seat_id,
                                "flightId": flight_id,
                                "boardingPass": completed.boarding_pass,
                            }),
                        )
                        .await;

                    self.state
                        .notifier
                        .send(&SendNotificationRequest {
                            passenger_id: entry.passenger_id.clone(),
                            notification_type: "WAITLIST_CHECKIN_COMPLETED".to_string(),
                            channels: vec!["push".into(), "email".into(), "sms".into()],
                            data: json!({
                                "seatId": seat_id,
                                "flightId": flight_id,
                                "state": completed.state,
                            }),
                        })
                        .await;

                    info!(
                        "Waitlist check-in auto-completed: {} for {} on seat {}",
                        entry.waitlist_id, entry.passenger_id, seat_id
                    );
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        "Failed to auto-complete check-in for {} ({}): {}; trying next candidate",
                        entry.waitlist_id, entry.check_in_id, e
                    );
                    continue;
                }
            }
        }
    }
}
