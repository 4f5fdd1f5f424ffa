use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::AppState;

// Фоновая очистка: истёкшие удержания мест и протухшие записи листа
// ожидания. Ошибки логируются и глотаются - ретрай это следующий тик.
pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Reverts every expired hold back to AVAILABLE and announces each freed
    /// seat. The state check sits inside the UPDATE itself, so a hold that
    /// got confirmed between scan and write is left untouched - the sweeper
    /// and the live confirm path race freely and the conditional write picks
    /// the winner.
    pub async fn sweep_expired_holds(&self) {
        let expired: Vec<(String, String, Option<String>)> = match sqlx::query_as(
            r#"
            WITH expired AS (
                SELECT id, seat_id, flight_id, held_by FROM seats
                WHERE state = 'HELD' AND hold_expires_at <= NOW()
                FOR UPDATE SKIP LOCKED
            )
            UPDATE seats s
            SET state = 'AVAILABLE', held_by = NULL, hold_id = NULL,
                hold_expires_at = NULL, updated_at = NOW()
            FROM expired e
            WHERE s.id = e.id AND s.state = 'HELD'
            RETURNING e.seat_id, e.flight_id, e.held_by
            "#,
        )
        .fetch_all(&self.state.db.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("hold expiration sweep failed: {:?}", e);
                return;
            }
        };

        if expired.is_empty() {
            return;
        }

        info!("🧹 Released {} expired holds", expired.len());

        for (seat_id, flight_id, previous_holder) in expired {
            info!(
                "Seat hold expired and released: {} on {} (was held by {:?})",
                seat_id, flight_id, previous_holder
            );

            self.state.cache.invalidate_seat_map(&flight_id).await;
            self.state
                .bus
                .publish(
                    "seat.hold.expired",
                    json!({
                        "seatId": seat_id,
                        "flightId": flight_id,
                        "previousHolder": previous_holder,
                    }),
                )
                .await;
        }
    }

    // Записи листа ожидания живут ограниченное время; просроченные просто
    // удаляются, никого не продвигая.
    pub async fn cleanup_expired_waitlist_entries(&self) {
        let result = sqlx::query("DELETE FROM waitlist_entries WHERE expires_at <= NOW()")
            .execute(&self.state.db.pool)
            .await;

        match result {
            Ok(deleted) if deleted.rows_affected() > 0 => {
                info!(
                    "🧹 Removed {} expired waitlist entries",
                    deleted.rows_affected()
                );
            }
            Ok(_) => {}
            Err(e) => error!("waitlist cleanup failed: {:?}", e),
        }
    }
}
