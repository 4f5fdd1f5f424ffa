use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "loyalty_tier", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoyaltyTier {
    Platinum,
    Gold,
    Silver,
    Regular,
}

/// Baggage selection captured at join time; replayed verbatim into the
/// check-in completion call when the passenger is promoted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baggage {
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: i64,
    pub waitlist_id: String,
    pub passenger_id: String,
    pub check_in_id: String,
    pub flight_id: String,
    pub seat_id: String,
    pub priority_score: i32,
    pub loyalty_tier: LoyaltyTier,
    pub special_needs: bool,
    pub baggage: Json<Baggage>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
