//! Waitlist priority scoring. Pure functions, no clock injection: the score
//! is computed once at join time and stored on the entry.

use chrono::{DateTime, Utc};

use crate::models::LoyaltyTier;

const BOOKING_AGE_CAP: i64 = 400;
const BOOKING_POINTS_PER_DAY: i64 = 10;
const SPECIAL_NEEDS_BONUS: i32 = 200;

pub fn tier_weight(tier: LoyaltyTier) -> i32 {
    match tier {
        LoyaltyTier::Platinum => 400,
        LoyaltyTier::Gold => 300,
        LoyaltyTier::Silver => 200,
        LoyaltyTier::Regular => 100,
    }
}

/// `tier + min(400, 10 × days since booking) + 200 if special needs`.
/// Bookings stamped in the future contribute zero age points.
pub fn calculate(
    tier: LoyaltyTier,
    booking_timestamp: DateTime<Utc>,
    special_needs: bool,
) -> i32 {
    let days_since_booking = (Utc::now() - booking_timestamp).num_days().max(0);
    let booking_points =
        (days_since_booking * BOOKING_POINTS_PER_DAY).min(BOOKING_AGE_CAP) as i32;

    let mut score = tier_weight(tier) + booking_points;
    if special_needs {
        score += SPECIAL_NEEDS_BONUS;
    }
    score
}

/// Display-only estimate shown to a passenger joining at `position`.
/// Never used for ordering.
pub fn estimate_wait_time(position: i64) -> &'static str {
    match position {
        1 => "5-10 minutes",
        2..=3 => "15-30 minutes",
        4..=5 => "30-60 minutes",
        _ => "1-2 hours",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn booked_days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[test]
    fn platinum_old_booking_special_needs_maxes_out() {
        // 400 tier + 400 capped age (50 days) + 200 special needs
        let score = calculate(LoyaltyTier::Platinum, booked_days_ago(50), true);
        assert_eq!(score, 1000);
    }

    #[test]
    fn regular_booked_today_is_the_floor() {
        let score = calculate(LoyaltyTier::Regular, Utc::now(), false);
        assert_eq!(score, 100);
    }

    #[test]
    fn booking_age_points_are_capped_at_400() {
        let at_cap = calculate(LoyaltyTier::Regular, booked_days_ago(40), false);
        let past_cap = calculate(LoyaltyTier::Regular, booked_days_ago(365), false);
        assert_eq!(at_cap, 500);
        assert_eq!(past_cap, 500);
    }

    #[test]
    fn future_booking_timestamp_contributes_nothing() {
        let score = calculate(LoyaltyTier::Gold, Utc::now() + Duration::days(3), false);
        assert_eq!(score, 300);
    }

    #[test]
    fn tier_weights_are_strictly_ordered() {
        assert!(tier_weight(LoyaltyTier::Platinum) > tier_weight(LoyaltyTier::Gold));
        assert!(tier_weight(LoyaltyTier::Gold) > tier_weight(LoyaltyTier::Silver));
        assert!(tier_weight(LoyaltyTier::Silver) > tier_weight(LoyaltyTier::Regular));
    }

    #[test]
    fn wait_time_buckets() {
        assert_eq!(estimate_wait_time(1), "5-10 minutes");
        assert_eq!(estimate_wait_time(2), "15-30 minutes");
        assert_eq!(estimate_wait_time(3), "15-30 minutes");
        assert_eq!(estimate_wait_time(4), "30-60 minutes");
        assert_eq!(estimate_wait_time(5), "30-60 minutes");
        assert_eq!(estimate_wait_time(6), "1-2 hours");
        assert_eq!(estimate_wait_time(40), "1-2 hours");
    }

    fn any_tier() -> impl Strategy<Value = LoyaltyTier> {
        prop_oneof![
            Just(LoyaltyTier::Platinum),
            Just(LoyaltyTier::Gold),
            Just(LoyaltyTier::Silver),
            Just(LoyaltyTier::Regular),
        ]
    }

    proptest! {
        #[test]
        fn score_stays_in_bounds(
            tier in any_tier(),
            days in 0i64..3650,
            special in proptest::bool::ANY,
        ) {
            let score = calculate(tier, booked_days_ago(days), special);
            prop_assert!(score >= 100);
            prop_assert!(score <= 1000);
        }

        #[test]
        fn older_bookings_never_score_lower(
            tier in any_tier(),
            days in 0i64..3650,
            extra in 1i64..100,
        ) {
            let newer = calculate(tier, booked_days_ago(days), false);
            let older = calculate(tier, booked_days_ago(days + extra), false);
            prop_assert!(older >= newer);
        }
    }
}
