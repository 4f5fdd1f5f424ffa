use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Lifecycle of a seat. Transitions run only through conditional updates in
/// the hold service, so the database row is the single source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_state", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatState {
    Available,
    Held,
    Confirmed,
    // Administrative removal, terminal. Not touched by the hold/release path.
    Cancelled,
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeatState::Available => "AVAILABLE",
            SeatState::Held => "HELD",
            SeatState::Confirmed => "CONFIRMED",
            SeatState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_category", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatCategory {
    Window,
    Middle,
    Aisle,
}

impl SeatCategory {
    /// Standard single-aisle layout: A/F window, C/D aisle, B/E middle.
    pub fn for_column(column: char) -> Self {
        match column {
            'A' | 'F' => SeatCategory::Window,
            'C' | 'D' => SeatCategory::Aisle,
            _ => SeatCategory::Middle,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub seat_id: String,
    pub flight_id: String,
    pub row_number: i32,
    pub column_letter: String,
    pub category: SeatCategory,
    pub price: f64,
    pub state: SeatState,
    pub held_by: Option<String>,
    pub hold_id: Option<String>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
}

/// Public projection of one seat. Holder identity is never exposed: anything
/// not AVAILABLE collapses to UNAVAILABLE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat_id: String,
    pub row: i32,
    pub column: String,
    pub state: PublicSeatState,
    pub category: SeatCategory,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublicSeatState {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMapView {
    pub flight_id: String,
    pub total_seats: usize,
    pub available_seats: usize,
    pub seats: Vec<SeatView>,
}

impl SeatMapView {
    pub fn project(flight_id: &str, seats: &[Seat]) -> Self {
        SeatMapView {
            flight_id: flight_id.to_string(),
            total_seats: seats.len(),
            available_seats: seats
                .iter()
                .filter(|s| s.state == SeatState::Available)
                .count(),
            seats: seats
                .iter()
                .map(|s| SeatView {
                    seat_id: s.seat_id.clone(),
                    row: s.row_number,
                    column: s.column_letter.clone(),
                    state: if s.state == SeatState::Available {
                        PublicSeatState::Available
                    } else {
                        PublicSeatState::Unavailable
                    },
                    category: s.category,
                    price: s.price,
                })
                .collect(),
        }
    }
}

/// Splits a seat label like `12A` into row and column letter.
pub fn parse_seat_id(seat_id: &str) -> Option<(i32, char)> {
    let column = seat_id.chars().last()?;
    if !column.is_ascii_alphabetic() {
        return None;
    }
    let row: i32 = seat_id[..seat_id.len() - 1].parse().ok()?;
    if row < 1 {
        return None;
    }
    Some((row, column.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_column_letter() {
        assert_eq!(SeatCategory::for_column('A'), SeatCategory::Window);
        assert_eq!(SeatCategory::for_column('F'), SeatCategory::Window);
        assert_eq!(SeatCategory::for_column('C'), SeatCategory::Aisle);
        assert_eq!(SeatCategory::for_column('D'), SeatCategory::Aisle);
        assert_eq!(SeatCategory::for_column('B'), SeatCategory::Middle);
        assert_eq!(SeatCategory::for_column('E'), SeatCategory::Middle);
    }

    #[test]
    fn parses_seat_labels() {
        assert_eq!(parse_seat_id("12A"), Some((12, 'A')));
        assert_eq!(parse_seat_id("1F"), Some((1, 'F')));
        assert_eq!(parse_seat_id("30d"), Some((30, 'D')));
    }

    fn seat(seat_id: &str, state: SeatState, held_by: Option<&str>) -> Seat {
        let (row, column) = parse_seat_id(seat_id).unwrap();
        Seat {
            id: 1,
            seat_id: seat_id.to_string(),
            flight_id: "SK123".to_string(),
            row_number: row,
            column_letter: column.to_string(),
            category: SeatCategory::for_column(column),
            price: 25.0,
            state,
            held_by: held_by.map(String::from),
            hold_id: held_by.map(|_| "hold_x".to_string()),
            hold_expires_at: held_by.map(|_| Utc::now()),
            confirmed_by: None,
        }
    }

    #[test]
    fn projection_hides_holder_and_counts_availability() {
        let seats = vec![
            seat("1A", SeatState::Available, None),
            seat("1B", SeatState::Held, Some("P123")),
            seat("1C", SeatState::Confirmed, None),
            seat("2A", SeatState::Cancelled, None),
        ];

        let map = SeatMapView::project("SK123", &seats);

        assert_eq!(map.total_seats, 4);
        assert_eq!(map.available_seats, 1);
        assert_eq!(map.seats[0].state, PublicSeatState::Available);
        assert_eq!(map.seats[1].state, PublicSeatState::Unavailable);
        assert_eq!(map.seats[2].state, PublicSeatState::Unavailable);
        assert_eq!(map.seats[3].state, PublicSeatState::Unavailable);

        // No holder identity anywhere in the serialized view.
        let raw = serde_json::to_string(&map).unwrap();
        assert!(!raw.contains("P123"));
        assert!(!raw.contains("hold_x"));
    }

    #[test]
    fn rejects_malformed_seat_labels() {
        assert_eq!(parse_seat_id(""), None);
        assert_eq!(parse_seat_id("A"), None);
        assert_eq!(parse_seat_id("A12"), None);
        assert_eq!(parse_seat_id("0A"), None);
        assert_eq!(parse_seat_id("12"), None);
    }
}
