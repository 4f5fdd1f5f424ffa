pub mod seat;
pub mod waitlist;

pub use seat::{Seat, SeatCategory, SeatState};
pub use waitlist::{Baggage, LoyaltyTier, WaitlistEntry};
