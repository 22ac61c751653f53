//! Client-side models shared with the backend

pub mod band;
pub mod id;
pub mod reservation;
pub mod stats;
pub mod user;

// Re-export for convenience
pub use band::{Band, BandMembership, BandUpdate, NewBand, NewMembership};
pub use id::Id;
pub use reservation::{NewReservation, Reservation, Room};
pub use stats::DashboardStats;
pub use user::{LoginRequest, Registration, User, is_udp_email};
