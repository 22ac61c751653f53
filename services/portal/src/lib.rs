//! Bandroom client
//!
//! Session handling, band management and rehearsal room reservations on
//! top of the Bandroom REST backend, plus the console front end used by the
//! `bandroom` binary.

pub mod api;
pub mod availability;
pub mod backend;
pub mod bands;
pub mod cli;
pub mod console;
pub mod models;
pub mod reservations;
pub mod session;
pub mod validation;

pub use api::ApiClient;
pub use availability::AvailabilityView;
pub use console::Console;
pub use session::SessionStore;
