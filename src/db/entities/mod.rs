//! Table definitions
pub mod reservations;
