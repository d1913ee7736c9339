//! Circulation desk for a small library.
//!
//! The [`engine::LendingEngine`] owns the catalog and the user roster and
//! enforces the lending rules: role-based eligibility, late fines with a
//! grace period, and a FIFO reservation queue per book with a promotion
//! cascade on return. State persists as a single JSON snapshot.

pub mod account;
pub mod booking;
pub mod catalog;
pub mod date;
pub mod display;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod events;
pub mod fine;
pub mod ids;
pub mod observers;
pub mod outcome;
pub mod persistence;
pub mod roster;

pub use catalog::{Availability, Book, Catalog};
pub use date::Date;
pub use engine::LendingEngine;
pub use error::{CirculationError, CirculationResult};
pub use outcome::{Outcome, PaymentDecision};
pub use persistence::Snapshot;
pub use roster::{Role, Roster, User};
