use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    booking::Booking,
    catalog::{Book, Catalog},
    engine::LendingEngine,
    error::CirculationResult,
    ids::UserId,
    roster::{Role, Roster, User},
};

/// A persisted user, without the account (bookings are stored flat so the
/// file stays greppable per section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub credential: String,
    pub role: Role,
}

/// A persisted booking together with the account it belongs to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingRecord {
    pub user_id: UserId,
    pub booking: Booking,
}

/// The whole circulation state as one JSON document.
///
/// Books carry their reservation queues inline; bookings are flattened out of
/// the accounts into two lists, active and closed, and reattached on restore.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Snapshot {
    pub books: Vec<Book>,
    pub users: Vec<UserRecord>,
    pub active_bookings: Vec<BookingRecord>,
    pub history_bookings: Vec<BookingRecord>,
}

impl Snapshot {
    /// Capture the engine's current state.
    #[must_use]
    pub fn capture(engine: &LendingEngine) -> Self {
        let books = engine.catalog().iter().cloned().collect();
        let mut users = Vec::new();
        let mut active_bookings = Vec::new();
        let mut history_bookings = Vec::new();
        for user in engine.roster().iter() {
            users.push(UserRecord {
                id: user.id.clone(),
                name: user.name.clone(),
                credential: user.credential.clone(),
                role: user.role,
            });
            for booking in user.account.active() {
                active_bookings.push(BookingRecord {
                    user_id: user.id.clone(),
                    booking: booking.clone(),
                });
            }
            for booking in user.account.history() {
                history_bookings.push(BookingRecord {
                    user_id: user.id.clone(),
                    booking: booking.clone(),
                });
            }
        }
        Self {
            books,
            users,
            active_bookings,
            history_bookings,
        }
    }

    /// Rebuild the catalog and roster.
    ///
    /// Booking rows naming a user absent from the user section are orphans
    /// (hand-edited or truncated file); they are logged and skipped rather
    /// than failing the whole load.
    #[must_use]
    pub fn restore(self) -> (Catalog, Roster) {
        let catalog = Catalog::from_books(self.books);
        let mut roster = Roster::new();
        for record in self.users {
            roster.add_user(User::new(
                record.id,
                record.name,
                record.credential,
                record.role,
            ));
        }
        for row in self.active_bookings {
            match roster.get_mut(&row.user_id) {
                Ok(user) => user.account.open(row.booking),
                Err(_) => {
                    tracing::warn!(user = %row.user_id, booking = %row.booking.id, "skipping orphaned active booking");
                }
            }
        }
        for row in self.history_bookings {
            match roster.get_mut(&row.user_id) {
                Ok(user) => user.account.record_history(row.booking),
                Err(_) => {
                    tracing::warn!(user = %row.user_id, booking = %row.booking.id, "skipping orphaned history booking");
                }
            }
        }
        (catalog, roster)
    }

    /// Write the snapshot to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Serialization or I/O failures, as
    /// [`crate::error::CirculationError::Snapshot`] and
    /// [`crate::error::CirculationError::Io`].
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> CirculationResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot back from `path`.
    ///
    /// # Errors
    ///
    /// Serialization or I/O failures, as
    /// [`crate::error::CirculationError::Snapshot`] and
    /// [`crate::error::CirculationError::Io`].
    pub fn load_from_file(path: impl AsRef<Path>) -> CirculationResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::{
        date::Date,
        ids::{BookId, UserId},
        outcome::{Outcome, PaymentDecision},
    };

    fn seeded_engine() -> LendingEngine {
        let mut catalog = Catalog::new();
        catalog.add_book(Book::new(
            BookId::new("B1"),
            "Dune",
            "Frank Herbert",
            "Ace",
            "9780441172719",
            1965,
        ));
        catalog.add_book(Book::new(
            BookId::new("B2"),
            "Hyperion",
            "Dan Simmons",
            "Doubleday",
            "9780385249492",
            1989,
        ));
        let mut roster = Roster::new();
        roster.add_user(User::new(UserId::new("S1"), "Paul", "pw1", Role::Student));
        roster.add_user(User::new(UserId::new("S2"), "Leto", "pw2", Role::Student));
        roster.add_user(User::new(UserId::new("F1"), "Jessica", "pw3", Role::Faculty));
        LendingEngine::new(catalog, roster)
    }

    #[test]
    fn round_trip_preserves_state() {
        let mut engine = seeded_engine();
        let d = Date::parse("01012024").unwrap();
        let Outcome::Borrowed { booking_id } = engine
            .borrow(&UserId::new("S1"), &BookId::new("B1"), d)
            .unwrap()
        else {
            panic!("expected a borrow");
        };
        engine.reserve(&UserId::new("S2"), &BookId::new("B1"), d).unwrap();
        engine.reserve(&UserId::new("F1"), &BookId::new("B1"), d).unwrap();
        let Outcome::Borrowed { booking_id: b2 } = engine
            .borrow(&UserId::new("F1"), &BookId::new("B2"), d)
            .unwrap()
        else {
            panic!("expected a borrow");
        };
        engine
            .return_book(&UserId::new("F1"), &b2, d, PaymentDecision::Accepted)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        Snapshot::capture(&engine).save_to_file(&path).unwrap();

        let (catalog, roster) = Snapshot::load_from_file(&path).unwrap().restore();
        let restored = LendingEngine::new(catalog, roster);

        let b1 = restored.catalog().get(&BookId::new("B1")).unwrap();
        assert_eq!(b1.availability, crate::catalog::Availability::Borrowed);
        // Queue order survives the round trip.
        let queued: Vec<_> = b1.reservation_queue.iter().cloned().collect();
        assert_eq!(queued, vec![UserId::new("S2"), UserId::new("F1")]);

        let s1 = restored.roster().get(&UserId::new("S1")).unwrap();
        assert!(s1.account.get_active(&booking_id).is_some());
        let f1 = restored.roster().get(&UserId::new("F1")).unwrap();
        assert_eq!(f1.account.active_count(), 1);
        assert!(f1.account.in_history(&b2));
        assert!(restored
            .authenticate(&UserId::new("S2"), "pw2")
            .is_ok());
    }

    #[test]
    fn orphaned_booking_rows_are_skipped() {
        let engine = seeded_engine();
        let mut snapshot = Snapshot::capture(&engine);
        snapshot.active_bookings.push(BookingRecord {
            user_id: UserId::new("GONE"),
            booking: crate::booking::Booking::direct_borrow(
                crate::ids::BookingId::new("BK1"),
                BookId::new("B1"),
                engine.catalog().get(&BookId::new("B1")).unwrap().snapshot(),
                Date::parse("01012024").unwrap(),
            ),
        });

        let (_, roster) = snapshot.restore();
        assert_eq!(roster.iter().count(), 3);
        assert!(roster.iter().all(|u| u.account.active_count() == 0));
    }

    #[test]
    fn empty_snapshot_restores_cleanly() {
        let (catalog, roster) = Snapshot::default().restore();
        assert!(catalog.is_empty());
        assert_eq!(roster.iter().count(), 0);
    }
}
