use std::collections::BTreeMap;

use crate::{
    booking::{Booking, BookingKind},
    ids::{BookId, BookingId},
};

/// Active and historical bookings for one user, keyed by booking id.
///
/// The two collections are disjoint; a booking moves from `active` to
/// `history` exactly once, on return or reservation cancellation, and is
/// immutable afterwards. Ordered maps keep listings stable, as in the flat
/// files this replaces.
#[derive(Debug, Default, Clone)]
pub struct Account {
    active: BTreeMap<BookingId, Booking>,
    history: BTreeMap<BookingId, Booking>,
}

impl Account {
    /// Add a freshly created booking to the active set.
    pub fn open(&mut self, booking: Booking) {
        self.active.insert(booking.id.clone(), booking);
    }

    /// Move an active booking into history, returning it if it existed.
    pub fn close(&mut self, id: &BookingId) -> Option<&Booking> {
        let booking = self.active.remove(id)?;
        Some(self.history.entry(id.clone()).or_insert(booking))
    }

    /// Insert a booking straight into history (snapshot restore only).
    pub fn record_history(&mut self, booking: Booking) {
        self.history.insert(booking.id.clone(), booking);
    }

    /// Active bookings in id order.
    pub fn active(&self) -> impl Iterator<Item = &Booking> {
        self.active.values()
    }

    /// Closed bookings in id order.
    pub fn history(&self) -> impl Iterator<Item = &Booking> {
        self.history.values()
    }

    /// Number of active bookings, reservations included.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Look up an active booking.
    #[must_use]
    pub fn get_active(&self, id: &BookingId) -> Option<&Booking> {
        self.active.get(id)
    }

    /// Look up an active booking for mutation.
    pub fn get_active_mut(&mut self, id: &BookingId) -> Option<&mut Booking> {
        self.active.get_mut(id)
    }

    /// Whether the booking id has already been closed.
    #[must_use]
    pub fn in_history(&self, id: &BookingId) -> bool {
        self.history.contains_key(id)
    }

    /// Whether any active booking, borrowed or reserved, targets `book_id`.
    #[must_use]
    pub fn has_active_for(&self, book_id: &BookId) -> bool {
        self.active.values().any(|b| b.book_id == *book_id)
    }

    /// The active pending reservation for `book_id`, if any.
    #[must_use]
    pub fn find_reservation(&self, book_id: &BookId) -> Option<&Booking> {
        self.active
            .values()
            .find(|b| b.kind == BookingKind::Reserved && b.book_id == *book_id)
    }
}
