use serde::{Deserialize, Serialize};

use crate::{
    date::Date,
    fine,
    ids::{BookId, BookingId},
};

/// How a booking entered the user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum BookingKind {
    /// Waiting in the book's reservation queue; no dates set yet.
    Reserved,
    /// The book is physically held by the user.
    DirectBorrow,
}

impl BookingKind {
    /// Patron-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::DirectBorrow => "Direct Borrow",
        }
    }
}

/// Descriptive book fields frozen into a booking at creation time.
///
/// Kept verbatim even if the book is later edited or removed from the
/// catalog, so history listings stay faithful to what was actually lent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BookSnapshot {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub year: u16,
}

/// One lending transaction.
///
/// Created on borrow or reserve, mutated in place while active (fine
/// recomputed, kind flipped by the reservation cascade), and immutable once
/// moved to the account's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub book_id: BookId,
    /// Descriptive fields as of creation time.
    pub book: BookSnapshot,
    /// When the booking was created.
    pub booking_date: Date,
    /// When the book was handed over; `None` while a pending reservation.
    pub borrow_date: Option<Date>,
    /// When the book came back; `None` while active.
    pub return_date: Option<Date>,
    /// Last computed fine, in whole currency units.
    pub fine: u32,
    pub kind: BookingKind,
}

impl Booking {
    /// Booking for a book handed over immediately.
    #[must_use]
    pub fn direct_borrow(id: BookingId, book_id: BookId, book: BookSnapshot, date: Date) -> Self {
        Self {
            id,
            book_id,
            book,
            booking_date: date,
            borrow_date: Some(date),
            return_date: None,
            fine: 0,
            kind: BookingKind::DirectBorrow,
        }
    }

    /// Pending reservation; borrow and return dates stay unset until the
    /// reservation cascade promotes it.
    #[must_use]
    pub fn reserved(id: BookingId, book_id: BookId, book: BookSnapshot, date: Date) -> Self {
        Self {
            id,
            book_id,
            book,
            booking_date: date,
            borrow_date: None,
            return_date: None,
            fine: 0,
            kind: BookingKind::Reserved,
        }
    }

    /// Fine accrued as of `reference`, without mutating the record.
    ///
    /// Always zero for a pending reservation. Fines accrue from the borrow
    /// date — the day the book was physically held — never the booking date.
    #[must_use]
    pub fn fine_as_of(&self, reference: Date) -> u32 {
        match (self.kind, self.borrow_date) {
            (BookingKind::DirectBorrow, Some(borrowed)) => fine::fine_due(borrowed, reference),
            _ => 0,
        }
    }

    /// Promote a pending reservation into a live borrow as of `date`.
    pub fn promote(&mut self, date: Date) {
        self.kind = BookingKind::DirectBorrow;
        self.borrow_date = Some(date);
        self.return_date = None;
        self.fine = 0;
    }
}
