use crate::{
    date::Date,
    ids::{BookId, UserId},
};

/// A committed state change, announced to observers after the fact.
///
/// Events describe what already happened; nothing here can be vetoed. The
/// lending engine also keeps a bounded log of recent events for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LendingEvent {
    /// A direct-borrow booking was opened and the book handed over.
    Borrowed { user: UserId, book: BookId, date: Date },
    /// The user joined the book's reservation queue.
    Reserved { user: UserId, book: BookId, date: Date },
    /// A reservation was cancelled by its owner.
    ReservationCancelled { user: UserId, book: BookId },
    /// A borrowed book came back; `fine` is what was collected.
    Returned { user: UserId, book: BookId, date: Date, fine: u32 },
    /// The reservation cascade handed the book to the next queued user.
    ReservationPromoted { user: UserId, book: BookId, date: Date },
    /// The cascade dropped a queued user (ineligible or unresolvable).
    ReservationDiscarded { user: UserId, book: BookId },
    /// A book joined the catalog.
    BookAdded { book: BookId },
    /// A book left the catalog.
    BookRemoved { book: BookId },
    /// A user joined the roster.
    UserAdded { user: UserId },
    /// A user left the roster.
    UserRemoved { user: UserId },
}
