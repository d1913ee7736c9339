use thiserror::Error;

use crate::{
    catalog::Availability,
    ids::{BookId, BookingId, UserId},
};

/// Everything a circulation operation can fail with.
///
/// All variants are recovered at the operation boundary and rendered as text
/// by the console layer; none are fatal to the process.
#[derive(Debug, Error)]
pub enum CirculationError {
    /// Malformed date input.
    #[error("invalid date {0:?}: expected exactly eight digits (DDMMYYYY)")]
    InvalidFormat(String),
    /// Unknown book id.
    #[error("book {0} not found")]
    BookNotFound(BookId),
    /// Unknown user id.
    #[error("user {0} not found")]
    UserNotFound(UserId),
    /// Unknown booking id.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),
    /// The booking exists but belongs to another user.
    #[error("booking {0} does not belong to the requesting user")]
    NotOwned(BookingId),
    /// The role rule rejected the operation; carries the patron-facing reason.
    #[error("not eligible to borrow: {0}")]
    Ineligible(String),
    /// Deletion blocked: the book is borrowed or has queued reservations.
    #[error("book {0} is borrowed or has pending reservations")]
    BookInUse(BookId),
    /// Deletion blocked: the user still has active bookings.
    #[error("user {0} still has active bookings")]
    UserInUse(UserId),
    /// The booking was already moved to history.
    #[error("booking {0} is already closed")]
    AlreadyClosed(BookingId),
    /// The user already holds an active booking for this book.
    #[error("an active booking for book {0} already exists on this account")]
    AlreadyQueued(BookId),
    /// The operation does not apply to the book's current availability.
    #[error("book {book} is {availability:?}; the requested operation does not apply")]
    InvalidTransition {
        /// Book the operation targeted.
        book: BookId,
        /// Availability at the time of the request.
        availability: Availability,
    },
    /// Administrative operation attempted by the wrong role.
    #[error("operation not permitted for this role")]
    Forbidden,
    /// Credential mismatch on login.
    #[error("invalid credentials for user {0}")]
    InvalidCredential(UserId),
    /// Snapshot file could not be read or written.
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot contents could not be (de)serialized.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Shorthand for results carrying a [`CirculationError`].
pub type CirculationResult<T> = Result<T, CirculationError>;
