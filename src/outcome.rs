use std::fmt;

use crate::ids::{BookId, BookingId, UserId};

/// Whether the caller agreed to pay a fine blocking a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    /// Pay whatever is due and complete the return.
    Accepted,
    /// Refuse payment; the return is aborted with no state change.
    Declined,
}

/// Structured result of a successful engine operation.
///
/// The console layer renders these; typed failures travel separately as
/// [`crate::error::CirculationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Book handed over; a direct-borrow booking was opened.
    Borrowed { booking_id: BookingId },
    /// The book is currently held; the caller may reserve instead. Nothing
    /// was mutated.
    ReservationOffered { book_id: BookId },
    /// User appended to the reservation queue.
    Reserved { booking_id: BookingId },
    /// Reservation removed from the queue and closed into history.
    ReservationCancelled { book_id: BookId },
    /// No reservation existed to cancel; nothing changed.
    NoReservation { book_id: BookId },
    /// A fine is due and payment was not confirmed; nothing changed.
    FineDue { amount: u32 },
    /// Book returned. `fine` is what was collected; `reassigned_to` names the
    /// queued user the cascade handed the book to, if any.
    Returned { fine: u32, reassigned_to: Option<UserId> },
    /// Book added to the catalog.
    BookAdded { book_id: BookId },
    /// Book removed from the catalog.
    BookRemoved { book_id: BookId },
    /// User registered.
    UserAdded { user_id: UserId },
    /// User unregistered.
    UserRemoved { user_id: UserId },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrowed { booking_id } => {
                write!(f, "Book borrowed successfully. Booking ID: {booking_id}")
            }
            Self::ReservationOffered { book_id } => {
                write!(f, "Book {book_id} is currently borrowed; it can be reserved instead")
            }
            Self::Reserved { booking_id } => {
                write!(f, "Book reserved successfully. Booking ID: {booking_id}")
            }
            Self::ReservationCancelled { book_id } => {
                write!(f, "Reservation cancelled for book {book_id}")
            }
            Self::NoReservation { book_id } => {
                write!(f, "No reservation found for book {book_id}")
            }
            Self::FineDue { amount } => {
                write!(f, "A fine of {amount} is due; the return was not completed")
            }
            Self::Returned { fine, reassigned_to } => {
                write!(f, "Book returned successfully")?;
                if *fine > 0 {
                    write!(f, " (fine of {fine} collected)")?;
                }
                if let Some(user) = reassigned_to {
                    write!(f, "; reservation converted to borrow for user {user}")?;
                }
                Ok(())
            }
            Self::BookAdded { book_id } => write!(f, "Book added successfully. ID: {book_id}"),
            Self::BookRemoved { book_id } => write!(f, "Book {book_id} deleted successfully"),
            Self::UserAdded { user_id } => write!(f, "New user added. Unique ID: {user_id}"),
            Self::UserRemoved { user_id } => write!(f, "User {user_id} deleted successfully"),
        }
    }
}
