use std::collections::HashSet;
use std::fmt;

use rand::Rng;

use crate::{
    booking::{Booking, BookingKind},
    catalog::{Availability, Book, Catalog},
    date::Date,
    eligibility::{self, Eligibility},
    error::{CirculationError, CirculationResult},
    events::LendingEvent,
    ids::{BookId, BookingId, UserId},
    observers::CirculationObserver,
    outcome::{Outcome, PaymentDecision},
    roster::{Role, Roster, User},
};

/// Alphabet for generated identifiers.
const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated identifiers.
const ID_LENGTH: usize = 10;

/// How many committed events the engine keeps for reporting.
const EVENT_LOG_CAPACITY: usize = 100;

/// Mints the 10-character uppercase alphanumeric ids used for books, users,
/// and bookings, retrying on collision with ids already issued or loaded.
#[derive(Debug, Default)]
struct IdGenerator {
    issued: HashSet<String>,
}

impl IdGenerator {
    /// Mark a loaded id as taken.
    fn reserve(&mut self, raw: &str) {
        self.issued.insert(raw.to_string());
    }

    /// Generate a fresh unique id.
    fn mint(&mut self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (0..ID_LENGTH)
                .map(|_| {
                    let index = rng.gen_range(0..ID_CHARSET.len());
                    char::from(ID_CHARSET.get(index).copied().unwrap_or(b'A'))
                })
                .collect();
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// The lending state machine.
///
/// Owns the catalog and the roster and is the sole writer of both; every
/// operation takes the acting user's id and a caller-supplied reference date,
/// runs to completion, and either commits fully or leaves no state change.
/// Read-only reporting methods never mutate.
pub struct LendingEngine {
    catalog: Catalog,
    roster: Roster,
    observers: Vec<Box<dyn CirculationObserver>>,
    /// Recent committed events, oldest first, capped at [`EVENT_LOG_CAPACITY`].
    event_log: Vec<LendingEvent>,
    ids: IdGenerator,
}

impl fmt::Debug for LendingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LendingEngine")
            .field("books", &self.catalog.len())
            .field("event_log", &self.event_log)
            .field("observers_count", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl LendingEngine {
    /// Build an engine around loaded state, seeding the id generator with
    /// every id already in use.
    #[must_use]
    pub fn new(catalog: Catalog, roster: Roster) -> Self {
        let mut ids = IdGenerator::default();
        for book in catalog.iter() {
            ids.reserve(book.id.as_str());
        }
        for user in roster.iter() {
            ids.reserve(user.id.as_str());
            for booking in user.account.active().chain(user.account.history()) {
                ids.reserve(booking.id.as_str());
            }
        }
        Self {
            catalog,
            roster,
            observers: Vec::new(),
            event_log: Vec::new(),
            ids,
        }
    }

    /// Register an observer to be notified of committed events.
    pub fn register_observer(&mut self, observer: Box<dyn CirculationObserver>) {
        self.observers.push(observer);
    }

    /// Read access to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read access to the roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Recent committed events, oldest first.
    #[must_use]
    pub fn event_log(&self) -> &[LendingEvent] {
        &self.event_log
    }

    /// Record a committed event and notify observers.
    fn emit(&mut self, event: LendingEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
        self.event_log.push(event);
        if self.event_log.len() > EVENT_LOG_CAPACITY {
            self.event_log.remove(0);
        }
    }

    /// Check a login credential by plain equality.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] for an unknown id,
    /// [`CirculationError::InvalidCredential`] on mismatch.
    pub fn authenticate(&self, user_id: &UserId, credential: &str) -> CirculationResult<Role> {
        let user = self.roster.get(user_id)?;
        if user.verify_credential(credential) {
            Ok(user.role)
        } else {
            Err(CirculationError::InvalidCredential(user_id.clone()))
        }
    }

    /// Borrow a book as of `date`.
    ///
    /// An available book is handed over immediately. A borrowed book mutates
    /// nothing and reports [`Outcome::ReservationOffered`]; the caller may
    /// follow up with [`Self::reserve`].
    ///
    /// # Errors
    ///
    /// [`CirculationError::Ineligible`] if the role rule rejects,
    /// [`CirculationError::BookNotFound`] / [`CirculationError::UserNotFound`]
    /// for unknown ids.
    pub fn borrow(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
        date: Date,
    ) -> CirculationResult<Outcome> {
        let user = self.roster.get(user_id)?;
        eligibility::check_borrow(user, date).into_result()?;
        let book = self.catalog.get(book_id)?;
        match book.availability {
            Availability::Borrowed => Ok(Outcome::ReservationOffered {
                book_id: book_id.clone(),
            }),
            Availability::Available => {
                let snapshot = book.snapshot();
                let booking_id = BookingId::new(self.ids.mint());
                let booking =
                    Booking::direct_borrow(booking_id.clone(), book_id.clone(), snapshot, date);
                self.catalog.get_mut(book_id)?.availability = Availability::Borrowed;
                self.roster.get_mut(user_id)?.account.open(booking);
                self.emit(LendingEvent::Borrowed {
                    user: user_id.clone(),
                    book: book_id.clone(),
                    date,
                });
                Ok(Outcome::Borrowed { booking_id })
            }
        }
    }

    /// Join the reservation queue of a borrowed book.
    ///
    /// # Errors
    ///
    /// [`CirculationError::Ineligible`] if the role rule rejects,
    /// [`CirculationError::AlreadyQueued`] if the caller already has an
    /// active booking for this book, and
    /// [`CirculationError::InvalidTransition`] if the book is not borrowed
    /// (an available book is borrowed, not reserved).
    pub fn reserve(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
        date: Date,
    ) -> CirculationResult<Outcome> {
        let user = self.roster.get(user_id)?;
        eligibility::check_borrow(user, date).into_result()?;
        if user.account.has_active_for(book_id) {
            return Err(CirculationError::AlreadyQueued(book_id.clone()));
        }
        let book = self.catalog.get(book_id)?;
        if book.availability != Availability::Borrowed {
            return Err(CirculationError::InvalidTransition {
                book: book_id.clone(),
                availability: book.availability,
            });
        }
        let snapshot = book.snapshot();
        let booking_id = BookingId::new(self.ids.mint());
        self.catalog.enqueue_reservation(book_id, user_id.clone())?;
        let booking = Booking::reserved(booking_id.clone(), book_id.clone(), snapshot, date);
        self.roster.get_mut(user_id)?.account.open(booking);
        self.emit(LendingEvent::Reserved {
            user: user_id.clone(),
            book: book_id.clone(),
            date,
        });
        Ok(Outcome::Reserved { booking_id })
    }

    /// Cancel the caller's reservation for a book.
    ///
    /// Idempotent: a second call reports [`Outcome::NoReservation`] and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] / [`CirculationError::BookNotFound`]
    /// for unknown ids.
    pub fn cancel_reservation(
        &mut self,
        user_id: &UserId,
        book_id: &BookId,
    ) -> CirculationResult<Outcome> {
        self.roster.get(user_id)?;
        let book = self.catalog.get_mut(book_id)?;
        if let Some(pos) = book.reservation_queue.iter().position(|u| u == user_id) {
            book.reservation_queue.remove(pos);
        }
        let account = &mut self.roster.get_mut(user_id)?.account;
        let reservation_id = account.find_reservation(book_id).map(|b| b.id.clone());
        match reservation_id {
            Some(id) => {
                account.close(&id);
                self.emit(LendingEvent::ReservationCancelled {
                    user: user_id.clone(),
                    book: book_id.clone(),
                });
                Ok(Outcome::ReservationCancelled {
                    book_id: book_id.clone(),
                })
            }
            None => Ok(Outcome::NoReservation {
                book_id: book_id.clone(),
            }),
        }
    }

    /// Return an active booking as of `date`.
    ///
    /// A pending reservation is treated exactly like a cancellation (there is
    /// nothing to physically return). A direct borrow first settles any fine:
    /// when one is due and `payment` is [`PaymentDecision::Declined`], the
    /// return aborts with [`Outcome::FineDue`] and no state change. A
    /// completed return closes the booking and runs the reservation cascade.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookingNotFound`] for an unknown booking,
    /// [`CirculationError::NotOwned`] when it belongs to someone else, and
    /// [`CirculationError::AlreadyClosed`] when it is already in history.
    pub fn return_book(
        &mut self,
        user_id: &UserId,
        booking_id: &BookingId,
        date: Date,
        payment: PaymentDecision,
    ) -> CirculationResult<Outcome> {
        let user = self.roster.get(user_id)?;
        let role = user.role;
        let Some(booking) = user.account.get_active(booking_id).cloned() else {
            if user.account.in_history(booking_id) {
                return Err(CirculationError::AlreadyClosed(booking_id.clone()));
            }
            let owned_elsewhere = self.roster.iter().any(|other| {
                other.account.get_active(booking_id).is_some()
                    || other.account.in_history(booking_id)
            });
            if owned_elsewhere {
                return Err(CirculationError::NotOwned(booking_id.clone()));
            }
            return Err(CirculationError::BookingNotFound(booking_id.clone()));
        };

        if booking.kind == BookingKind::Reserved {
            return self.cancel_reservation(user_id, &booking.book_id);
        }

        // Faculty are never charged; everyone else settles up before the
        // booking closes.
        let fine = if role == Role::Faculty {
            0
        } else {
            booking.fine_as_of(date)
        };
        if fine > 0 && payment == PaymentDecision::Declined {
            return Ok(Outcome::FineDue { amount: fine });
        }

        // Resolve the book before mutating anything so a failure cannot leave
        // a half-committed return behind.
        self.catalog.get(&booking.book_id)?;

        let account = &mut self.roster.get_mut(user_id)?.account;
        if let Some(active) = account.get_active_mut(booking_id) {
            active.return_date = Some(date);
            active.fine = fine;
        }
        account.close(booking_id);
        self.emit(LendingEvent::Returned {
            user: user_id.clone(),
            book: booking.book_id.clone(),
            date,
            fine,
        });

        let reassigned_to = self.run_cascade(&booking.book_id, date)?;
        Ok(Outcome::Returned {
            fine,
            reassigned_to,
        })
    }

    /// Offer a vacated book to queued users in FIFO order until one is
    /// eligible or the queue is exhausted.
    ///
    /// Entries that cannot be resolved — a user deleted since reserving, or a
    /// queue entry with no matching reservation — are recoverable cleanup:
    /// they are discarded with a log line and the cascade continues. When the
    /// queue empties without a taker the book goes back on the shelf.
    fn run_cascade(&mut self, book_id: &BookId, date: Date) -> CirculationResult<Option<UserId>> {
        while let Some(next) = self.catalog.dequeue_next(book_id)? {
            let Some(user) = self.roster.lookup(&next) else {
                tracing::warn!(user = %next, book = %book_id, "dropping stale reservation queue entry");
                self.emit(LendingEvent::ReservationDiscarded {
                    user: next,
                    book: book_id.clone(),
                });
                continue;
            };
            let verdict = eligibility::check_borrow(user, date);
            let Some(reservation_id) = user.account.find_reservation(book_id).map(|b| b.id.clone())
            else {
                tracing::warn!(user = %next, book = %book_id, "queued user has no matching reservation");
                self.emit(LendingEvent::ReservationDiscarded {
                    user: next,
                    book: book_id.clone(),
                });
                continue;
            };
            match verdict {
                Eligibility::Eligible => {
                    let account = &mut self.roster.get_mut(&next)?.account;
                    if let Some(reservation) = account.get_active_mut(&reservation_id) {
                        reservation.promote(date);
                    }
                    self.catalog.get_mut(book_id)?.availability = Availability::Borrowed;
                    self.emit(LendingEvent::ReservationPromoted {
                        user: next.clone(),
                        book: book_id.clone(),
                        date,
                    });
                    return Ok(Some(next));
                }
                Eligibility::Ineligible(reason) => {
                    tracing::info!(user = %next, book = %book_id, %reason, "queued user ineligible; discarding reservation");
                    let account = &mut self.roster.get_mut(&next)?.account;
                    account.close(&reservation_id);
                    self.emit(LendingEvent::ReservationDiscarded {
                        user: next,
                        book: book_id.clone(),
                    });
                }
            }
        }
        self.catalog.get_mut(book_id)?.availability = Availability::Available;
        Ok(None)
    }

    /// Active bookings for display, fines recomputed against `date`.
    ///
    /// Returns copies; stored state is untouched. Reservations always show
    /// fine 0, faculty always show fine 0.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] for an unknown id.
    pub fn current_bookings(&self, user_id: &UserId, date: Date) -> CirculationResult<Vec<Booking>> {
        let user = self.roster.get(user_id)?;
        let mut rows: Vec<Booking> = user.account.active().cloned().collect();
        for row in &mut rows {
            row.fine = if user.role == Role::Faculty {
                0
            } else {
                row.fine_as_of(date)
            };
        }
        Ok(rows)
    }

    /// Closed bookings, as recorded at close time.
    ///
    /// # Errors
    ///
    /// [`CirculationError::UserNotFound`] for an unknown id.
    pub fn booking_history(&self, user_id: &UserId) -> CirculationResult<Vec<Booking>> {
        Ok(self.roster.get(user_id)?.account.history().cloned().collect())
    }

    /// Register a new user. Librarian-only.
    ///
    /// # Errors
    ///
    /// [`CirculationError::Forbidden`] unless `actor` is a librarian.
    pub fn add_user(
        &mut self,
        actor: &UserId,
        name: impl Into<String>,
        credential: impl Into<String>,
        role: Role,
    ) -> CirculationResult<Outcome> {
        self.require_librarian(actor)?;
        let user_id = UserId::new(self.ids.mint());
        self.roster
            .add_user(User::new(user_id.clone(), name, credential, role));
        self.emit(LendingEvent::UserAdded {
            user: user_id.clone(),
        });
        Ok(Outcome::UserAdded { user_id })
    }

    /// Unregister a user. Librarian-only; refused while the user has active
    /// bookings, and librarians themselves cannot be removed.
    ///
    /// # Errors
    ///
    /// [`CirculationError::Forbidden`], [`CirculationError::UserInUse`], or
    /// [`CirculationError::UserNotFound`].
    pub fn remove_user(&mut self, actor: &UserId, user_id: &UserId) -> CirculationResult<Outcome> {
        self.require_librarian(actor)?;
        let target = self.roster.get(user_id)?;
        if target.role == Role::Librarian {
            return Err(CirculationError::Forbidden);
        }
        if target.account.active_count() > 0 {
            return Err(CirculationError::UserInUse(user_id.clone()));
        }
        self.roster.remove_user(user_id);
        self.emit(LendingEvent::UserRemoved {
            user: user_id.clone(),
        });
        Ok(Outcome::UserRemoved {
            user_id: user_id.clone(),
        })
    }

    /// Add a book to the catalog. Librarian-only.
    ///
    /// # Errors
    ///
    /// [`CirculationError::Forbidden`] unless `actor` is a librarian.
    pub fn add_book(
        &mut self,
        actor: &UserId,
        title: impl Into<String>,
        author: impl Into<String>,
        publisher: impl Into<String>,
        isbn: impl Into<String>,
        year: u16,
    ) -> CirculationResult<Outcome> {
        self.require_librarian(actor)?;
        let book_id = BookId::new(self.ids.mint());
        self.catalog
            .add_book(Book::new(book_id.clone(), title, author, publisher, isbn, year));
        self.emit(LendingEvent::BookAdded {
            book: book_id.clone(),
        });
        Ok(Outcome::BookAdded { book_id })
    }

    /// Remove a book from the catalog. Librarian-only; refused while the book
    /// is borrowed or has queued reservations.
    ///
    /// # Errors
    ///
    /// [`CirculationError::Forbidden`], [`CirculationError::BookInUse`], or
    /// [`CirculationError::BookNotFound`].
    pub fn remove_book(&mut self, actor: &UserId, book_id: &BookId) -> CirculationResult<Outcome> {
        self.require_librarian(actor)?;
        self.catalog.remove_book(book_id)?;
        self.emit(LendingEvent::BookRemoved {
            book: book_id.clone(),
        });
        Ok(Outcome::BookRemoved {
            book_id: book_id.clone(),
        })
    }

    fn require_librarian(&self, actor: &UserId) -> CirculationResult<()> {
        if self.roster.get(actor)?.role == Role::Librarian {
            Ok(())
        } else {
            Err(CirculationError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests;
