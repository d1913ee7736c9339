#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use crate::{
    booking::{Booking, BookingKind},
    catalog::{Availability, Book, Catalog},
    date::Date,
    engine::LendingEngine,
    error::CirculationError,
    ids::{BookId, BookingId, UserId},
    outcome::{Outcome, PaymentDecision},
    roster::{Role, Roster, User},
};

fn date(raw: &str) -> Date {
    Date::parse(raw).unwrap()
}

fn uid(raw: &str) -> UserId {
    UserId::new(raw)
}

fn bid(raw: &str) -> BookId {
    BookId::new(raw)
}

fn book(id: &str, title: &str) -> Book {
    Book::new(BookId::new(id), title, "Frank Herbert", "Ace", "9780441172719", 1965)
}

fn user(id: &str, role: Role) -> User {
    User::new(UserId::new(id), "Test User", "secret", role)
}

fn engine_with(books: Vec<Book>, users: Vec<User>) -> LendingEngine {
    let mut catalog = Catalog::new();
    for b in books {
        catalog.add_book(b);
    }
    let mut roster = Roster::new();
    for u in users {
        roster.add_user(u);
    }
    LendingEngine::new(catalog, roster)
}

/// Run a borrow that is expected to hand the book over, returning the new
/// booking id.
fn must_borrow(engine: &mut LendingEngine, user: &str, book: &str, on: Date) -> BookingId {
    match engine.borrow(&uid(user), &bid(book), on).unwrap() {
        Outcome::Borrowed { booking_id } => booking_id,
        other => panic!("expected a completed borrow, got {other:?}"),
    }
}

#[test]
fn authenticate_checks_credentials() {
    let engine = engine_with(vec![], vec![user("S1", Role::Student)]);
    assert_eq!(engine.authenticate(&uid("S1"), "secret").unwrap(), Role::Student);
    assert!(matches!(
        engine.authenticate(&uid("S1"), "wrong"),
        Err(CirculationError::InvalidCredential(_))
    ));
    assert!(matches!(
        engine.authenticate(&uid("NOBODY"), "secret"),
        Err(CirculationError::UserNotFound(_))
    ));
}

#[test]
fn borrowing_an_available_book_hands_it_over() {
    let mut engine = engine_with(vec![book("B1", "Dune")], vec![user("S1", Role::Student)]);
    let d = date("01012024");

    let booking_id = must_borrow(&mut engine, "S1", "B1", d);

    assert_eq!(
        engine.catalog().get(&bid("B1")).unwrap().availability,
        Availability::Borrowed
    );
    let account = &engine.roster().get(&uid("S1")).unwrap().account;
    let active: Vec<_> = account.active().collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, booking_id);
    assert_eq!(active[0].kind, BookingKind::DirectBorrow);
    assert_eq!(active[0].borrow_date, Some(d));
    assert_eq!(active[0].book.title, "Dune");
}

#[test]
fn borrowing_a_held_book_offers_a_reservation() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    must_borrow(&mut engine, "S1", "B1", d);

    let offered = engine.borrow(&uid("S2"), &bid("B1"), d).unwrap();
    assert_eq!(offered, Outcome::ReservationOffered { book_id: bid("B1") });
    // The offer alone queues nothing.
    assert!(engine.catalog().get(&bid("B1")).unwrap().reservation_queue.is_empty());

    let reserved = engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();
    assert!(matches!(reserved, Outcome::Reserved { .. }));

    let queued: Vec<_> = engine
        .catalog()
        .get(&bid("B1"))
        .unwrap()
        .reservation_queue
        .iter()
        .cloned()
        .collect();
    assert_eq!(queued, vec![uid("S2")]);
    let s2_booking = engine
        .roster()
        .get(&uid("S2"))
        .unwrap()
        .account
        .active()
        .next()
        .unwrap()
        .clone();
    assert_eq!(s2_booking.kind, BookingKind::Reserved);
    assert_eq!(s2_booking.borrow_date, None);
    assert_eq!(s2_booking.return_date, None);
}

#[test]
fn reserving_twice_is_rejected() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    must_borrow(&mut engine, "S1", "B1", d);

    engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();
    assert!(matches!(
        engine.reserve(&uid("S2"), &bid("B1"), d),
        Err(CirculationError::AlreadyQueued(_))
    ));
    // The current holder cannot join the queue either.
    assert!(matches!(
        engine.reserve(&uid("S1"), &bid("B1"), d),
        Err(CirculationError::AlreadyQueued(_))
    ));
}

#[test]
fn reserving_an_available_book_is_rejected() {
    let mut engine = engine_with(vec![book("B1", "Dune")], vec![user("S1", Role::Student)]);
    assert!(matches!(
        engine.reserve(&uid("S1"), &bid("B1"), date("01012024")),
        Err(CirculationError::InvalidTransition { .. })
    ));
}

#[test]
fn student_is_rejected_at_the_booking_limit() {
    let mut engine = engine_with(
        vec![book("B1", "a"), book("B2", "b"), book("B3", "c"), book("B4", "d")],
        vec![user("S1", Role::Student)],
    );
    let d = date("01012024");
    must_borrow(&mut engine, "S1", "B1", d);
    must_borrow(&mut engine, "S1", "B2", d);
    must_borrow(&mut engine, "S1", "B3", d);

    assert!(matches!(
        engine.borrow(&uid("S1"), &bid("B4"), d),
        Err(CirculationError::Ineligible(_))
    ));
}

#[test]
fn student_is_rejected_while_fines_are_outstanding() {
    let mut engine = engine_with(
        vec![book("B1", "a"), book("B2", "b")],
        vec![user("S1", Role::Student)],
    );
    must_borrow(&mut engine, "S1", "B1", date("01012024"));

    // Twenty days in, B1 carries a fine of 50, computed from its borrow date.
    let err = engine.borrow(&uid("S1"), &bid("B2"), date("21012024")).unwrap_err();
    match err {
        CirculationError::Ineligible(reason) => assert!(reason.contains("50")),
        other => panic!("expected an eligibility rejection, got {other:?}"),
    }
    // Inside the grace period the same borrow goes through.
    let outcome = engine.borrow(&uid("S1"), &bid("B2"), date("10012024")).unwrap();
    assert!(matches!(outcome, Outcome::Borrowed { .. }));
}

#[test]
fn faculty_hold_limit_is_exclusive_at_ninety_days() {
    let mut engine = engine_with(
        vec![book("B1", "a"), book("B2", "b"), book("B3", "c")],
        vec![user("F1", Role::Faculty)],
    );
    must_borrow(&mut engine, "F1", "B1", date("01012024"));

    // Exactly 90 days out is still eligible.
    let outcome = engine.borrow(&uid("F1"), &bid("B2"), date("31032024")).unwrap();
    assert!(matches!(outcome, Outcome::Borrowed { .. }));
    // One day later B1 has been out 91 days.
    assert!(matches!(
        engine.borrow(&uid("F1"), &bid("B3"), date("01042024")),
        Err(CirculationError::Ineligible(_))
    ));
}

#[test]
fn faculty_are_never_fined_on_return() {
    let mut engine = engine_with(vec![book("B1", "a")], vec![user("F1", Role::Faculty)]);
    let booking_id = must_borrow(&mut engine, "F1", "B1", date("01012024"));

    let outcome = engine
        .return_book(&uid("F1"), &booking_id, date("11042024"), PaymentDecision::Declined)
        .unwrap();
    assert_eq!(outcome, Outcome::Returned { fine: 0, reassigned_to: None });
}

#[test]
fn librarians_do_not_borrow() {
    let mut engine = engine_with(vec![book("B1", "a")], vec![user("L1", Role::Librarian)]);
    assert!(matches!(
        engine.borrow(&uid("L1"), &bid("B1"), date("01012024")),
        Err(CirculationError::Ineligible(_))
    ));
}

#[test]
fn declined_fine_payment_aborts_the_return() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);
    engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();

    let due = engine
        .return_book(&uid("S1"), &booking_id, date("21012024"), PaymentDecision::Declined)
        .unwrap();
    assert_eq!(due, Outcome::FineDue { amount: 50 });

    // Nothing moved: S1 still holds the book, S2 is still queued.
    let s1 = engine.roster().get(&uid("S1")).unwrap();
    assert_eq!(s1.account.active_count(), 1);
    assert_eq!(s1.account.history().count(), 0);
    let b1 = engine.catalog().get(&bid("B1")).unwrap();
    assert_eq!(b1.availability, Availability::Borrowed);
    assert_eq!(b1.reservation_queue.len(), 1);
}

#[test]
fn confirmed_return_settles_the_fine_and_promotes_the_next_reservation() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);
    engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();

    let d20 = date("21012024");
    let outcome = engine
        .return_book(&uid("S1"), &booking_id, d20, PaymentDecision::Accepted)
        .unwrap();
    assert_eq!(outcome, Outcome::Returned { fine: 50, reassigned_to: Some(uid("S2")) });

    let s1 = engine.roster().get(&uid("S1")).unwrap();
    assert_eq!(s1.account.active_count(), 0);
    let closed = s1.account.history().next().unwrap();
    assert_eq!(closed.fine, 50);
    assert_eq!(closed.return_date, Some(d20));

    let s2_booking = engine
        .roster()
        .get(&uid("S2"))
        .unwrap()
        .account
        .active()
        .next()
        .unwrap()
        .clone();
    assert_eq!(s2_booking.kind, BookingKind::DirectBorrow);
    assert_eq!(s2_booking.borrow_date, Some(d20));
    assert_eq!(s2_booking.fine, 0);

    let b1 = engine.catalog().get(&bid("B1")).unwrap();
    assert_eq!(b1.availability, Availability::Borrowed);
    assert!(b1.reservation_queue.is_empty());
}

#[test]
fn cascade_skips_an_ineligible_user() {
    let mut engine = engine_with(
        vec![book("B1", "Dune"), book("B2", "b"), book("B3", "c")],
        vec![
            user("S1", Role::Student),
            user("S2", Role::Student),
            user("S3", Role::Student),
        ],
    );
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);
    engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();
    engine.reserve(&uid("S3"), &bid("B1"), d).unwrap();
    // Fill S2 up to the student limit so they are ineligible at return time.
    must_borrow(&mut engine, "S2", "B2", d);
    must_borrow(&mut engine, "S2", "B3", d);

    let outcome = engine
        .return_book(&uid("S1"), &booking_id, d, PaymentDecision::Accepted)
        .unwrap();
    assert_eq!(outcome, Outcome::Returned { fine: 0, reassigned_to: Some(uid("S3")) });

    // S2's reservation was discarded into history, never promoted.
    let s2 = engine.roster().get(&uid("S2")).unwrap();
    assert_eq!(s2.account.active_count(), 2);
    assert!(s2
        .account
        .history()
        .any(|b| b.kind == BookingKind::Reserved && b.book_id == bid("B1")));

    let s3_booking = engine
        .roster()
        .get(&uid("S3"))
        .unwrap()
        .account
        .active()
        .next()
        .unwrap()
        .clone();
    assert_eq!(s3_booking.kind, BookingKind::DirectBorrow);
    assert!(engine.catalog().get(&bid("B1")).unwrap().reservation_queue.is_empty());
}

#[test]
fn cascade_drops_stale_queue_entries() {
    // Seed a queue entry for a user that no longer exists, as a corrupt
    // snapshot could.
    let mut b1 = book("B1", "Dune");
    b1.availability = Availability::Borrowed;
    b1.reservation_queue.push_back(uid("GHOST"));
    let snapshot = b1.snapshot();
    let mut s1 = user("S1", Role::Student);
    s1.account.open(Booking::direct_borrow(
        BookingId::new("BK1"),
        bid("B1"),
        snapshot,
        date("01012024"),
    ));

    let mut engine = engine_with(vec![b1], vec![s1, user("S3", Role::Student)]);
    engine.reserve(&uid("S3"), &bid("B1"), date("02012024")).unwrap();

    let outcome = engine
        .return_book(&uid("S1"), &BookingId::new("BK1"), date("05012024"), PaymentDecision::Accepted)
        .unwrap();
    assert_eq!(outcome, Outcome::Returned { fine: 0, reassigned_to: Some(uid("S3")) });
}

#[test]
fn cascade_with_empty_queue_frees_the_book() {
    let mut engine = engine_with(vec![book("B1", "Dune")], vec![user("S1", Role::Student)]);
    let booking_id = must_borrow(&mut engine, "S1", "B1", date("01012024"));

    let outcome = engine
        .return_book(&uid("S1"), &booking_id, date("05012024"), PaymentDecision::Accepted)
        .unwrap();
    assert_eq!(outcome, Outcome::Returned { fine: 0, reassigned_to: None });
    assert_eq!(
        engine.catalog().get(&bid("B1")).unwrap().availability,
        Availability::Available
    );
}

#[test]
fn cancelling_a_reservation_is_idempotent() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    must_borrow(&mut engine, "S1", "B1", d);
    engine.reserve(&uid("S2"), &bid("B1"), d).unwrap();

    let first = engine.cancel_reservation(&uid("S2"), &bid("B1")).unwrap();
    assert_eq!(first, Outcome::ReservationCancelled { book_id: bid("B1") });
    assert!(engine.catalog().get(&bid("B1")).unwrap().reservation_queue.is_empty());
    let s2 = engine.roster().get(&uid("S2")).unwrap();
    assert_eq!(s2.account.active_count(), 0);
    assert_eq!(s2.account.history().count(), 1);

    // The second cancel reports a no-op and changes nothing.
    let second = engine.cancel_reservation(&uid("S2"), &bid("B1")).unwrap();
    assert_eq!(second, Outcome::NoReservation { book_id: bid("B1") });
    let s2 = engine.roster().get(&uid("S2")).unwrap();
    assert_eq!(s2.account.active_count(), 0);
    assert_eq!(s2.account.history().count(), 1);
}

#[test]
fn returning_a_reservation_cancels_it() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    must_borrow(&mut engine, "S1", "B1", d);
    let reservation_id = match engine.reserve(&uid("S2"), &bid("B1"), d).unwrap() {
        Outcome::Reserved { booking_id } => booking_id,
        other => panic!("expected a reservation, got {other:?}"),
    };

    let outcome = engine
        .return_book(&uid("S2"), &reservation_id, d, PaymentDecision::Accepted)
        .unwrap();
    assert_eq!(outcome, Outcome::ReservationCancelled { book_id: bid("B1") });
}

#[test]
fn return_rejects_foreign_unknown_and_closed_bookings() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("S1", Role::Student), user("S2", Role::Student)],
    );
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);

    assert!(matches!(
        engine.return_book(&uid("S2"), &booking_id, d, PaymentDecision::Accepted),
        Err(CirculationError::NotOwned(_))
    ));
    assert!(matches!(
        engine.return_book(&uid("S1"), &BookingId::new("MISSING"), d, PaymentDecision::Accepted),
        Err(CirculationError::BookingNotFound(_))
    ));

    engine
        .return_book(&uid("S1"), &booking_id, d, PaymentDecision::Accepted)
        .unwrap();
    assert!(matches!(
        engine.return_book(&uid("S1"), &booking_id, d, PaymentDecision::Accepted),
        Err(CirculationError::AlreadyClosed(_))
    ));
}

#[test]
fn current_bookings_recompute_fines_without_mutating() {
    let mut engine = engine_with(vec![book("B1", "Dune")], vec![user("S1", Role::Student)]);
    must_borrow(&mut engine, "S1", "B1", date("01012024"));

    let rows = engine.current_bookings(&uid("S1"), date("21012024")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fine, 50);
    // The stored booking still carries the fine recorded at creation.
    let stored = engine
        .roster()
        .get(&uid("S1"))
        .unwrap()
        .account
        .active()
        .next()
        .unwrap()
        .fine;
    assert_eq!(stored, 0);
}

#[test]
fn book_removal_is_blocked_while_in_use() {
    let mut queued = book("B2", "queued");
    queued.reservation_queue.push_back(uid("S1"));
    let mut engine = engine_with(
        vec![book("B1", "Dune"), queued, book("B3", "free")],
        vec![user("L1", Role::Librarian), user("S1", Role::Student)],
    );
    must_borrow(&mut engine, "S1", "B1", date("01012024"));

    assert!(matches!(
        engine.remove_book(&uid("L1"), &bid("B1")),
        Err(CirculationError::BookInUse(_))
    ));
    assert!(matches!(
        engine.remove_book(&uid("L1"), &bid("B2")),
        Err(CirculationError::BookInUse(_))
    ));
    let outcome = engine.remove_book(&uid("L1"), &bid("B3")).unwrap();
    assert_eq!(outcome, Outcome::BookRemoved { book_id: bid("B3") });
    assert!(matches!(
        engine.catalog().get(&bid("B3")),
        Err(CirculationError::BookNotFound(_))
    ));
}

#[test]
fn user_removal_is_blocked_while_bookings_are_active() {
    let mut engine = engine_with(
        vec![book("B1", "Dune")],
        vec![user("L1", Role::Librarian), user("S1", Role::Student)],
    );
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);

    assert!(matches!(
        engine.remove_user(&uid("L1"), &uid("S1")),
        Err(CirculationError::UserInUse(_))
    ));

    engine
        .return_book(&uid("S1"), &booking_id, d, PaymentDecision::Accepted)
        .unwrap();
    let outcome = engine.remove_user(&uid("L1"), &uid("S1")).unwrap();
    assert_eq!(outcome, Outcome::UserRemoved { user_id: uid("S1") });
}

#[test]
fn administrative_operations_are_librarian_only() {
    let mut engine = engine_with(
        vec![],
        vec![user("L1", Role::Librarian), user("S1", Role::Student)],
    );

    assert!(matches!(
        engine.add_book(&uid("S1"), "t", "a", "p", "i", 2000),
        Err(CirculationError::Forbidden)
    ));
    assert!(matches!(
        engine.add_user(&uid("S1"), "n", "c", Role::Student),
        Err(CirculationError::Forbidden)
    ));
    // Librarians cannot remove other librarians.
    assert!(matches!(
        engine.remove_user(&uid("L1"), &uid("L1")),
        Err(CirculationError::Forbidden)
    ));

    let added = engine.add_user(&uid("L1"), "New Student", "pw", Role::Student).unwrap();
    let Outcome::UserAdded { user_id } = added else {
        panic!("expected a new user");
    };
    assert_eq!(engine.roster().get(&user_id).unwrap().role, Role::Student);
}

#[test]
fn committed_operations_are_recorded_in_the_event_log() {
    let mut engine = engine_with(vec![book("B1", "Dune")], vec![user("S1", Role::Student)]);
    let d = date("01012024");
    let booking_id = must_borrow(&mut engine, "S1", "B1", d);
    engine
        .return_book(&uid("S1"), &booking_id, d, PaymentDecision::Accepted)
        .unwrap();

    let log = engine.event_log();
    assert_eq!(log.len(), 2);
    assert!(matches!(log[0], crate::events::LendingEvent::Borrowed { .. }));
    assert!(matches!(log[1], crate::events::LendingEvent::Returned { fine: 0, .. }));
}
