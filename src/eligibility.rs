use crate::{
    booking::BookingKind,
    date::Date,
    error::{CirculationError, CirculationResult},
    roster::{Role, User},
};

/// Maximum simultaneous active bookings for a student.
pub const STUDENT_BOOKING_LIMIT: usize = 3;

/// Maximum simultaneous active bookings for a faculty member.
pub const FACULTY_BOOKING_LIMIT: usize = 5;

/// Days a faculty member may hold a book before further borrowing is blocked.
pub const FACULTY_HOLD_LIMIT_DAYS: u32 = 90;

/// Verdict of a role rule, with a patron-facing reason on rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(String),
}

impl Eligibility {
    /// Whether the rule passed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Convert a rejection into [`CirculationError::Ineligible`].
    ///
    /// # Errors
    ///
    /// Returns the attached reason when the verdict was `Ineligible`.
    pub fn into_result(self) -> CirculationResult<()> {
        match self {
            Self::Eligible => Ok(()),
            Self::Ineligible(reason) => Err(CirculationError::Ineligible(reason)),
        }
    }
}

/// Role-specific borrow gate, evaluated against the caller-supplied reference
/// date. Pure: consults the user's account and mutates nothing.
#[must_use]
pub fn check_borrow(user: &User, reference: Date) -> Eligibility {
    match user.role {
        Role::Student => check_student(user, reference),
        Role::Faculty => check_faculty(user, reference),
        Role::Librarian => {
            Eligibility::Ineligible("librarians manage the catalog and do not borrow".to_string())
        }
    }
}

/// Students are blocked by any outstanding fine or by holding three bookings.
///
/// The fine total is computed from borrow dates; reservations contribute
/// nothing (they have no borrow date) but do count toward the booking limit.
fn check_student(user: &User, reference: Date) -> Eligibility {
    let owed: u32 = user
        .account
        .active()
        .map(|b| b.fine_as_of(reference))
        .sum();
    if owed > 0 {
        return Eligibility::Ineligible(format!(
            "outstanding fines of {owed} must be paid before borrowing"
        ));
    }
    let held = user.account.active_count();
    if held >= STUDENT_BOOKING_LIMIT {
        return Eligibility::Ineligible(format!(
            "already holding {held} bookings; students may hold at most {STUDENT_BOOKING_LIMIT}"
        ));
    }
    Eligibility::Eligible
}

/// Faculty are never fined, but are blocked by holding five bookings or by
/// keeping any book out longer than the hold limit. Exactly at the limit is
/// still eligible.
fn check_faculty(user: &User, reference: Date) -> Eligibility {
    let held = user.account.active_count();
    if held >= FACULTY_BOOKING_LIMIT {
        return Eligibility::Ineligible(format!(
            "already holding {held} bookings; faculty may hold at most {FACULTY_BOOKING_LIMIT}"
        ));
    }
    for booking in user.account.active() {
        if booking.kind != BookingKind::DirectBorrow {
            continue;
        }
        if let Some(borrowed) = booking.borrow_date {
            if Date::days_between(borrowed, reference) > FACULTY_HOLD_LIMIT_DAYS {
                return Eligibility::Ineligible(format!(
                    "a book has been held for more than {FACULTY_HOLD_LIMIT_DAYS} days; \
                     return it before borrowing again"
                ));
            }
        }
    }
    Eligibility::Eligible
}
