use crate::date::Date;

/// Days a book may be held before late fees start accruing.
pub const GRACE_PERIOD_DAYS: u32 = 15;

/// Fee per day past the grace period, in whole currency units.
pub const DAILY_RATE: u32 = 10;

/// Late fee owed for a book borrowed on `borrowed`, as of `reference`.
///
/// Zero within the grace period. Call sites recompute this on every status
/// display and on return instead of caching it, so the amount always reflects
/// the reference date supplied by the caller.
#[must_use]
pub fn fine_due(borrowed: Date, reference: Date) -> u32 {
    Date::days_between(borrowed, reference)
        .saturating_sub(GRACE_PERIOD_DAYS)
        .saturating_mul(DAILY_RATE)
}
