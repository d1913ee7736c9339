use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CirculationError, CirculationResult};

/// A whole-day calendar date in the fixed-width `DDMMYYYY` wire form.
///
/// No calendar-validity checking is performed: day 31 of a 30-day month or
/// month 13 are accepted and normalized arithmetically when day differences
/// are computed, matching the flat-file records this replaces. The caller
/// supplies every reference date; the crate holds no wall-clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    /// Day-of-month digits as written, 0-99.
    day: u8,
    /// Month digits as written, 0-99.
    month: u8,
    /// Four-digit year.
    year: u16,
}

impl Date {
    /// Parse the fixed-width `DDMMYYYY` form.
    ///
    /// # Errors
    ///
    /// Returns [`CirculationError::InvalidFormat`] unless the input is exactly
    /// eight ASCII digits.
    pub fn parse(raw: &str) -> CirculationResult<Self> {
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CirculationError::InvalidFormat(raw.to_string()));
        }
        let field = |range: std::ops::Range<usize>| {
            raw.get(range)
                .ok_or_else(|| CirculationError::InvalidFormat(raw.to_string()))
        };
        let day = field(0..2)?
            .parse()
            .map_err(|_| CirculationError::InvalidFormat(raw.to_string()))?;
        let month = field(2..4)?
            .parse()
            .map_err(|_| CirculationError::InvalidFormat(raw.to_string()))?;
        let year = field(4..8)?
            .parse()
            .map_err(|_| CirculationError::InvalidFormat(raw.to_string()))?;
        Ok(Self { day, month, year })
    }

    /// Serial day number in the proleptic Gregorian calendar.
    ///
    /// Out-of-range months roll into adjacent years and out-of-range days fall
    /// out of the day-of-year arithmetic, the same normalization `mktime`
    /// applied in the system this replaces.
    fn serial_day(self) -> i64 {
        let months = i64::from(self.year) * 12 + i64::from(self.month) - 1;
        let (y, m) = (months.div_euclid(12), months.rem_euclid(12) + 1);
        let d = i64::from(self.day);

        // Days-from-civil, counting from 0000-03-01 era boundaries.
        let y = if m <= 2 { y - 1 } else { y };
        let era = y.div_euclid(400);
        let yoe = y - era * 400;
        let doy = (153 * ((m + 9) % 12) + 2) / 5 + d - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        era * 146_097 + doe
    }

    /// Non-negative count of whole days separating two dates, in either order.
    #[must_use]
    pub fn days_between(a: Self, b: Self) -> u32 {
        // Four-digit years keep the difference well inside u32 range.
        u32::try_from(a.serial_day().abs_diff(b.serial_day())).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:04}", self.day, self.month, self.year)
    }
}

impl Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn date(raw: &str) -> Date {
        Date::parse(raw).unwrap()
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(matches!(
            Date::parse("1012024"),
            Err(CirculationError::InvalidFormat(_))
        ));
        assert!(matches!(
            Date::parse("010120245"),
            Err(CirculationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn parse_rejects_non_digits() {
        assert!(matches!(
            Date::parse("01a12024"),
            Err(CirculationError::InvalidFormat(_))
        ));
        assert!(matches!(
            Date::parse("01-12024"),
            Err(CirculationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn round_trips_through_display() {
        assert_eq!(date("05032021").to_string(), "05032021");
    }

    #[test]
    fn days_between_is_symmetric_and_zero_on_equal() {
        let a = date("01012024");
        let b = date("15022024");
        assert_eq!(Date::days_between(a, b), Date::days_between(b, a));
        assert_eq!(Date::days_between(a, a), 0);
        assert_eq!(Date::days_between(a, b), 45);
    }

    #[test]
    fn counts_across_leap_day() {
        assert_eq!(Date::days_between(date("28022024"), date("01032024")), 2);
        assert_eq!(Date::days_between(date("28022023"), date("01032023")), 1);
    }

    #[test]
    fn overflowing_day_is_normalized_not_rejected() {
        // Day 31 of a 30-day month lands on the first of the next month.
        assert_eq!(Date::days_between(date("31042024"), date("01052024")), 0);
    }

    #[test]
    fn overflowing_month_rolls_into_next_year() {
        assert_eq!(Date::days_between(date("01132024"), date("01012025")), 0);
    }
}
