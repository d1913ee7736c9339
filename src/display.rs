use crate::{
    booking::Booking,
    catalog::Catalog,
    date::Date,
    events::LendingEvent,
    roster::Roster,
};

/// Console rendering for catalog, account, and event listings.
#[derive(Debug)]
pub struct Report;

impl Report {
    /// Markdown-style table of every book in the catalog.
    #[must_use]
    pub fn book_table(catalog: &Catalog) -> String {
        if catalog.is_empty() {
            return "No books in the catalog.".to_string();
        }
        let mut table = String::from("| ID | Title | Author | Publisher | ISBN | Year | Status | Queue |\n");
        table.push_str("|----|-------|--------|-----------|------|------|--------|-------|\n");
        for book in catalog.iter() {
            table.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                book.id,
                book.title,
                book.author,
                book.publisher,
                book.isbn,
                book.year,
                book.availability.label(),
                book.reservation_queue.len(),
            ));
        }
        table
    }

    /// Numbered table of bookings, used both for listings and for the
    /// pick-one-to-return menu. Row numbers start at 1.
    #[must_use]
    pub fn booking_table(bookings: &[Booking]) -> String {
        if bookings.is_empty() {
            return "No bookings to show.".to_string();
        }
        let mut table =
            String::from("| # | Booking ID | Title | Kind | Booked | Borrowed | Returned | Fine |\n");
        table.push_str("|---|-----------|-------|------|--------|----------|----------|------|\n");
        for (i, booking) in bookings.iter().enumerate() {
            table.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                i.saturating_add(1),
                booking.id,
                booking.book.title,
                booking.kind.label(),
                booking.booking_date,
                Self::format_date(booking.borrow_date),
                Self::format_date(booking.return_date),
                booking.fine,
            ));
        }
        table
    }

    /// Markdown-style table of every registered user.
    #[must_use]
    pub fn user_table(roster: &Roster) -> String {
        let mut rows = roster.iter().peekable();
        if rows.peek().is_none() {
            return "No registered users.".to_string();
        }
        let mut table = String::from("| ID | Name | Role | Active bookings |\n");
        table.push_str("|----|------|------|-----------------|\n");
        for user in rows {
            table.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                user.id,
                user.name,
                user.role.label(),
                user.account.active_count(),
            ));
        }
        table
    }

    /// Numbered listing of recent committed events, oldest first.
    #[must_use]
    pub fn event_history(events: &[LendingEvent]) -> String {
        if events.is_empty() {
            return "No events recorded yet.".to_string();
        }
        let mut out = String::new();
        for (i, event) in events.iter().enumerate() {
            out.push_str(&format!("{}: {:?}\n", i.saturating_add(1), event));
        }
        out
    }

    fn format_date(date: Option<Date>) -> String {
        date.map_or_else(|| "-".to_string(), |d| d.to_string())
    }
}
