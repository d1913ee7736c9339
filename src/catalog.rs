use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    booking::BookSnapshot,
    error::{CirculationError, CirculationResult},
    ids::{BookId, UserId},
};

/// Whether a book can be handed out right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Availability {
    /// On the shelf, free to borrow.
    #[default]
    Available,
    /// Held by exactly one active direct-borrow booking.
    Borrowed,
}

impl Availability {
    /// Patron-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Borrowed => "Borrowed",
        }
    }
}

/// A physical copy tracked by the circulation desk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub year: u16,
    pub availability: Availability,
    /// Patrons waiting for the book, front first. The lending engine keeps
    /// the current holder out of this queue.
    pub reservation_queue: VecDeque<UserId>,
}

impl Book {
    /// A new book, available with an empty reservation queue.
    #[must_use]
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        publisher: impl Into<String>,
        isbn: impl Into<String>,
        year: u16,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            publisher: publisher.into(),
            isbn: isbn.into(),
            year,
            availability: Availability::Available,
            reservation_queue: VecDeque::new(),
        }
    }

    /// Descriptive fields frozen for a new booking.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            title: self.title.clone(),
            author: self.author.clone(),
            publisher: self.publisher.clone(),
            isbn: self.isbn.clone(),
            year: self.year,
        }
    }
}

/// The full set of books, keyed by id.
#[derive(Debug, Default)]
pub struct Catalog {
    books: BTreeMap<BookId, Book>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a catalog from persisted books.
    #[must_use]
    pub fn from_books(books: Vec<Book>) -> Self {
        Self {
            books: books.into_iter().map(|b| (b.id.clone(), b)).collect(),
        }
    }

    /// Insert a book. Ids are generated unique, so this never displaces an
    /// existing entry in normal operation.
    pub fn add_book(&mut self, book: Book) {
        self.books.insert(book.id.clone(), book);
    }

    /// Remove a book that is neither borrowed nor reserved.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookNotFound`] for an unknown id;
    /// [`CirculationError::BookInUse`] if the book is borrowed or its
    /// reservation queue is non-empty.
    pub fn remove_book(&mut self, id: &BookId) -> CirculationResult<Book> {
        let book = self
            .books
            .get(id)
            .ok_or_else(|| CirculationError::BookNotFound(id.clone()))?;
        if book.availability == Availability::Borrowed || !book.reservation_queue.is_empty() {
            return Err(CirculationError::BookInUse(id.clone()));
        }
        self.books
            .remove(id)
            .ok_or_else(|| CirculationError::BookNotFound(id.clone()))
    }

    /// Look up a book.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookNotFound`] for an unknown id.
    pub fn get(&self, id: &BookId) -> CirculationResult<&Book> {
        self.books
            .get(id)
            .ok_or_else(|| CirculationError::BookNotFound(id.clone()))
    }

    /// Look up a book for mutation.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookNotFound`] for an unknown id.
    pub fn get_mut(&mut self, id: &BookId) -> CirculationResult<&mut Book> {
        self.books
            .get_mut(id)
            .ok_or_else(|| CirculationError::BookNotFound(id.clone()))
    }

    /// Append a user to the book's reservation queue.
    ///
    /// No de-duplication happens here; the lending engine guarantees a user
    /// is never enqueued twice for the same book.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookNotFound`] for an unknown id.
    pub fn enqueue_reservation(&mut self, book_id: &BookId, user: UserId) -> CirculationResult<()> {
        self.get_mut(book_id)?.reservation_queue.push_back(user);
        Ok(())
    }

    /// Pop the front of the book's reservation queue, if any.
    ///
    /// # Errors
    ///
    /// [`CirculationError::BookNotFound`] for an unknown id.
    pub fn dequeue_next(&mut self, book_id: &BookId) -> CirculationResult<Option<UserId>> {
        Ok(self.get_mut(book_id)?.reservation_queue.pop_front())
    }

    /// All books in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Number of books in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the catalog holds no books.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
