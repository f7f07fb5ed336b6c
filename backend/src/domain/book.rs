//! The `Book` entity and its identifier newtype.

use std::fmt;

use crate::domain::author::AuthorId;
use crate::domain::entity::Entity;
use crate::domain::error::{DomainResult, Error};

/// Store-assigned book identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookId(i64);

impl BookId {
    /// Wrap a raw identifier, e.g. one received on the wire.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value for wire representations and SQL binding.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A book record holding the foreign reference to its author.
///
/// ## Invariants
/// - `title` must be non-blank once trimmed.
/// - `author_id` must resolve to an existing author at commit time; the
///   store boundary enforces this and surfaces a conflict otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    /// Store-assigned identifier, absent before the first commit.
    pub id: Option<BookId>,
    /// Title; required.
    pub title: String,
    /// Optional ISBN string; no format check beyond non-emptiness is
    /// applied here.
    pub isbn: Option<String>,
    /// Optional back-cover summary.
    pub summary: Option<String>,
    /// Optional publication year.
    pub year: Option<i32>,
    /// Optional list price.
    pub price: Option<f64>,
    /// Foreign reference to the owning author.
    pub author_id: AuthorId,
}

impl Book {
    /// Construct an unsaved book record referencing `author_id`.
    #[must_use]
    pub fn new(title: impl Into<String>, author_id: AuthorId) -> Self {
        Self {
            id: None,
            title: title.into(),
            isbn: None,
            summary: None,
            year: None,
            price: None,
            author_id,
        }
    }
}

impl Entity for Book {
    type Key = BookId;

    const NAME: &'static str = "book";

    fn key(&self) -> Option<BookId> {
        self.id
    }

    fn with_key(mut self, key: BookId) -> Self {
        self.id = Some(key);
        self
    }

    fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("book title must not be blank"));
        }
        if let Some(isbn) = &self.isbn {
            if isbn.trim().is_empty() {
                return Err(Error::validation("book isbn must not be blank when set"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_title_fails_validation(#[case] title: &str) {
        let book = Book::new(title, AuthorId::new(1));
        let err = book.validate().expect_err("blank title must fail");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn blank_isbn_fails_validation_when_present() {
        let mut book = Book::new("Emma", AuthorId::new(1));
        book.isbn = Some("  ".into());
        assert!(book.validate().is_err());
    }
}
