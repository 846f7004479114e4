//! Book model, input validation and public projection

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors};

use crate::error::EXISTS_RULE;

/// Longest accepted value for the text attributes
pub const MAX_TEXT_LENGTH: usize = 255;

/// Largest price the `NUMERIC(10, 2)` column can hold
const MAX_PRICE: &str = "99999999.99";

/// Order in which failed fields are reported: the route book, then the attributes
pub const ERROR_FIELD_ORDER: &[&str] = &[
    "book",
    "title",
    "publisher",
    "author",
    "genre",
    "publication_date",
    "word_count",
    "price",
];

/// Book record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publisher: String,
    pub author: String,
    pub genre: String,
    pub publication_date: NaiveDate,
    pub word_count: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated attributes of a book to create
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub publisher: String,
    pub author: String,
    pub genre: String,
    pub publication_date: NaiveDate,
    pub word_count: i64,
    pub price: Decimal,
}

/// Validated partial update; `None` leaves the attribute untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub word_count: Option<i64>,
    pub price: Option<Decimal>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply supplied attributes to a stored book
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref publisher) = self.publisher {
            book.publisher = publisher.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref genre) = self.genre {
            book.genre = genre.clone();
        }
        if let Some(date) = self.publication_date {
            book.publication_date = date;
        }
        if let Some(word_count) = self.word_count {
            book.word_count = word_count;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
    }
}

/// Raw request attributes, as sent in a JSON or form body.
///
/// Values are kept untyped so that every malformed field is reported at once
/// instead of failing on the first one that does not deserialize.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BookForm {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "Sample Book")]
    pub title: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "Publisher Name")]
    pub publisher: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "Author Name")]
    pub author: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "Fiction")]
    pub genre: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date, example = "2022-01-01")]
    pub publication_date: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 50000)]
    pub word_count: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>, example = 25.99)]
    pub price: Option<Value>,
}

impl BookForm {
    /// Validate a create request: every attribute is required
    pub fn into_new_book(self) -> Result<NewBook, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mode = Presence::Required;

        let title = text(&mut errors, "title", self.title, mode);
        let publisher = text(&mut errors, "publisher", self.publisher, mode);
        let author = text(&mut errors, "author", self.author, mode);
        let genre = text(&mut errors, "genre", self.genre, mode);
        let publication_date = date(&mut errors, "publication_date", self.publication_date, mode);
        let word_count = integer(&mut errors, "word_count", self.word_count, mode);
        let price = price(&mut errors, "price", self.price, mode);

        match (title, publisher, author, genre, publication_date, word_count, price) {
            (
                Some(title),
                Some(publisher),
                Some(author),
                Some(genre),
                Some(publication_date),
                Some(word_count),
                Some(price),
            ) if errors.is_empty() => Ok(NewBook {
                title,
                publisher,
                author,
                genre,
                publication_date,
                word_count,
                price,
            }),
            _ => Err(errors),
        }
    }

    /// Validate an update request: absent or null attributes are left alone,
    /// supplied ones must satisfy the same rules as on create
    pub fn into_changes(self) -> Result<BookChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mode = Presence::Optional;

        let changes = BookChanges {
            title: text(&mut errors, "title", self.title, mode),
            publisher: text(&mut errors, "publisher", self.publisher, mode),
            author: text(&mut errors, "author", self.author, mode),
            genre: text(&mut errors, "genre", self.genre, mode),
            publication_date: date(&mut errors, "publication_date", self.publication_date, mode),
            word_count: integer(&mut errors, "word_count", self.word_count, mode),
            price: price(&mut errors, "price", self.price, mode),
        };

        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(errors)
        }
    }
}

/// Error set for a route id that matches no book
pub fn book_not_found() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    add_book_not_found(&mut errors);
    errors
}

pub fn add_book_not_found(errors: &mut ValidationErrors) {
    errors.add("book", failure(EXISTS_RULE, "Book not found".to_string()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

fn failure(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Supplied, non-null value; reports `required` when a required one is missing
fn present(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<Value>,
    mode: Presence,
) -> Option<Value> {
    match value {
        None | Some(Value::Null) => {
            if mode == Presence::Required {
                errors.add(field, failure("required", format!("The {} field is required.", label(field))));
            }
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, failure("required", format!("The {} field is required.", label(field))));
            None
        }
        Some(value) => Some(value),
    }
}

fn text(errors: &mut ValidationErrors, field: &'static str, value: Option<Value>, mode: Presence) -> Option<String> {
    match present(errors, field, value, mode)? {
        Value::String(s) if s.chars().count() > MAX_TEXT_LENGTH => {
            errors.add(
                field,
                failure(
                    "max",
                    format!(
                        "The {} field must not be greater than {} characters.",
                        label(field),
                        MAX_TEXT_LENGTH
                    ),
                ),
            );
            None
        }
        Value::String(s) => Some(s),
        _ => {
            errors.add(field, failure("string", format!("The {} field must be a string.", label(field))));
            None
        }
    }
}

fn date(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<Value>,
    mode: Presence,
) -> Option<NaiveDate> {
    let parsed = match present(errors, field, value, mode)? {
        Value::String(s) => parse_date(s.trim()),
        _ => None,
    };
    if parsed.is_none() {
        errors.add(field, failure("date", format!("The {} field must be a valid date.", label(field))));
    }
    parsed
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn integer(errors: &mut ValidationErrors, field: &'static str, value: Option<Value>, mode: Presence) -> Option<i64> {
    let parsed = match present(errors, field, value, mode)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        None => {
            errors.add(field, failure("integer", format!("The {} field must be an integer.", label(field))));
            None
        }
        Some(n) if n < 0 => {
            errors.add(field, failure("min", format!("The {} field must be at least 0.", label(field))));
            None
        }
        Some(n) => Some(n),
    }
}

fn price(errors: &mut ValidationErrors, field: &'static str, value: Option<Value>, mode: Presence) -> Option<Decimal> {
    let parsed = match present(errors, field, value, mode)? {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };
    let max = Decimal::from_str(MAX_PRICE).unwrap_or(Decimal::MAX);
    match parsed {
        None => {
            errors.add(field, failure("numeric", format!("The {} field must be a number.", label(field))));
            None
        }
        Some(n) if n.is_sign_negative() && !n.is_zero() => {
            errors.add(field, failure("min", format!("The {} field must be at least 0.", label(field))));
            None
        }
        Some(n) if n > max => {
            errors.add(
                field,
                failure("max", format!("The {} field must not be greater than {}.", label(field), MAX_PRICE)),
            );
            None
        }
        Some(mut n) => {
            n.rescale(2);
            Some(n)
        }
    }
}

/// Plain decimal notation only: sign, digits, decimal point and exponent
fn parse_decimal(input: &str) -> Option<Decimal> {
    let plain = input
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !plain || !input.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(input)
        .or_else(|_| Decimal::from_scientific(input))
        .ok()
}

/// Public JSON representation of a book
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookResource {
    pub id: i64,
    pub title: String,
    pub publisher: String,
    pub author: String,
    pub genre: String,
    /// ISO-8601 calendar date
    #[schema(value_type = String, format = Date, example = "2022-01-01")]
    pub publication_date: NaiveDate,
    pub word_count: i64,
    /// Two-place decimal string
    #[schema(value_type = String, example = "25.99")]
    pub price: Decimal,
}

impl From<Book> for BookResource {
    fn from(book: Book) -> Self {
        let mut price = book.price;
        price.rescale(2);
        Self {
            id: book.id,
            title: book.title,
            publisher: book.publisher,
            author: book.author,
            genre: book.genre,
            publication_date: book.publication_date,
            word_count: book.word_count,
            price,
        }
    }
}
