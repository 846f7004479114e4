//! PostgreSQL book store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    filters::{BookFilter, FilterClause},
    models::{book::book_not_found, Book, BookChanges, NewBook, Page, PageRequest},
};

const BOOK_COLUMNS: &str =
    "id, title, publisher, author, genre, publication_date, word_count, price, created_at, updated_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Append the filter's predicates to a query whose WHERE clause is already open
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    for clause in filter.clauses() {
        match clause {
            FilterClause::TitleMatch(query) => match query.to_tsquery() {
                Some(tsquery) => {
                    builder
                        .push(" AND to_tsvector('simple', title) @@ to_tsquery('simple', ")
                        .push_bind(tsquery)
                        .push(")");
                }
                None => {
                    builder.push(" AND FALSE");
                }
            },
        }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    /// List books matching the filter, newest first
    async fn list(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books WHERE TRUE");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM books WHERE TRUE", BOOK_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.per_page))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok(Page::new(books, total.max(0) as u64, page))
    }

    /// Get book by ID
    async fn find(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Create book
    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, publisher, author, genre, publication_date, word_count, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.publication_date)
        .bind(book.word_count)
        .bind(book.price)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update the supplied attributes only
    async fn update(&self, id: i64, changes: &BookChanges) -> AppResult<Book> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = GREATEST(updated_at, $1)".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(changes.title, "title");
        add_field!(changes.publisher, "publisher");
        add_field!(changes.author, "author");
        add_field!(changes.genre, "genre");
        add_field!(changes.publication_date, "publication_date");
        add_field!(changes.word_count, "word_count");
        add_field!(changes.price, "price");

        let query = format!(
            "UPDATE books SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            idx,
            BOOK_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Book>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(changes.title);
        bind_field!(changes.publisher);
        bind_field!(changes.author);
        bind_field!(changes.genre);
        bind_field!(changes.publication_date);
        bind_field!(changes.word_count);
        bind_field!(changes.price);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::Validation(book_not_found()))
    }

    /// Delete book
    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Validation(book_not_found()));
        }
        Ok(())
    }
}
