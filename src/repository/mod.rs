//! Repository layer for book persistence

pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    filters::BookFilter,
    models::{Book, BookChanges, NewBook, Page, PageRequest},
};

/// Storage contract for book records.
///
/// Stores assign ids and timestamps. `list` returns rows ordered by
/// `created_at` then `id`, both descending.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>>;

    async fn find(&self, id: i64) -> AppResult<Option<Book>>;

    async fn create(&self, book: &NewBook) -> AppResult<Book>;

    /// Fails with the `book` existence error when the row disappeared
    async fn update(&self, id: i64, changes: &BookChanges) -> AppResult<Book>;

    /// Fails with the `book` existence error when no row was deleted
    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Main repository struct holding the configured store
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
}

impl Repository {
    /// Repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_store(Arc::new(books::BooksRepository::new(pool)))
    }

    /// Repository backed by the in-process store
    pub fn memory() -> Self {
        Self::with_store(Arc::new(memory::MemoryBookStore::new()))
    }

    pub fn with_store(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }
}
