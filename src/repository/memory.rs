//! In-process book store.
//!
//! Selected with `database.url = "memory://"`. Data lives as long as the
//! process and is shared by all requests through an async `RwLock`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    filters::BookFilter,
    models::{book::book_not_found, Book, BookChanges, NewBook, Page, PageRequest},
};

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Book>,
    last_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Current time, never earlier than a previously handed-out timestamp
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }
}

#[derive(Debug, Default)]
pub struct MemoryBookStore {
    state: RwLock<MemoryState>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let state = self.state.read().await;

        let mut matching: Vec<&Book> = state.rows.iter().filter(|book| filter.matches(book)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, page))
    }

    async fn find(&self, id: i64) -> AppResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.rows.iter().find(|book| book.id == id).cloned())
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let now = state.now();
        state.last_id += 1;

        let row = Book {
            id: state.last_id,
            title: book.title.clone(),
            publisher: book.publisher.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            publication_date: book.publication_date,
            word_count: book.word_count,
            price: book.price,
            created_at: now,
            updated_at: now,
        };
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, changes: &BookChanges) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let now = state.now();

        let book = state
            .rows
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| AppError::Validation(book_not_found()))?;

        changes.apply_to(book);
        book.updated_at = now;
        Ok(book.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        let before = state.rows.len();
        state.rows.retain(|book| book.id != id);
        if state.rows.len() == before {
            return Err(AppError::Validation(book_not_found()));
        }
        Ok(())
    }
}
