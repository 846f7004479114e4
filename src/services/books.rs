//! Book management service

use crate::{
    error::{AppError, AppResult},
    filters::BookFilter,
    models::{
        book::{add_book_not_found, book_not_found},
        Book, BookForm, Page, PageRequest,
    },
    notices::Notices,
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books matching the filter, newest first.
    ///
    /// Parameters the filter does not recognize are reported as notices.
    pub async fn list(&self, filter: &BookFilter, page: PageRequest, notices: &Notices) -> AppResult<Page<Book>> {
        for name in filter.ignored() {
            notices.info(format!("Unknown filter `{}` was ignored", name));
        }
        self.repository.books.list(filter, page).await
    }

    /// Check that the store answers a minimal query
    pub async fn ping(&self) -> AppResult<()> {
        self.repository
            .books
            .list(&BookFilter::default(), PageRequest::new(None, 1))
            .await
            .map(|_| ())
    }

    /// Validate and store a new book
    pub async fn create(&self, form: BookForm) -> AppResult<Book> {
        let new_book = form.into_new_book()?;
        let book = self.repository.books.create(&new_book).await?;
        tracing::info!("Created book id={}", book.id);
        Ok(book)
    }

    /// Get book by ID
    pub async fn get(&self, id: i64) -> AppResult<Book> {
        self.repository
            .books
            .find(id)
            .await?
            .ok_or_else(|| AppError::Validation(book_not_found()))
    }

    /// Apply the supplied attributes of `form` to an existing book.
    ///
    /// Field errors and a missing book are reported together; the missing
    /// book makes the whole failure a 404.
    pub async fn update(&self, id: i64, form: BookForm, notices: &Notices) -> AppResult<Book> {
        let current = self.repository.books.find(id).await?;

        let changes = match (form.into_changes(), current) {
            (Ok(changes), Some(current)) if changes.is_empty() => {
                notices.info("No changes were supplied");
                return Ok(current);
            }
            (Ok(changes), Some(_)) => changes,
            (Ok(_), None) => return Err(AppError::Validation(book_not_found())),
            (Err(mut errors), current) => {
                if current.is_none() {
                    add_book_not_found(&mut errors);
                }
                return Err(AppError::Validation(errors));
            }
        };

        let book = self.repository.books.update(id, &changes).await?;
        tracing::info!("Updated book id={}", book.id);
        Ok(book)
    }

    /// Delete a book; deleting it again fails as not found
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if self.repository.books.find(id).await?.is_none() {
            return Err(AppError::Validation(book_not_found()));
        }
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }
}
