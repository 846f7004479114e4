//! Data models for Bookshelf

pub mod book;
pub mod claims;
pub mod page;

// Re-export commonly used types
pub use book::{Book, BookChanges, BookForm, BookResource, NewBook};
pub use claims::AccessClaims;
pub use page::{Page, PageRequest};
