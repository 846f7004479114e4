//! Bookshelf Server
//!
//! A REST JSON API for managing book records, with full-text title search,
//! pagination and a uniform `{status, data, errors, notify}` response envelope.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod notices;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
