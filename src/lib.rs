//! Bookshelf
//!
//! A small REST JSON API over a book collection kept in a single JSON file.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the repository and services for the given configuration
    pub fn new(config: &AppConfig) -> Self {
        let repository = repository::Repository::new(&config.storage);
        Self {
            services: Arc::new(services::Services::new(repository)),
        }
    }
}
