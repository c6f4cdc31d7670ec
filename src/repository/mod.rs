//! Repository layer for persisted data

pub mod books;

use std::sync::Arc;

use crate::config::StorageConfig;

/// Main repository struct holding the backing stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<books::BookStore>,
}

impl Repository {
    /// Create a new repository over the configured storage
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            books: Arc::new(books::BookStore::new(config)),
        }
    }
}
