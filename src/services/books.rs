//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::book::{next_book_id, Book, CreateBook, UpdateBook},
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

    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.repository.books.load().await
    }

    /// Books currently available for borrowing, in store order
    pub async fn list_available(&self) -> AppResult<Vec<Book>> {
        let mut books = self.repository.books.load().await?;
        books.retain(|b| b.available);
        Ok(books)
    }

    /// Append a new book with the next free ID
    pub async fn create(&self, data: CreateBook) -> AppResult<Book> {
        let book = self
            .repository
            .books
            .update(move |books| {
                let id = next_book_id(books)
                    .ok_or_else(|| AppError::Internal("No book ID left to assign".to_string()))?;
                let book = data.into_book(id);
                books.push(book.clone());
                Ok((book, true))
            })
            .await?;

        tracing::info!("Created book id={}", book.id);
        Ok(book)
    }

    pub async fn update(&self, id: i64, data: &UpdateBook) -> AppResult<Book> {
        let book = self
            .repository
            .books
            .update(|books| {
                let book = books
                    .iter_mut()
                    .find(|b| b.id == id)
                    .ok_or_else(not_found)?;
                data.apply(book);
                Ok((book.clone(), !data.is_empty()))
            })
            .await?;

        tracing::info!("Updated book id={}", id);
        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.repository
            .books
            .update(|books| {
                let index = books
                    .iter()
                    .position(|b| b.id == id)
                    .ok_or_else(not_found)?;
                books.remove(index);
                Ok(((), true))
            })
            .await?;

        tracing::info!("Deleted book id={}", id);
        Ok(())
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}
