//! JSON file backed book store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tokio::{fs, sync::Mutex};

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
    models::book::Book,
};

/// Books read from the store, plus how many stored records could not be
/// read as a book
#[derive(Debug, Default)]
struct Snapshot {
    books: Vec<Book>,
    skipped: usize,
}

/// Whole-collection store over a single JSON file.
///
/// Every read-modify-write cycle runs under one lock per store, and saves
/// go through a temporary file renamed over the target.
///
/// A file that is not JSON reads as an empty collection. A JSON file whose
/// records do not all match the book schema reads as its valid books only,
/// and refuses writes so the unreadable records are never overwritten.
#[derive(Debug)]
pub struct BookStore {
    path: PathBuf,
    strict: bool,
    lock: Mutex<()>,
}

impl BookStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.path.clone(),
            strict: config.strict,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole collection
    pub async fn load(&self) -> AppResult<Vec<Book>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.books)
    }

    /// Replace the whole collection
    pub async fn save(&self, books: &[Book]) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        self.write(books).await
    }

    /// Run one load, mutate, save cycle under the store lock.
    ///
    /// The closure returns the value to hand back and whether the collection
    /// must be persisted. An error aborts the cycle without writing.
    pub async fn update<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Vec<Book>) -> AppResult<(T, bool)>,
    {
        let _guard = self.lock.lock().await;
        let Snapshot { mut books, skipped } = self.read().await?;
        let (value, dirty) = f(&mut books)?;
        if dirty {
            if skipped > 0 {
                return Err(AppError::Internal(format!(
                    "Book store {} holds {} unreadable record(s), refusing to overwrite it",
                    self.path.display(),
                    skipped
                )));
            }
            self.write(&books).await?;
        }
        Ok(value)
    }

    async fn read(&self) -> AppResult<Snapshot> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Book store {} not found, starting empty", self.path.display());
                return Ok(Snapshot::default());
            }
            Err(e) if self.strict => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Cannot read book store {}: {}", self.path.display(), e);
                return Ok(Snapshot::default());
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot::default());
        }

        if self.strict {
            let books = serde_json::from_slice(&bytes)?;
            return Ok(Snapshot { books, skipped: 0 });
        }

        let records = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                tracing::warn!("Book store {} does not hold a list", self.path.display());
                return Ok(Snapshot { books: Vec::new(), skipped: 1 });
            }
            Err(e) => {
                tracing::warn!(
                    "Book store {} is not valid JSON, treating as empty: {}",
                    self.path.display(),
                    e
                );
                return Ok(Snapshot::default());
            }
        };

        let mut snapshot = Snapshot::default();
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Book>(record) {
                Ok(book) => snapshot.books.push(book),
                Err(e) => {
                    tracing::warn!(
                        "Skipping record {} of book store {}: {}",
                        index,
                        self.path.display(),
                        e
                    );
                    snapshot.skipped += 1;
                }
            }
        }
        Ok(snapshot)
    }

    async fn write(&self, books: &[Book]) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let data = to_pretty_json(books)?;
        let tmp = self.temp_path();
        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "books.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Serialize with two-space indentation
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn temp_store(strict: bool) -> BookStore {
        let path = std::env::temp_dir()
            .join(format!("bookshelf_store_{}", uuid::Uuid::new_v4()))
            .join("books.json");
        BookStore::new(&StorageConfig { path, strict })
    }

    fn dune() -> Book {
        Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            available: true,
        }
    }

    async fn cleanup(store: &BookStore) {
        if let Some(dir) = store.path().parent() {
            let _ = fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let store = temp_store(true);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = temp_store(false);
        store.save(&[dune()]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), vec![dune()]);

        let text = fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(
            text,
            "[\n  {\n    \"id\": 1,\n    \"title\": \"Dune\",\n    \"author\": \"Herbert\",\n    \"available\": true\n  }\n]"
        );
        assert!(!store.temp_path().exists());
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_lenient_and_strict() {
        let lenient = temp_store(false);
        fs::create_dir_all(lenient.path().parent().unwrap()).await.unwrap();
        fs::write(lenient.path(), b"{not json").await.unwrap();
        assert!(lenient.load().await.unwrap().is_empty());

        let strict = BookStore::new(&StorageConfig {
            path: lenient.path().to_path_buf(),
            strict: true,
        });
        assert!(matches!(strict.load().await, Err(AppError::Serialization(_))));

        fs::write(lenient.path(), b"  \n").await.unwrap();
        assert!(strict.load().await.unwrap().is_empty());
        cleanup(&lenient).await;
    }

    #[tokio::test]
    async fn test_schema_mismatch_keeps_file() {
        let store = temp_store(false);
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        let stored = r#"[
  {"id": 1, "title": "Dune", "author": "Herbert", "available": true},
  {"id": 2, "title": "C", "author": "D"}
]"#;
        fs::write(store.path(), stored).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![dune()]);

        let read_only = store.update(|books| Ok((books.len(), false))).await.unwrap();
        assert_eq!(read_only, 1);

        let result = store
            .update(|books| {
                books.push(Book { id: 3, ..dune() });
                Ok(((), true))
            })
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(fs::read_to_string(store.path()).await.unwrap(), stored);

        fs::write(store.path(), r#"{"books": []}"#).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
        let result = store.update(|_| Ok(((), true))).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_update_skips_write_when_clean() {
        let store = temp_store(false);
        let count = store.update(|books| Ok((books.len(), false))).await.unwrap();
        assert_eq!(count, 0);
        assert!(!store.path().exists());

        store
            .update(|books| {
                books.push(dune());
                Ok(((), true))
            })
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_update_error_does_not_write() {
        let store = temp_store(false);
        store.save(&[dune()]).await.unwrap();
        let result: AppResult<()> = store
            .update(|books| {
                books.clear();
                Err(AppError::NotFound("Book not found".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load().await.unwrap(), vec![dune()]);
        cleanup(&store).await;
    }
}
