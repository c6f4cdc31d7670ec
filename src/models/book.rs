//! Book model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Book record, as stored and returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Whether the book can currently be borrowed
    pub available: bool,
}

/// Create book request. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub available: bool,
}

impl CreateBook {
    /// Validate a raw JSON body. A missing field, a wrong JSON type or a
    /// non-object body all yield the same error.
    pub fn from_json(body: &Value) -> AppResult<Self> {
        let invalid = || AppError::BadRequest("Invalid book data".to_string());
        let fields = body.as_object().ok_or_else(invalid)?;

        let title = fields.get("title").and_then(Value::as_str).ok_or_else(invalid)?;
        let author = fields.get("author").and_then(Value::as_str).ok_or_else(invalid)?;
        let available = fields.get("available").and_then(Value::as_bool).ok_or_else(invalid)?;

        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            available,
        })
    }

    pub fn into_book(self, id: i64) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            available: self.available,
        }
    }
}

/// Update book request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub available: Option<bool>,
}

impl UpdateBook {
    /// Validate a raw JSON body. A field that is present must carry the
    /// declared type; `null` counts as present.
    pub fn from_json(body: &Value) -> AppResult<Self> {
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);

        let title = optional_field(fields, "title", Value::as_str, "Invalid title")?;
        let author = optional_field(fields, "author", Value::as_str, "Invalid author")?;
        let available =
            optional_field(fields, "available", Value::as_bool, "Invalid available status")?;

        Ok(Self {
            title: title.map(str::to_string),
            author: author.map(str::to_string),
            available,
        })
    }

    /// Overwrite the provided fields on `book`
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(available) = self.available {
            book.available = available;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.available.is_none()
    }
}

fn optional_field<'a, T>(
    fields: &'a Map<String, Value>,
    name: &str,
    extract: impl Fn(&'a Value) -> Option<T>,
    message: &str,
) -> AppResult<Option<T>> {
    match fields.get(name) {
        None => Ok(None),
        Some(value) => extract(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(message.to_string())),
    }
}

/// Parse a book ID from a path segment.
///
/// Accepts the leading integer of the segment: optional whitespace, an
/// optional sign, then digits. Anything after the digits is ignored, so
/// `"12abc"` is 12 and `"1.5"` is 1. Returns `None` when there are no digits
/// or the value does not fit in an `i64`.
pub fn parse_book_id(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let sign_len = usize::from(s.starts_with(&['+', '-'][..]));
    let digits_len = s[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..sign_len + digits_len].parse().ok()
}

/// Next ID to assign: one past the largest existing ID, never below 1.
/// `None` once the largest ID is `i64::MAX`.
pub fn next_book_id(books: &[Book]) -> Option<i64> {
    books.iter().map(|b| b.id).max().unwrap_or(0).max(0).checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book(id: i64) -> Book {
        Book {
            id,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            available: true,
        }
    }

    #[test]
    fn test_create_book_requires_all_fields() {
        let data = CreateBook::from_json(&json!({
            "title": "Dune",
            "author": "Herbert",
            "available": true
        }))
        .unwrap();
        assert_eq!(data.title, "Dune");
        assert!(data.available);

        for body in [
            json!({"title": "X"}),
            json!({"title": "X", "author": "Y", "available": "yes"}),
            json!({"title": 1, "author": "Y", "available": false}),
            json!({"title": "X", "author": null, "available": false}),
            json!([]),
            json!("Dune"),
        ] {
            let err = CreateBook::from_json(&body).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid book data"));
        }
    }

    #[test]
    fn test_update_book_field_errors() {
        let cases = [
            (json!({"title": 3}), "Invalid title"),
            (json!({"title": null}), "Invalid title"),
            (json!({"author": false}), "Invalid author"),
            (json!({"available": "true"}), "Invalid available status"),
            // title is checked before available
            (json!({"available": 1, "title": []}), "Invalid title"),
        ];
        for (body, expected) in cases {
            match UpdateBook::from_json(&body) {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, expected),
                other => panic!("unexpected result for {}: {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_update_book_ignores_unknown_fields() {
        let data = UpdateBook::from_json(&json!({"id": 42, "isbn": "x"})).unwrap();
        assert!(data.is_empty());
        let data = UpdateBook::from_json(&json!([1, 2])).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_update_book_apply() {
        let mut b = book(1);
        let data = UpdateBook::from_json(&json!({"available": false})).unwrap();
        data.apply(&mut b);
        assert_eq!(b.title, "Dune");
        assert!(!b.available);

        UpdateBook::default().apply(&mut b);
        assert_eq!(b, Book { available: false, ..book(1) });
    }

    #[test]
    fn test_parse_book_id() {
        assert_eq!(parse_book_id("7"), Some(7));
        assert_eq!(parse_book_id("  12"), Some(12));
        assert_eq!(parse_book_id("-3"), Some(-3));
        assert_eq!(parse_book_id("+4"), Some(4));
        assert_eq!(parse_book_id("12abc"), Some(12));
        assert_eq!(parse_book_id("1.5"), Some(1));
        assert_eq!(parse_book_id("abc"), None);
        assert_eq!(parse_book_id(""), None);
        assert_eq!(parse_book_id("-"), None);
        assert_eq!(parse_book_id("99999999999999999999"), None);
    }

    #[test]
    fn test_next_book_id() {
        assert_eq!(next_book_id(&[]), Some(1));
        assert_eq!(next_book_id(&[book(3), book(1)]), Some(4));
        assert_eq!(next_book_id(&[book(-5)]), Some(1));
        assert_eq!(next_book_id(&[book(i64::MAX - 1)]), Some(i64::MAX));
        assert_eq!(next_book_id(&[book(2), book(i64::MAX)]), None);
    }

    #[test]
    fn test_book_serialization_field_order() {
        let json = serde_json::to_string(&book(1)).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"title":"Dune","author":"Herbert","available":true}"#
        );
    }
}
