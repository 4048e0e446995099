//! In-memory book catalogue
//!
//! Append-only, unindexed and lost on restart. Search is a linear scan.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Title of the book
    #[arg(long)]
    pub title: String,
    /// Author of the book
    #[arg(long)]
    pub author: String,
    /// Publication date, free form (e.g. 1965-08-01)
    #[arg(long)]
    pub publication_date: String,
}

impl Book {
    /// Case-insensitive substring match on any field.
    /// `needle` must already be trimmed and lowercased.
    fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.author, &self.publication_date]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookStore {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BookStore {
    pub fn add(&self, book: Book) {
        self.books.write().push(book);
    }

    pub fn all(&self) -> Vec<Book> {
        self.books.read().clone()
    }

    /// Books matching `query`; a blank query returns every book
    pub fn search(&self, query: &str) -> Vec<Book> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all();
        }

        self.books
            .read()
            .iter()
            .filter(|book| book.matches(&needle))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, author: &str, date: &str) -> Book {
        Book {
            title: title.to_string(),
            author: author.to_string(),
            publication_date: date.to_string(),
        }
    }

    fn seeded() -> BookStore {
        let store = BookStore::default();
        store.add(book("Dune", "Frank Herbert", "1965-08-01"));
        store.add(book("Neuromancer", "William Gibson", "1984-07-01"));
        store.add(book("Dune Messiah", "Frank Herbert", "1969-10-15"));
        store
    }

    #[test]
    fn test_add_keeps_order() {
        let store = seeded();
        assert_eq!(store.len(), 3);
        let titles: Vec<_> = store.all().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["Dune", "Neuromancer", "Dune Messiah"]);
    }

    #[test]
    fn test_search_any_field_case_insensitive() {
        let store = seeded();
        assert_eq!(store.search("  dUNE ").len(), 2);
        assert_eq!(store.search("gibson").len(), 1);
        assert_eq!(store.search("1984").len(), 1);
        assert!(store.search("tolkien").is_empty());
    }

    #[test]
    fn test_blank_query_returns_all() {
        let store = seeded();
        assert_eq!(store.search(""), store.all());
        assert_eq!(store.search("   "), store.all());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(book("Dune", "Herbert", "1965")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Dune", "author": "Herbert", "publicationDate": "1965" })
        );
    }

    #[test]
    fn test_clones_share_books() {
        let store = BookStore::default();
        let clone = store.clone();
        store.add(book("Dune", "Herbert", "1965"));
        assert_eq!(clone.len(), 1);
        assert!(!clone.is_empty());
    }
}
