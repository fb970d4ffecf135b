#![allow(dead_code)]

use bookstore_queries::book::Book;
use bookstore_queries::store::{MemoryStore, load_fixture};
use std::path::PathBuf;

pub const NAMESPACE: &str = "plp_bookstore.books";

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("books.json")
}

pub fn fixture_books() -> Vec<Book> {
    load_fixture(&fixture_path()).unwrap()
}

pub fn seeded_store() -> MemoryStore {
    MemoryStore::with_books(NAMESPACE, &fixture_books()).unwrap()
}

pub fn store_with(books: &[Book]) -> MemoryStore {
    MemoryStore::with_books(NAMESPACE, books).unwrap()
}

pub fn titles(docs: &[bson::Document]) -> Vec<String> {
    docs.iter().map(|d| d.get_str("title").unwrap().to_string()).collect()
}

/// Every write fails with a broken pipe.
pub struct FailWriter;

impl std::io::Write for FailWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reader closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
