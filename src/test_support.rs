#![cfg(test)]

// Test-only helpers: temp paths and a ten-book fixture
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::book::Book;

/// Create a unique temp file path with the given stem and extension in the OS temp dir.
pub fn temp_path(stem: &str, ext: &str) -> PathBuf {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("{}_{}.{}", stem, now, ext));
    p
}

pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 12.99, true),
        Book::new("1984", "George Orwell", "Dystopian", 1949, 10.99, true),
        Book::new("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 9.99, true),
        Book::new("Brave New World", "Aldous Huxley", "Dystopian", 1932, 11.50, false),
        Book::new("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 14.99, true),
        Book::new("The Catcher in the Rye", "J.D. Salinger", "Fiction", 1951, 8.99, true),
        Book::new("Pride and Prejudice", "Jane Austen", "Romance", 1813, 7.99, true),
        Book::new("Animal Farm", "George Orwell", "Political Satire", 1945, 8.50, false),
        Book::new("Moby Dick", "Herman Melville", "Adventure", 1851, 12.50, false),
        Book::new("Wuthering Heights", "Emily Brontë", "Gothic Fiction", 1847, 9.25, true),
    ]
}

/// A writer whose every write fails, like stdout after the reader hung up.
pub struct FailWriter;

impl Write for FailWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
