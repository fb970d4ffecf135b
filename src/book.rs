use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

/// A record of the `books` collection. The store-assigned `_id` is not part
/// of the model and is ignored when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        published_year: i32,
        price: f64,
        in_stock: bool,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            published_year,
            price,
            in_stock,
        }
    }

    /// # Errors
    /// Returns an error if the book cannot be encoded as BSON.
    pub fn to_document(&self) -> Result<BsonDocument, QueryError> {
        Ok(bson::to_document(self)?)
    }

    /// # Errors
    /// Returns an error if a required field is missing or has the wrong type.
    pub fn from_document(doc: &BsonDocument) -> Result<Self, QueryError> {
        Ok(bson::from_document(doc.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn decode_ignores_store_id() {
        let d = doc! {
            "_id": bson::oid::ObjectId::new(),
            "title": "1984",
            "author": "George Orwell",
            "genre": "Dystopian",
            "published_year": 1949,
            "price": 10.99,
            "in_stock": true,
        };
        let b = Book::from_document(&d).unwrap();
        assert_eq!(b.title, "1984");
        assert_eq!(b.published_year, 1949);
    }

    #[test]
    fn decode_rejects_missing_field() {
        let d = doc! { "title": "1984" };
        assert!(Book::from_document(&d).is_err());
    }

    #[test]
    fn encode_uses_native_types() {
        let b = Book::new("Emma", "Jane Austen", "Romance", 1815, 7.99, false);
        let d = b.to_document().unwrap();
        assert_eq!(d.get_i32("published_year").unwrap(), 1815);
        assert_eq!(d.get_f64("price").unwrap(), 7.99);
        assert!(!d.get_bool("in_stock").unwrap());
    }
}
