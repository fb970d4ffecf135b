use bson::Document as BsonDocument;

use super::types::Order;

/// Key pattern of a single-field or compound index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, Order)>,
}

impl IndexSpec {
    pub fn single(field: impl Into<String>, order: Order) -> Self {
        Self { keys: vec![(field.into(), order)] }
    }

    #[must_use]
    pub fn compound(keys: &[(&str, Order)]) -> Self {
        Self { keys: keys.iter().map(|(f, o)| ((*f).to_string(), *o)).collect() }
    }

    /// Server default name: `field_dir` pairs joined by `_` (`author_1_published_year_-1`).
    #[must_use]
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(f, o)| format!("{f}_{}", o.direction()))
            .collect::<Vec<_>>()
            .join("_")
    }

    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut d = BsonDocument::new();
        for (f, o) in &self.keys {
            d.insert(f.clone(), o.direction());
        }
        d
    }

    #[must_use]
    pub fn leading_field(&self) -> Option<&str> {
        self.keys.first().map(|(f, _)| f.as_str())
    }
}
