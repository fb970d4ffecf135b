//! Rendering of typed queries into the documents the MongoDB driver sends.

use bson::{Bson, Document as BsonDocument, doc};

use super::types::{CmpOp, Filter, SortSpec, UpdateDoc};

impl Filter {
    /// Renders the filter as a query document.
    ///
    /// Equality renders in the shorthand form (`{ genre: "Fiction" }`).
    /// Conjunctions are flattened into a single document when their fields
    /// do not collide, and fall back to `$and` otherwise.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        match self {
            Self::True => BsonDocument::new(),
            Self::Cmp { path, op: CmpOp::Eq, value } => doc! { path.as_str(): value.clone() },
            Self::Cmp { path, op, value } => {
                doc! { path.as_str(): { op.operator(): value.clone() } }
            }
            Self::And(fs) => {
                let parts: Vec<BsonDocument> = fs.iter().map(Self::to_document).collect();
                let mut merged = BsonDocument::new();
                for part in &parts {
                    for (k, v) in part {
                        if merged.contains_key(k) {
                            let all: Vec<Bson> = parts.iter().cloned().map(Bson::Document).collect();
                            return doc! { "$and": all };
                        }
                        merged.insert(k.clone(), v.clone());
                    }
                }
                merged
            }
        }
    }
}

impl UpdateDoc {
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut set = BsonDocument::new();
        for (k, v) in &self.set {
            set.insert(k.clone(), v.clone());
        }
        doc! { "$set": set }
    }
}

#[must_use]
pub fn sort_document(sort: &[SortSpec]) -> BsonDocument {
    let mut d = BsonDocument::new();
    for s in sort {
        d.insert(s.field.clone(), s.order.direction());
    }
    d
}

#[must_use]
pub fn projection_document(fields: &[String]) -> BsonDocument {
    let mut d = BsonDocument::new();
    for f in fields {
        d.insert(f.clone(), 1);
    }
    d
}
