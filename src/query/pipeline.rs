use bson::{Bson, Document as BsonDocument, doc};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use super::eval::{as_f64, compare_docs, get_path};
use super::types::SortSpec;

/// The `_id` expression of a `$group` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupId {
    /// `"$field"`
    Field(String),
    /// `floor(field / width) * width`, e.g. publication decade.
    Bucket { field: String, width: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// `{ $avg: "$field" }`
    Avg(String),
    /// `{ $sum: 1 }`
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub outputs: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Group(Group),
    Sort(Vec<SortSpec>),
    Limit(usize),
}

impl GroupId {
    fn to_bson(&self) -> Bson {
        match self {
            Self::Field(f) => Bson::String(format!("${f}")),
            Self::Bucket { field, width } => Bson::Document(doc! {
                "$multiply": [
                    { "$floor": { "$divide": [format!("${field}"), *width] } },
                    *width,
                ]
            }),
        }
    }

    fn evaluate(&self, doc: &BsonDocument) -> Bson {
        match self {
            Self::Field(f) => get_path(doc, f).cloned().unwrap_or(Bson::Null),
            Self::Bucket { field, width } => {
                match get_path(doc, field).and_then(as_f64) {
                    Some(v) if *width != 0 => {
                        let w = f64::from(*width);
                        Bson::Double((v / w).floor() * w)
                    }
                    _ => Bson::Null,
                }
            }
        }
    }
}

impl Accumulator {
    fn to_bson(&self) -> Bson {
        match self {
            Self::Avg(f) => Bson::Document(doc! { "$avg": format!("${f}") }),
            Self::Count => Bson::Document(doc! { "$sum": 1 }),
        }
    }
}

impl Stage {
    /// Renders the stage as a driver pipeline document.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        match self {
            Self::Group(g) => {
                let mut body = doc! { "_id": g.id.to_bson() };
                for (name, acc) in &g.outputs {
                    body.insert(name.clone(), acc.to_bson());
                }
                doc! { "$group": body }
            }
            Self::Sort(sort) => doc! { "$sort": super::render::sort_document(sort) },
            Self::Limit(n) => doc! { "$limit": i64::try_from(*n).unwrap_or(i64::MAX) },
        }
    }
}

#[must_use]
pub fn pipeline_documents(stages: &[Stage]) -> Vec<BsonDocument> {
    stages.iter().map(Stage::to_document).collect()
}

// Grouping key. Numbers of any width group together, as on the server.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Null,
    Num(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
    Other(String),
}

fn group_key(v: &Bson) -> GroupKey {
    if let Some(f) = as_f64(v) {
        return GroupKey::Num(OrderedFloat(f));
    }
    match v {
        Bson::Null | Bson::Undefined => GroupKey::Null,
        Bson::String(s) => GroupKey::Str(s.clone()),
        Bson::Boolean(b) => GroupKey::Bool(*b),
        other => GroupKey::Other(other.to_string()),
    }
}

#[derive(Debug, Default)]
struct AccState {
    sum: f64,
    n: u64,
}

struct Bucket {
    id: Bson,
    states: Vec<AccState>,
}

fn run_group(docs: Vec<BsonDocument>, g: &Group) -> Vec<BsonDocument> {
    let mut buckets: BTreeMap<GroupKey, Bucket> = BTreeMap::new();
    for d in &docs {
        let id = g.id.evaluate(d);
        let bucket = buckets.entry(group_key(&id)).or_insert_with(|| Bucket {
            id,
            states: g.outputs.iter().map(|_| AccState::default()).collect(),
        });
        for ((_, acc), st) in g.outputs.iter().zip(bucket.states.iter_mut()) {
            match acc {
                Accumulator::Avg(field) => {
                    if let Some(v) = get_path(d, field).and_then(as_f64) {
                        st.sum += v;
                        st.n += 1;
                    }
                }
                Accumulator::Count => st.n += 1,
            }
        }
    }
    buckets
        .into_values()
        .map(|b| {
            let mut out = doc! { "_id": b.id };
            for ((name, acc), st) in g.outputs.iter().zip(b.states) {
                let v = match acc {
                    Accumulator::Avg(_) if st.n == 0 => Bson::Null,
                    Accumulator::Avg(_) => Bson::Double(st.sum / st.n as f64),
                    Accumulator::Count => match i32::try_from(st.n) {
                        Ok(n) => Bson::Int32(n),
                        Err(_) => Bson::Int64(i64::try_from(st.n).unwrap_or(i64::MAX)),
                    },
                };
                out.insert(name.clone(), v);
            }
            out
        })
        .collect()
}

/// Evaluates a pipeline in process over `docs`.
#[must_use]
pub fn run_pipeline(mut docs: Vec<BsonDocument>, stages: &[Stage]) -> Vec<BsonDocument> {
    for stage in stages {
        docs = match stage {
            Stage::Group(g) => run_group(docs, g),
            Stage::Sort(sort) => {
                docs.sort_by(|a, b| compare_docs(a, b, sort));
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
        };
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decade() -> Stage {
        Stage::Group(Group {
            id: GroupId::Bucket { field: "published_year".into(), width: 10 },
            outputs: vec![("count".into(), Accumulator::Count)],
        })
    }

    #[test]
    fn decade_group_renders_bucket_expression() {
        assert_eq!(
            decade().to_document(),
            doc! { "$group": {
                "_id": { "$multiply": [{ "$floor": { "$divide": ["$published_year", 10] } }, 10] },
                "count": { "$sum": 1 },
            } }
        );
    }

    #[test]
    fn bucket_floors_year() {
        let out = run_pipeline(vec![doc! { "published_year": 1984 }], &[decade()]);
        assert_eq!(out, vec![doc! { "_id": 1980.0, "count": 1 }]);
    }

    #[test]
    fn avg_skips_non_numeric_and_missing() {
        let g = Stage::Group(Group {
            id: GroupId::Field("genre".into()),
            outputs: vec![("avgPrice".into(), Accumulator::Avg("price".into()))],
        });
        let docs = vec![
            doc! { "genre": "Fiction", "price": 10 },
            doc! { "genre": "Fiction", "price": 20.0 },
            doc! { "genre": "Fiction", "price": "n/a" },
            doc! { "genre": "Poetry" },
        ];
        let out = run_pipeline(docs, &[g]);
        assert_eq!(out[0], doc! { "_id": "Fiction", "avgPrice": 15.0 });
        assert_eq!(out[1], doc! { "_id": "Poetry", "avgPrice": Bson::Null });
    }

    #[test]
    fn missing_group_field_groups_under_null() {
        let g = Stage::Group(Group {
            id: GroupId::Field("author".into()),
            outputs: vec![("count".into(), Accumulator::Count)],
        });
        let out = run_pipeline(vec![doc! {}, doc! {}], &[g]);
        assert_eq!(out, vec![doc! { "_id": Bson::Null, "count": 2 }]);
    }
}
