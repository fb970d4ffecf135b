use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, doc, oid::ObjectId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use super::BookStore;
use crate::book::Book;
use crate::config::RunnerConfig;
use crate::errors::QueryError;
use crate::query::{
    CmpOp, DeleteReport, Filter, FindOptions, IndexSpec, Order, Stage, UpdateDoc, UpdateReport,
    apply_update, compare_docs, eval_filter, project_fields, run_pipeline,
};

const ID_INDEX: &str = "_id_";

#[derive(Debug, Default)]
struct State {
    docs: Vec<BsonDocument>,
    indexes: BTreeMap<String, IndexSpec>,
    closed: bool,
}

/// In-process collection evaluating the same typed queries the MongoDB
/// backend sends to the server. Records come from a fixture; nothing is
/// invented.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        let mut indexes = BTreeMap::new();
        indexes.insert(ID_INDEX.to_string(), IndexSpec::single("_id", Order::Asc));
        Self {
            namespace: namespace.into(),
            state: RwLock::new(State { docs: Vec::new(), indexes, closed: false }),
        }
    }

    /// # Errors
    /// Returns an error if a book cannot be encoded.
    pub fn with_books<'a, I>(namespace: impl Into<String>, books: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let store = Self::new(namespace);
        for b in books {
            store.insert(b.to_document()?);
        }
        Ok(store)
    }

    /// Opens the store described by `cfg`, loading its fixture if one is set.
    ///
    /// # Errors
    /// Returns `QueryError::Fixture` if the fixture cannot be read or parsed.
    pub fn open(cfg: &RunnerConfig) -> Result<Self, QueryError> {
        let store = Self::new(cfg.namespace());
        if let Some(path) = &cfg.fixture {
            let books = load_fixture(path)?;
            for b in &books {
                store.insert(b.to_document()?);
            }
            log::info!("loaded {} books from {}", books.len(), path.display());
        } else {
            log::warn!("memory backend opened without a fixture; collection is empty");
        }
        Ok(store)
    }

    /// Adds a record, assigning an `_id` if it has none. Returns the id.
    pub fn insert(&self, mut doc: BsonDocument) -> Bson {
        if !doc.contains_key("_id") {
            let mut with_id = doc! { "_id": ObjectId::new() };
            for (k, v) in doc {
                with_id.insert(k, v);
            }
            doc = with_id;
        }
        let id = doc.get("_id").cloned().unwrap_or(Bson::Null);
        self.state.write().docs.push(doc);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    fn ensure_open(&self) -> Result<(), QueryError> {
        if self.state.read().closed {
            return Err(QueryError::Operation(format!("{} is closed", self.namespace)));
        }
        Ok(())
    }
}

/// Reads books from a JSON array or from NDJSON (one book per line).
///
/// # Errors
/// Returns `QueryError::Fixture` naming the path (and line, for NDJSON).
pub fn load_fixture(path: &Path) -> Result<Vec<Book>, QueryError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| QueryError::Fixture(format!("{}: {e}", path.display())))?;
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .map_err(|e| QueryError::Fixture(format!("{}: {e}", path.display())));
    }
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l)
                .map_err(|e| QueryError::Fixture(format!("{}:{}: {e}", path.display(), i + 1)))
        })
        .collect()
}

// Leading key of an index that an equality predicate can use.
fn plan_index<'a>(
    indexes: &'a BTreeMap<String, IndexSpec>,
    filter: &Filter,
) -> Option<(&'a String, &'a IndexSpec)> {
    match filter {
        Filter::Cmp { path, op: CmpOp::Eq, .. } => {
            indexes.iter().find(|(_, spec)| spec.leading_field() == Some(path.as_str()))
        }
        Filter::And(fs) => fs.iter().find_map(|f| plan_index(indexes, f)),
        _ => None,
    }
}

fn as_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl BookStore for MemoryStore {
    fn describe(&self) -> String {
        format!("in-memory store ({})", self.namespace)
    }

    async fn find(
        &self,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<BsonDocument>, QueryError> {
        self.ensure_open()?;
        let mut docs: Vec<BsonDocument> =
            self.state.read().docs.iter().filter(|d| eval_filter(d, filter)).cloned().collect();
        if let Some(sort) = &opts.sort {
            docs.sort_by(|a, b| compare_docs(a, b, sort));
        }
        let skip = opts.skip.unwrap_or(0);
        let limit = opts.limit.unwrap_or(usize::MAX);
        let mut docs: Vec<BsonDocument> = docs.into_iter().skip(skip).take(limit).collect();
        if let Some(fields) = &opts.projection {
            for d in &mut docs {
                *d = project_fields(d, fields);
            }
        }
        log::debug!("find on {} returned {} documents", self.namespace, docs.len());
        Ok(docs)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<BsonDocument>, QueryError> {
        self.ensure_open()?;
        Ok(self.state.read().docs.iter().find(|d| eval_filter(d, filter)).cloned())
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateReport, QueryError> {
        self.ensure_open()?;
        let mut state = self.state.write();
        match state.docs.iter_mut().find(|d| eval_filter(d, filter)) {
            Some(d) => {
                let changed = apply_update(d, update);
                Ok(UpdateReport { matched: 1, modified: u64::from(changed) })
            }
            None => Ok(UpdateReport::default()),
        }
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteReport, QueryError> {
        self.ensure_open()?;
        let mut state = self.state.write();
        match state.docs.iter().position(|d| eval_filter(d, filter)) {
            Some(pos) => {
                state.docs.remove(pos);
                Ok(DeleteReport { deleted: 1 })
            }
            None => Ok(DeleteReport::default()),
        }
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<BsonDocument>, QueryError> {
        self.ensure_open()?;
        let docs = self.state.read().docs.clone();
        Ok(run_pipeline(docs, pipeline))
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<String, QueryError> {
        self.ensure_open()?;
        if index.keys.is_empty() {
            return Err(QueryError::Operation("index key pattern must not be empty".into()));
        }
        let name = index.name();
        let mut state = self.state.write();
        match state.indexes.get(&name) {
            Some(existing) if existing == index => {
                log::debug!("index {name} already exists on {}", self.namespace);
            }
            Some(_) => {
                return Err(QueryError::Operation(format!(
                    "index {name} already exists with a different key pattern"
                )));
            }
            None => {
                state.indexes.insert(name.clone(), index.clone());
            }
        }
        Ok(name)
    }

    async fn index_names(&self) -> Result<Vec<String>, QueryError> {
        self.ensure_open()?;
        Ok(self.state.read().indexes.keys().cloned().collect())
    }

    async fn explain(&self, filter: &Filter) -> Result<BsonDocument, QueryError> {
        self.ensure_open()?;
        let start = Instant::now();
        let state = self.state.read();
        let matched = state.docs.iter().filter(|d| eval_filter(d, filter)).count();
        let parsed = filter.to_document();
        let (winning, keys_examined, docs_examined) = match plan_index(&state.indexes, filter) {
            Some((name, spec)) => (
                doc! {
                    "stage": "FETCH",
                    "inputStage": {
                        "stage": "IXSCAN",
                        "keyPattern": spec.to_document(),
                        "indexName": name.as_str(),
                    },
                },
                matched,
                matched,
            ),
            None => (
                doc! { "stage": "COLLSCAN", "filter": parsed.clone(), "direction": "forward" },
                0,
                state.docs.len(),
            ),
        };
        let millis = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
        Ok(doc! {
            "queryPlanner": {
                "namespace": self.namespace.as_str(),
                "parsedQuery": parsed,
                "winningPlan": winning,
                "rejectedPlans": [],
            },
            "executionStats": {
                "executionSuccess": true,
                "nReturned": as_count(matched),
                "executionTimeMillis": millis,
                "totalKeysExamined": as_count(keys_examined),
                "totalDocsExamined": as_count(docs_examined),
            },
        })
    }

    async fn close(&self) -> Result<(), QueryError> {
        self.state.write().closed = true;
        log::info!("closed {}", self.describe());
        Ok(())
    }
}
