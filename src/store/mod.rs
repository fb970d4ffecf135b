//! The seam between the query runner and the database.

mod memory;
mod mongo;

pub use memory::{MemoryStore, load_fixture};
pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::Document as BsonDocument;

use crate::errors::QueryError;
use crate::query::{DeleteReport, Filter, FindOptions, IndexSpec, Stage, UpdateDoc, UpdateReport};

/// Operations the runner issues against the book collection.
///
/// Not-found point lookups are `Ok(None)`. Errors abort the caller's sequence.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Human-readable target, without credentials.
    fn describe(&self) -> String;

    async fn find(
        &self,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<BsonDocument>, QueryError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<BsonDocument>, QueryError>;

    async fn update_one(
        &self,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateReport, QueryError>;

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteReport, QueryError>;

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<BsonDocument>, QueryError>;

    /// Creates the index if missing and returns its name.
    async fn create_index(&self, index: &IndexSpec) -> Result<String, QueryError>;

    async fn index_names(&self) -> Result<Vec<String>, QueryError>;

    /// Execution statistics for `find(filter)`.
    async fn explain(&self, filter: &Filter) -> Result<BsonDocument, QueryError>;

    /// Releases the connection.
    async fn close(&self) -> Result<(), QueryError>;
}
