use async_trait::async_trait;
use bson::{Document as BsonDocument, doc};
use futures::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use super::BookStore;
use crate::config::{RunnerConfig, redact_uri};
use crate::errors::QueryError;
use crate::query::{
    DeleteReport, Filter, FindOptions, IndexSpec, Stage, UpdateDoc, UpdateReport,
    pipeline_documents, projection_document, sort_document,
};

/// MongoDB backend. All query semantics are the server's.
pub struct MongoStore {
    client: Client,
    db: Database,
    books: Collection<BsonDocument>,
    target: String,
}

impl MongoStore {
    /// Builds a client and pings the server so that an unreachable store
    /// fails here rather than on the first query.
    ///
    /// # Errors
    /// Returns `QueryError::Connection` if the URI is invalid or the server does not answer.
    pub async fn connect(cfg: &RunnerConfig) -> Result<Self, QueryError> {
        let target = format!("MongoDB at {} ({})", redact_uri(&cfg.uri), cfg.namespace());
        let mut opts = ClientOptions::parse(&cfg.uri)
            .await
            .map_err(|e| QueryError::Connection(e.to_string()))?;
        opts.app_name = Some("bookstore-queries".to_string());
        opts.connect_timeout = Some(cfg.connect_timeout());
        opts.server_selection_timeout = Some(cfg.connect_timeout());
        let client =
            Client::with_options(opts).map_err(|e| QueryError::Connection(e.to_string()))?;
        let db = client.database(&cfg.database);
        if let Err(e) = db.run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(QueryError::Connection(e.to_string()));
        }
        log::info!("connected to {target}");
        let books = db.collection::<BsonDocument>(&cfg.collection);
        Ok(Self { client, db, books, target })
    }
}

#[async_trait]
impl BookStore for MongoStore {
    fn describe(&self) -> String {
        self.target.clone()
    }

    async fn find(
        &self,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<BsonDocument>, QueryError> {
        let mut action = self.books.find(filter.to_document());
        if let Some(fields) = &opts.projection {
            action = action.projection(projection_document(fields));
        }
        if let Some(sort) = &opts.sort {
            action = action.sort(sort_document(sort));
        }
        if let Some(skip) = opts.skip {
            action = action.skip(u64::try_from(skip).unwrap_or(u64::MAX));
        }
        if let Some(limit) = opts.limit {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<BsonDocument>, QueryError> {
        Ok(self.books.find_one(filter.to_document()).await?)
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateReport, QueryError> {
        let r = self.books.update_one(filter.to_document(), update.to_document()).await?;
        Ok(UpdateReport { matched: r.matched_count, modified: r.modified_count })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<DeleteReport, QueryError> {
        let r = self.books.delete_one(filter.to_document()).await?;
        Ok(DeleteReport { deleted: r.deleted_count })
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<BsonDocument>, QueryError> {
        let cursor = self.books.aggregate(pipeline_documents(pipeline)).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_index(&self, index: &IndexSpec) -> Result<String, QueryError> {
        let model = IndexModel::builder().keys(index.to_document()).build();
        let r = self.books.create_index(model).await?;
        Ok(r.index_name)
    }

    async fn index_names(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.books.list_index_names().await?)
    }

    async fn explain(&self, filter: &Filter) -> Result<BsonDocument, QueryError> {
        let cmd = doc! {
            "explain": { "find": self.books.name(), "filter": filter.to_document() },
            "verbosity": "executionStats",
        };
        Ok(self.db.run_command(cmd).await?)
    }

    async fn close(&self) -> Result<(), QueryError> {
        self.client.clone().shutdown().await;
        log::info!("closed connection to {}", self.target);
        Ok(())
    }
}
