pub mod book;
pub mod config;
pub mod errors;
pub mod logger;
pub mod query;
pub mod runner;
pub mod store;

mod test_support;

use std::io::Write;

use crate::config::{Backend, RunnerConfig};
use crate::errors::QueryError;
use crate::runner::{QueryRunner, RunReport};
use crate::store::{BookStore, MemoryStore, MongoStore};

/// Connects to the configured backend, runs the bookstore script and closes
/// the connection. Progress and results go to `out`.
///
/// # Errors
/// Returns a connection error if the store cannot be reached, otherwise the
/// first failing step. The connection is closed before either is returned.
pub async fn run<W: Write>(cfg: &RunnerConfig, out: &mut W) -> Result<RunReport, QueryError> {
    match cfg.backend {
        Backend::Mongo => drive(&MongoStore::connect(cfg).await?, out).await,
        Backend::Memory => drive(&MemoryStore::open(cfg)?, out).await,
    }
}

async fn drive<S: BookStore, W: Write>(store: &S, out: &mut W) -> Result<RunReport, QueryError> {
    if let Err(e) = writeln!(out, "Connected to {}", store.describe()) {
        if let Err(close_err) = store.close().await {
            log::warn!("close after failed banner write also failed: {close_err}");
        }
        return Err(e.into());
    }
    QueryRunner::new().run_and_close(store, out).await
}
