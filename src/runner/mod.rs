//! Sequential execution of the bookstore script.

pub mod report;
pub mod script;

pub use report::{Outcome, write_step};
pub use script::{Operation, bookstore_script};

use std::io::Write;

use crate::errors::QueryError;
use crate::logger::AUDIT_TARGET;
use crate::store::BookStore;

/// Headings and outcomes of the steps that completed, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub steps: Vec<(String, Outcome)>,
}

impl RunReport {
    #[must_use]
    pub fn outcome(&self, heading_prefix: &str) -> Option<&Outcome> {
        self.steps.iter().find(|(h, _)| h.starts_with(heading_prefix)).map(|(_, o)| o)
    }
}

/// Runs a fixed list of operations against a store, one at a time.
#[derive(Debug, Clone)]
pub struct QueryRunner {
    script: Vec<Operation>,
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRunner {
    /// Runner for the bookstore script.
    #[must_use]
    pub fn new() -> Self {
        Self { script: bookstore_script() }
    }

    #[must_use]
    pub fn with_script(script: Vec<Operation>) -> Self {
        Self { script }
    }

    /// Executes every operation in order, writing each result to `out`.
    /// The first failure stops the run; no later step executes.
    ///
    /// # Errors
    /// Returns `QueryError::Step` wrapping the store error of the failing step,
    /// or an I/O error if `out` cannot be written.
    pub async fn run<S, W>(&self, store: &S, out: &mut W) -> Result<RunReport, QueryError>
    where
        S: BookStore + ?Sized,
        W: Write,
    {
        let total = self.script.len();
        let mut report = RunReport::default();
        for (i, op) in self.script.iter().enumerate() {
            let index = i + 1;
            log::info!("step {index}/{total}: {}", op.heading());
            let outcome = execute(store, op).await.map_err(|e| {
                log::error!("step {index}/{total} failed: {e}");
                QueryError::Step { index, step: op.heading().to_string(), source: Box::new(e) }
            })?;
            write_step(out, op.heading(), &outcome)?;
            report.steps.push((op.heading().to_string(), outcome));
        }
        Ok(report)
    }

    /// Runs the script and closes the store on every path. A run error takes
    /// precedence over a close error, which takes precedence over a failure to
    /// write the closing line.
    ///
    /// # Errors
    /// Returns the first step failure, else the close failure, else the write
    /// failure.
    pub async fn run_and_close<S, W>(&self, store: &S, out: &mut W) -> Result<RunReport, QueryError>
    where
        S: BookStore + ?Sized,
        W: Write,
    {
        let result = self.run(store, out).await;
        let closed = store.close().await;
        let written = writeln!(out, "\nConnection closed");
        match (result, closed, written) {
            (Err(e), closed, written) => {
                if let Err(close_err) = closed {
                    log::warn!("close after failed run also failed: {close_err}");
                }
                if let Err(io_err) = written {
                    log::warn!("could not report closed connection: {io_err}");
                }
                Err(e)
            }
            (Ok(_), Err(close_err), _) => Err(close_err),
            (Ok(_), Ok(()), Err(io_err)) => Err(io_err.into()),
            (Ok(report), Ok(()), Ok(())) => Ok(report),
        }
    }
}

async fn execute<S>(store: &S, op: &Operation) -> Result<Outcome, QueryError>
where
    S: BookStore + ?Sized,
{
    match op {
        Operation::Find { filter, options, .. } => {
            Ok(Outcome::Documents(store.find(filter, options).await?))
        }
        Operation::UpdateOne { filter, update, .. } => {
            let report = store.update_one(filter, update).await?;
            log::info!(
                target: AUDIT_TARGET,
                "update_one {} matched={} modified={}",
                filter.to_document(),
                report.matched,
                report.modified
            );
            let current = store.find_one(filter).await?;
            Ok(Outcome::Updated { report, current })
        }
        Operation::DeleteOne { filter, .. } => {
            let report = store.delete_one(filter).await?;
            log::info!(
                target: AUDIT_TARGET,
                "delete_one {} deleted={}",
                filter.to_document(),
                report.deleted
            );
            let remaining = store.find_one(filter).await?;
            Ok(Outcome::Deleted { report, remaining })
        }
        Operation::Aggregate { pipeline, .. } => {
            Ok(Outcome::Documents(store.aggregate(pipeline).await?))
        }
        Operation::CreateIndex { index, .. } => {
            let name = store.create_index(index).await?;
            log::info!(target: AUDIT_TARGET, "create_index {} -> {name}", index.to_document());
            if log::log_enabled!(log::Level::Debug) {
                match store.index_names().await {
                    Ok(names) => log::debug!("indexes now: {names:?}"),
                    Err(e) => log::debug!("could not list indexes: {e}"),
                }
            }
            Ok(Outcome::IndexReady(name))
        }
        Operation::Explain { filter, .. } => Ok(Outcome::Plan(store.explain(filter).await?)),
    }
}
