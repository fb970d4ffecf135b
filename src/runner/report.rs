use bson::{Bson, Document as BsonDocument};
use std::io::Write;

use crate::errors::QueryError;
use crate::query::{DeleteReport, UpdateReport};

/// Result of one executed operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Documents(Vec<BsonDocument>),
    Updated { report: UpdateReport, current: Option<BsonDocument> },
    Deleted { report: DeleteReport, remaining: Option<BsonDocument> },
    IndexReady(String),
    Plan(BsonDocument),
}

impl Outcome {
    #[must_use]
    pub fn documents(&self) -> &[BsonDocument] {
        match self {
            Self::Documents(d) => d,
            _ => &[],
        }
    }
}

fn to_json(doc: Option<&BsonDocument>) -> Result<String, QueryError> {
    let v = match doc {
        Some(d) => Bson::Document(d.clone()).into_relaxed_extjson(),
        None => serde_json::Value::Null,
    };
    Ok(serde_json::to_string_pretty(&v)?)
}

fn to_json_array(docs: &[BsonDocument]) -> Result<String, QueryError> {
    let arr: Vec<serde_json::Value> =
        docs.iter().map(|d| Bson::Document(d.clone()).into_relaxed_extjson()).collect();
    Ok(serde_json::to_string_pretty(&arr)?)
}

/// Writes a step as a blank line, its heading, then its result.
///
/// # Errors
/// Returns an error if the output cannot be written.
pub fn write_step<W: Write>(out: &mut W, heading: &str, outcome: &Outcome) -> Result<(), QueryError> {
    writeln!(out)?;
    match outcome {
        Outcome::Documents(docs) => {
            writeln!(out, "{heading}")?;
            writeln!(out, "{}", to_json_array(docs)?)?;
        }
        Outcome::Updated { current, .. } => {
            writeln!(out, "{heading}")?;
            writeln!(out, "Updated book: {}", to_json(current.as_ref())?)?;
        }
        Outcome::Deleted { remaining, .. } => {
            writeln!(out, "{heading}")?;
            writeln!(out, "Deleted. Checking: {}", to_json(remaining.as_ref())?)?;
        }
        Outcome::IndexReady(name) => {
            writeln!(out, "{heading}")?;
            writeln!(out, "Index ready: {name}")?;
        }
        Outcome::Plan(plan) => {
            writeln!(out, "{heading}")?;
            writeln!(out, "{}", to_json(Some(plan))?)?;
        }
    }
    Ok(())
}
