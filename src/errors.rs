use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("MongoDB: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Operation rejected: {0}")]
    Operation(String),

    #[error("step {index} ({step}) failed: {source}")]
    Step {
        index: usize,
        step: String,
        #[source]
        source: Box<QueryError>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON decode: {0}")]
    BsonDe(#[from] bson::de::Error),

    #[error("BSON encode: {0}")]
    BsonSer(#[from] bson::ser::Error),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl From<std::io::Error> for QueryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl QueryError {
    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Logging(_) => 2,
            _ => 1,
        }
    }

    /// Innermost error, unwrapping step context.
    #[must_use]
    pub fn root(&self) -> &QueryError {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}
