use bookstore_queries::config::{Backend, PartialConfig, RunnerConfig};
use bookstore_queries::errors::QueryError;
use bookstore_queries::logger;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bookstore-queries",
    version,
    about = "Run the bookstore query script against a MongoDB collection",
    long_about = None
)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). Defaults to ./bookstore.toml when present.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Connection string (default mongodb://localhost:27017)")]
    uri: Option<String>,
    #[arg(long, help = "Database name (default plp_bookstore)")]
    database: Option<String>,
    #[arg(long, help = "Collection name (default books)")]
    collection: Option<String>,
    #[arg(long, help = "Backend: mongo|memory")]
    backend: Option<Backend>,
    #[arg(long, help = "Books fixture (JSON array or NDJSON) for the memory backend")]
    fixture: Option<PathBuf>,
    #[arg(long, help = "Connect and server-selection timeout in milliseconds")]
    connect_timeout_ms: Option<u64>,
    #[arg(long, help = "Log level: error|warn|info|debug|trace")]
    log_level: Option<String>,
    #[arg(long, help = "Directory for rolling log files; stderr only when omitted")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn layer(&self) -> PartialConfig {
        PartialConfig {
            uri: self.uri.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            backend: self.backend,
            fixture: self.fixture.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

fn init_logging(cfg: &RunnerConfig) -> Result<(), QueryError> {
    match std::env::var_os("BOOKSTORE_LOG_CONFIG") {
        Some(path) => logger::init_path(&PathBuf::from(path)),
        None => logger::configure_logging(cfg.log_dir.as_deref(), &cfg.log_level),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match RunnerConfig::load(cli.config.as_deref(), cli.layer(), std::env::vars()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    };
    if let Err(e) = init_logging(&cfg) {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = bookstore_queries::run(&cfg, &mut out).await;
    let _ = out.flush();
    match result {
        Ok(report) => log::info!("completed {} steps", report.steps.len()),
        Err(e) => {
            eprintln!("Error running queries: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
