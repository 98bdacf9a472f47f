use crate::state::AppState;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// ApiConfig is the CLI/env surface for the `litgraph-api` binary: every
/// external dependency is a flag with an `env` fallback, grouped by concern.
#[derive(Debug, clap::Parser)]
#[clap(author, version, about)]
pub struct ApiConfig {
    /// Postgres URL backing the task store.
    #[clap(long = "database", env = "DATABASE_URL")]
    pub database_url: String,
    /// Neo4j bolt URL backing the graph store.
    #[clap(long = "graph-uri", env = "GRAPH_URI", default_value = "bolt://127.0.0.1:7687")]
    pub graph_uri: String,
    #[clap(long = "graph-user", env = "GRAPH_USER", default_value = "neo4j")]
    pub graph_user: String,
    #[clap(long = "graph-password", env = "GRAPH_PASSWORD")]
    pub graph_password: String,
    #[clap(long = "graph-database", env = "GRAPH_DATABASE")]
    pub graph_database: Option<String>,

    /// Port the HTTP API listens on.
    #[clap(long, default_value = "8080", env = "API_PORT")]
    pub api_port: u16,
    /// Origins allowed in CORS contexts; may be specified multiple times.
    #[clap(long = "allow-origin")]
    pub allow_origin: Vec<String>,

    /// Whether this process also runs the task coordinator loop: a
    /// deployment can run API-only front ends and dedicated task-serving
    /// instances from the same binary.
    #[clap(long = "serve-tasks", env = "SERVE_TASKS", default_value = "true")]
    pub serve_tasks: bool,
    #[clap(long = "worker-permits", env = "WORKER_PERMITS", default_value = "8")]
    pub worker_permits: u32,

    /// Bound on `by_identifier`'s blocking wait for task completion, in seconds.
    #[clap(long = "by-identifier-wait-secs", env = "BY_IDENTIFIER_WAIT_SECS", default_value = "60")]
    pub by_identifier_wait_secs: u64,

    #[clap(long = "crossref-mailto", env = "CROSSREF_MAILTO")]
    pub crossref_mailto: Option<String>,
    #[clap(long = "semantic-scholar-api-key", env = "SEMANTIC_SCHOLAR_API_KEY")]
    pub semantic_scholar_api_key: Option<String>,
    #[clap(long = "pdf-parser-endpoint", env = "PDF_PARSER_ENDPOINT", default_value = "http://127.0.0.1:8070/api/processHeaderDocument")]
    pub pdf_parser_endpoint: url::Url,
    #[clap(long = "unpaywall-email", env = "UNPAYWALL_EMAIL", default_value = "ingest@litgraph.dev")]
    pub unpaywall_email: String,
    #[clap(long = "metadata-confidence-threshold", env = "METADATA_CONFIDENCE_THRESHOLD", default_value = "0.5")]
    pub metadata_confidence_threshold: f32,

    #[clap(flatten)]
    pub log: LogArgs,
}

/// Structured logging configuration: level plus an explicit format switch
/// rather than inferring from env alone.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    #[clap(long = "log.level", env = "LOG_LEVEL", default_value = "info")]
    pub level: String,
    #[clap(long = "log.format", env = "LOG_FORMAT", default_value = "auto")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogFormat {
    Auto,
    Json,
    Text,
}

pub fn init_tracing(log: &LogArgs) {
    let filter = tracing_subscriber::EnvFilter::try_new(&log.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let use_json = match log.format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !atty_is_terminal(),
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if use_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn atty_is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

/// Connects every external dependency and assembles `AppState`, doing all
/// fallible connection setup before the listener ever binds.
pub async fn build_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    let pg_pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("../../migrations").run(&pg_pool).await.context("running database migrations")?;

    let graph = Arc::new(
        graph_store::GraphStore::connect(graph_store::GraphStoreConfig {
            uri: config.graph_uri.clone(),
            user: config.graph_user.clone(),
            password: config.graph_password.clone(),
            database: config.graph_database.clone(),
        })
        .await
        .context("connecting to graph store")?,
    );
    graph.ensure_indexes().await.context("ensuring graph indexes")?;

    let tasks: Arc<dyn task_engine::TaskStore> = Arc::new(task_engine::PgTaskStore::new(pg_pool));
    let events = Arc::new(task_engine::EventBus::new());
    let dedup = Arc::new(dedup::DedupEngine::new(graph.clone(), tasks.clone()));

    Ok(AppState {
        graph,
        tasks,
        events,
        dedup,
        config: Arc::new(clone_config(config)),
    })
}

/// `ApiConfig` is not `Clone` (it's a one-shot CLI parse result with a
/// `url::Url` and a few owned strings); this copies only the fields routes
/// actually read at request time.
fn clone_config(config: &ApiConfig) -> ApiConfig {
    ApiConfig {
        database_url: config.database_url.clone(),
        graph_uri: config.graph_uri.clone(),
        graph_user: config.graph_user.clone(),
        graph_password: config.graph_password.clone(),
        graph_database: config.graph_database.clone(),
        api_port: config.api_port,
        allow_origin: config.allow_origin.clone(),
        serve_tasks: config.serve_tasks,
        worker_permits: config.worker_permits,
        by_identifier_wait_secs: config.by_identifier_wait_secs,
        crossref_mailto: config.crossref_mailto.clone(),
        semantic_scholar_api_key: config.semantic_scholar_api_key.clone(),
        pdf_parser_endpoint: config.pdf_parser_endpoint.clone(),
        unpaywall_email: config.unpaywall_email.clone(),
        metadata_confidence_threshold: config.metadata_confidence_threshold,
        log: config.log.clone(),
    }
}

pub fn ingest_executor_config(config: &ApiConfig) -> ingest::IngestExecutorConfig {
    ingest::IngestExecutorConfig {
        crossref_mailto: config.crossref_mailto.clone(),
        semantic_scholar_api_key: config.semantic_scholar_api_key.clone(),
        pdf_parser_endpoint: config.pdf_parser_endpoint.clone(),
        unpaywall_email: config.unpaywall_email.clone(),
        metadata_confidence_threshold: config.metadata_confidence_threshold,
    }
}
