mod dto;
mod error;
mod routes;
mod startup;
mod state;

use clap::Parser;
use startup::ApiConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install default crypto provider");

    let config = ApiConfig::parse();
    startup::init_tracing(&config.log);
    tracing::info!(
        port = config.api_port,
        graph_uri = %config.graph_uri,
        serve_tasks = config.serve_tasks,
        "starting litgraph-api"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main(config))
}

async fn async_main(config: ApiConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.api_port)).await?;
    let state = startup::build_state(&config).await?;

    let cors = if config.allow_origin.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = config
            .allow_origin
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let app = routes::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let broker = Arc::new(broker::RequestBroker::new(broker::BrokerConfig::default())?);
    let worker_handle = if config.serve_tasks {
        let executor = ingest::IngestExecutor::new(
            broker,
            state.graph.clone(),
            state.tasks.clone(),
            startup::ingest_executor_config(&config),
        );
        let server = task_engine::Server::new(
            executor,
            state.tasks.clone(),
            state.events.clone(),
            task_engine::ServerConfig { permits: config.worker_permits, dequeue_interval: Duration::from_secs(2) },
        );
        Some(tokio::spawn(server.serve(shutdown_signal())))
    } else {
        None
    };

    tracing::info!(port = config.api_port, serve_tasks = config.serve_tasks, "litgraph-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
