use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use futures::FutureExt;

/// authz-server hosts the relationship-based authorization JSON RPC surface
/// over a single Postgres-backed store.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// URL of the postgres database.
    #[clap(long = "database", env = "DATABASE_URL")]
    database_url: String,
    /// The port to listen on for API requests.
    #[clap(long, default_value = "8080", env = "API_PORT")]
    api_port: u16,
    /// Per-operation storage acquire timeout, in milliseconds.
    #[clap(long, default_value = "1000", env = "STORAGE_TIMEOUT_MS")]
    storage_timeout_ms: u64,
    /// Default check/create cost budget when a caller doesn't supply one.
    #[clap(long, default_value = "1000", env = "DEFAULT_COST_LIMIT")]
    default_cost_limit: u16,
    /// Upper bound on a caller-supplied listing page size.
    #[clap(long, default_value = "30", env = "PAGINATION_LIMIT_MAX")]
    pagination_limit_max: u16,
}

fn main() -> Result<(), anyhow::Error> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(api_port = args.api_port, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> Result<(), anyhow::Error> {
    let api_listener = tokio::net::TcpListener::bind(format!("[::]:{}", args.api_port))
        .await
        .context("failed to bind server port")?;

    let storage_config = authz_storage::Config::new(args.database_url)
        .with_acquire_timeout(Duration::from_millis(args.storage_timeout_ms));
    let storage = authz_storage::Storage::connect(&storage_config)
        .await
        .context("failed to connect to storage")?;

    let state = authz_api::AppState::new(storage, args.default_cost_limit, args.pagination_limit_max);
    let router = authz_api::build_router(state);

    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();
    axum::serve(api_listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("api server failed")?;

    Ok(())
}
