use postwatch_ingest::{PgIngestStore, PlatformClient, PreviewFetcher, ScheduleConfig, Scheduler};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = postwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, "starting postwatch worker");

    let pool_config = postwatch_db::PoolConfig::from_app_config(&config);
    let pool = postwatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = postwatch_db::run_migrations(&pool).await?;
    postwatch_db::ping(&pool).await?;
    tracing::info!(applied, "database ready");

    let client = PlatformClient::from_app_config(&config)?;
    let preview = PreviewFetcher::from_app_config(&config)?;
    let store = PgIngestStore::new(pool.clone());
    let scheduler = Scheduler::new(
        client,
        preview,
        store,
        ScheduleConfig::from_app_config(&config),
    );

    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    shutdown_signal().await;
    cancel.cancel();
    task.await?;

    pool.close().await;
    tracing::info!("postwatch worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, cancelling ingestion");
}
