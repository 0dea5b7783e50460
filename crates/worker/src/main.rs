use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotline_worker::booking::StubBookingClient;
use slotline_worker::config::WorkerConfig;
use slotline_worker::cycle::QueueDispatcher;
use slotline_worker::pg_store::PgDispatchStore;
use slotline_worker::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotline_worker=info,slotline_db=info".into()),
        )
        .with(json_layer)
        .with(text_layer)
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        run_once = config.run_once,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = slotline_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    slotline_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    slotline_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let dispatcher = Arc::new(QueueDispatcher::new(
        Arc::new(PgDispatchStore::new(pool.clone())),
        Arc::new(StubBookingClient),
        config.dispatch.clone(),
    ));

    if config.run_once {
        dispatcher.run_cycle(Utc::now()).await?;
        pool.close().await;
        return Ok(());
    }

    // --- Scheduler ---
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scheduler::run(
        Arc::clone(&dispatcher),
        config.interval,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    handle.await.context("Scheduler task panicked")?;

    pool.close().await;
    tracing::info!("Worker stopped");
    Ok(())
}
