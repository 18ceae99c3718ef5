use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};

use schoolhub::logging::{init_tracing, shutdown_tracer};
use schoolhub::metrics::{init_metrics, metrics_app};
use schoolhub::router::init_router;
use schoolhub::scheduler::Scheduler;
use schoolhub::state::init_app_state;

fn env_port(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn shutdown_signal(tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    let _ = tx.send(true);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = schoolhub_db::init_db_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    schoolhub_db::run_migrations(&db)
        .await
        .context("Failed to run migrations")?;

    let state = init_app_state(db.clone())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let jobs = Scheduler::new(db, state.scheduler_config.clone()).start(shutdown_rx.clone());

    if let Some(handle) = init_metrics()? {
        let metrics_port = env_port("METRICS_PORT", 9000);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", metrics_port)).await?;
        info!(port = metrics_port, "Metrics listening on /metrics");
        let mut metrics_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let served = axum::serve(listener, metrics_app(handle))
                .with_graceful_shutdown(async move {
                    let _ = metrics_shutdown.changed().await;
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let port = env_port("PORT", 3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "Server running; docs at /swagger-ui and /scalar");

    axum::serve(
        listener,
        init_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await?;

    for job in jobs {
        let _ = job.await;
    }
    shutdown_tracer();
    Ok(())
}
