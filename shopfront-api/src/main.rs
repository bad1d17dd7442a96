//! # Shopfront API Server
//!
//! HTTP backend for the Shopfront catalogue: product CRUD with image
//! uploads, and customer registration/login with signed tokens.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... JWT_SECRET=... cargo run -p shopfront-api
//! ```

use shopfront_api::{
    app::{build_router, AppState},
    config::Config,
};
use shopfront_shared::{
    db::{migrations::run_migrations, pool},
    storage::{CleanupQueue, ImageStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.api.production);

    tracing::info!(
        "Shopfront API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let db = pool::create_pool(config.pool_config()).await?;
    run_migrations(&db).await?;

    let images = ImageStore::new(config.uploads.clone());
    images.ensure_dirs().await?;
    let report = images.sync_mirror().await?;
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "Some images could not be mirrored");
    }

    let (cleanup, cleanup_worker) = CleanupQueue::start(images.clone());

    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), config, images, cleanup);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it every queue sender) is gone; let the worker finish
    if let Err(e) = cleanup_worker.await {
        tracing::warn!(error = %e, "Image cleanup worker ended abnormally");
    }

    pool::close_pool(db).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing(production: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "shopfront_api=debug,shopfront_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
