//! # Shopfront Janitor
//!
//! Removes uploaded product images that no product references any more:
//! leftovers from interrupted requests, or files whose cleanup was lost when
//! the API server stopped.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p shopfront-janitor            # sweep every JANITOR_INTERVAL_SECS
//! cargo run -p shopfront-janitor -- --once  # single sweep, then exit
//! ```

use clap::Parser;
use shopfront_janitor::{
    cli::Cli,
    sweeper::{JanitorConfig, OrphanSweeper},
};
use shopfront_shared::{
    config::EnvSettings,
    db::pool::{self, DatabaseConfig},
    storage::{ImageStore, StorageConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront_janitor=debug,shopfront_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Shopfront Janitor v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let settings = EnvSettings::load()?;

    let db = pool::create_pool(DatabaseConfig {
        url: settings.database_url.clone(),
        max_connections: 2,
        ..Default::default()
    })
    .await?;

    let mut storage = StorageConfig::new(&settings.upload_dir);
    storage.mirror_dir = settings.mirror_dir().map(Into::into);
    let images = ImageStore::new(storage);

    let sweeper = OrphanSweeper::new(db.clone(), images, JanitorConfig::from_settings(&settings));

    if cli.once {
        let report = sweeper.sweep_once().await?;
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Single sweep finished"
        );
    } else {
        let shutdown = sweeper.shutdown_token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    return;
                }
            }
            shutdown.cancel();
        });

        sweeper.run().await?;
    }

    pool::close_pool(db).await;

    Ok(())
}
