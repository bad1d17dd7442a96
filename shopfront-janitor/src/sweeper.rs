/// Orphaned image sweeper
///
/// Periodically compares the files in the upload directories with the image
/// paths referenced by products and deletes files nothing points to. Files
/// younger than the grace period are kept: a create request writes its files
/// before inserting the row that references them.
///
/// # Architecture
///
/// ```text
/// OrphanSweeper (every interval)
///   ├─> Product::referenced_images: live paths
///   ├─> ImageStore::list_files: primary + mirror
///   ├─> select_orphans: unreferenced and older than the grace period
///   └─> ImageStore::remove_file
/// ```
///
/// # Example
///
/// ```no_run
/// use shopfront_janitor::sweeper::{JanitorConfig, OrphanSweeper};
/// use shopfront_shared::storage::{ImageStore, StorageConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let images = ImageStore::new(StorageConfig::new("uploads"));
/// let sweeper = OrphanSweeper::new(pool, images, JanitorConfig::default());
///
/// let report = sweeper.sweep_once().await?;
/// println!("removed {} orphaned files", report.removed);
/// # Ok(())
/// # }
/// ```

use shopfront_shared::{
    config::EnvSettings,
    models::product::Product,
    storage::{ImageStore, StorageError},
};
use sqlx::PgPool;
use std::{
    collections::{HashMap, HashSet},
    time::{Duration, SystemTime},
};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Janitor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Time between sweeps
    pub interval: Duration,

    /// Minimum age of a file before it may be removed
    pub grace: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        JanitorConfig {
            interval: Duration::from_secs(3600),
            grace: Duration::from_secs(600),
        }
    }
}

impl JanitorConfig {
    pub fn from_settings(settings: &EnvSettings) -> Self {
        JanitorConfig {
            interval: Duration::from_secs(settings.janitor_interval_secs.max(1)),
            grace: Duration::from_secs(settings.janitor_grace_secs),
        }
    }
}

/// Error type for a single sweep
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Failed to load referenced images: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to list upload directories: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Distinct file names found across the upload directories
    pub scanned: usize,

    /// Orphans deleted
    pub removed: usize,

    /// Orphans that could not be deleted
    pub failed: usize,
}

/// Removes upload files that no product references
pub struct OrphanSweeper {
    db: PgPool,
    images: ImageStore,
    config: JanitorConfig,
    shutdown_token: CancellationToken,
}

impl OrphanSweeper {
    pub fn new(db: PgPool, images: ImageStore, config: JanitorConfig) -> Self {
        OrphanSweeper {
            db,
            images,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs one sweep against the current database state
    pub async fn sweep_once(&self) -> Result<SweepReport, SweepError> {
        let referenced: HashSet<String> = Product::referenced_images(&self.db)
            .await?
            .iter()
            .filter_map(|url| self.images.file_name_from_url(url))
            .map(str::to_string)
            .collect();

        let report =
            sweep_unreferenced(&self.images, &referenced, self.config.grace, SystemTime::now())
                .await?;

        Ok(report)
    }

    /// Sweeps every interval until shutdown
    ///
    /// The first sweep runs immediately. A failed sweep is logged and
    /// retried at the next tick.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            grace_secs = self.config.grace.as_secs(),
            "Orphan sweeper starting"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Orphan sweeper shut down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) => tracing::info!(
                            scanned = report.scanned,
                            removed = report.removed,
                            failed = report.failed,
                            "Sweep finished"
                        ),
                        Err(e) => tracing::error!(error = %e, "Sweep failed"),
                    }
                }
            }
        }

        Ok(())
    }
}

/// Deletes listed files that are unreferenced and older than `grace`
pub async fn sweep_unreferenced(
    images: &ImageStore,
    referenced: &HashSet<String>,
    grace: Duration,
    now: SystemTime,
) -> Result<SweepReport, StorageError> {
    let files = images.list_files().await?;
    let orphans = select_orphans(&files, referenced, grace, now);

    let mut report = SweepReport {
        scanned: files.len(),
        ..Default::default()
    };

    for file_name in orphans {
        if images.remove_file(&file_name).await {
            tracing::debug!(file = %file_name, "Removed orphaned image");
            report.removed += 1;
        } else {
            report.failed += 1;
        }
    }

    Ok(report)
}

/// Picks the files that are safe to delete
///
/// A file modified in the future (clock skew) counts as fresh.
pub fn select_orphans(
    files: &HashMap<String, SystemTime>,
    referenced: &HashSet<String>,
    grace: Duration,
    now: SystemTime,
) -> Vec<String> {
    let mut orphans: Vec<String> = files
        .iter()
        .filter(|(name, _)| !referenced.contains(*name))
        .filter(|(_, modified)| {
            now.duration_since(**modified)
                .map(|age| age >= grace)
                .unwrap_or(false)
        })
        .map(|(name, _)| name.clone())
        .collect();

    orphans.sort();
    orphans
}
