/// Embedded schema migrations
///
/// The SQL files under `shopfront-shared/migrations/` are compiled into the
/// binary with `sqlx::migrate!` and applied at start-up by the API server
/// (and by the integration tests). Applying them twice is a no-op.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies every pending migration
///
/// # Errors
///
/// Returns the first migration failure; the failing migration is rolled back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}
