/// Configuration management for the API server
///
/// Settings are read by [`shopfront_shared::config::EnvSettings`] and shaped
/// here into typed sections. See that module for the full list of variables
/// and their defaults.
///
/// # Required Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string
/// - `JWT_SECRET`: Secret key for token signing (at least 32 characters)
///
/// # Example
///
/// ```no_run
/// use shopfront_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use shopfront_shared::{
    config::EnvSettings,
    db::pool::DatabaseConfig as PoolConfig,
    storage::StorageConfig,
};

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Image upload configuration
    pub uploads: StorageConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode (affects logging format)
    pub production: bool,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in hours
    pub expiration_hours: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        let settings = EnvSettings::load()?;
        Self::from_settings(settings)
    }

    /// Builds the typed configuration from already-loaded settings
    pub fn from_settings(settings: EnvSettings) -> anyhow::Result<Self> {
        let jwt_secret = settings
            .jwt_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }

        if settings.jwt_expiration_hours <= 0 {
            anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
        }

        if settings.upload_max_files == 0 {
            anyhow::bail!("UPLOAD_MAX_FILES must be at least 1");
        }

        let mut uploads = StorageConfig::new(&settings.upload_dir);
        uploads.mirror_dir = settings.mirror_dir().map(Into::into);
        uploads.max_file_bytes = settings.upload_max_file_bytes;
        uploads.max_files = settings.upload_max_files;

        Ok(Self {
            api: ApiConfig {
                host: settings.api_host.clone(),
                port: settings.api_port,
                production: settings.api_production,
                cors_origins: settings.cors_origin_list(),
            },
            database: DatabaseConfig {
                url: settings.database_url,
                max_connections: settings.database_max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours: settings.jwt_expiration_hours,
            },
            uploads,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Connection pool settings derived from the database section
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }

    /// Upper bound for a whole multipart request body
    pub fn max_body_bytes(&self) -> usize {
        let per_file = usize::try_from(self.uploads.max_file_bytes).unwrap_or(usize::MAX);
        // Room for the text fields on top of the files
        per_file
            .saturating_mul(self.uploads.max_files)
            .saturating_add(1024 * 1024)
    }
}
