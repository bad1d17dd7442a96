/// Environment-backed settings shared by the API server and the janitor
///
/// Values come from the process environment (after loading `.env` with
/// `dotenvy`), read through the `config` crate with defaults applied. Each
/// binary shapes the flat [`EnvSettings`] into its own typed configuration.
///
/// # Environment Variables
///
/// | Variable                   | Default                                          |
/// |----------------------------|--------------------------------------------------|
/// | `DATABASE_URL`             | required                                         |
/// | `DATABASE_MAX_CONNECTIONS` | `10`                                             |
/// | `JWT_SECRET`               | required by the API                              |
/// | `JWT_EXPIRATION_HOURS`     | `24`                                             |
/// | `API_HOST`                 | `0.0.0.0`                                        |
/// | `API_PORT`                 | `3000`                                           |
/// | `API_PRODUCTION`           | `false`                                          |
/// | `CORS_ORIGINS`             | `http://localhost:5173,http://localhost:5174`    |
/// | `UPLOAD_DIR`               | `uploads`                                        |
/// | `UPLOAD_MIRROR_DIR`        | unset                                            |
/// | `UPLOAD_MAX_FILE_BYTES`    | `20971520` (20 MB)                               |
/// | `UPLOAD_MAX_FILES`         | `10`                                             |
/// | `JANITOR_INTERVAL_SECS`    | `3600`                                           |
/// | `JANITOR_GRACE_SECS`       | `600`                                            |

use serde::Deserialize;

/// Default maximum size of one uploaded image
pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// Flat view of every recognised environment variable
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSettings {
    pub database_url: String,
    pub database_max_connections: u32,

    #[serde(default)]
    pub jwt_secret: Option<String>,
    pub jwt_expiration_hours: i64,

    pub api_host: String,
    pub api_port: u16,
    pub api_production: bool,
    pub cors_origins: String,

    pub upload_dir: String,
    #[serde(default)]
    pub upload_mirror_dir: Option<String>,
    pub upload_max_file_bytes: u64,
    pub upload_max_files: usize,

    pub janitor_interval_secs: u64,
    pub janitor_grace_secs: u64,
}

impl EnvSettings {
    /// Loads `.env` (if present) and the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its field type.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let settings = Self::from_source(config::Environment::default().try_parsing(true))?;

        Ok(settings.with_raw_secret(std::env::var("JWT_SECRET").ok()))
    }

    /// Replaces the JWT secret with the unparsed environment value
    ///
    /// `try_parsing` turns an all-digit secret into a float and drops
    /// precision, so the secret is always taken verbatim when present.
    pub fn with_raw_secret(mut self, raw: Option<String>) -> Self {
        if let Some(secret) = raw {
            self.jwt_secret = Some(secret);
        }
        self
    }

    /// Builds settings from an explicit `config` source
    ///
    /// Used by [`EnvSettings::load`] and by tests that cannot touch the real
    /// process environment.
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("database_max_connections", 10)?
            .set_default("jwt_expiration_hours", crate::auth::jwt::DEFAULT_TOKEN_LIFETIME_HOURS)?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 3000)?
            .set_default("api_production", false)?
            .set_default("cors_origins", "http://localhost:5173,http://localhost:5174")?
            .set_default("upload_dir", "uploads")?
            .set_default("upload_max_file_bytes", DEFAULT_MAX_FILE_BYTES)?
            .set_default("upload_max_files", 10)?
            .set_default("janitor_interval_secs", 3600)?
            .set_default("janitor_grace_secs", 600)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Mirror directory, treating an empty value as unset
    pub fn mirror_dir(&self) -> Option<&str> {
        self.upload_mirror_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
    }

    /// CORS origins split on commas
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<EnvSettings, config::ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        EnvSettings::from_source(
            config::Environment::default()
                .try_parsing(true)
                .source(Some(source)),
        )
    }

    #[test]
    fn test_defaults_applied() {
        let settings = settings_from(&[("DATABASE_URL", "postgresql://localhost/shop")]).unwrap();

        assert_eq!(settings.database_url, "postgresql://localhost/shop");
        assert_eq!(settings.database_max_connections, 10);
        assert_eq!(settings.api_port, 3000);
        assert_eq!(settings.jwt_expiration_hours, 24);
        assert_eq!(settings.upload_max_file_bytes, 20 * 1024 * 1024);
        assert_eq!(settings.upload_dir, "uploads");
        assert!(settings.jwt_secret.is_none());
        assert!(settings.mirror_dir().is_none());
        assert!(!settings.api_production);
    }

    #[test]
    fn test_overrides_parsed() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://localhost/shop"),
            ("API_PORT", "8081"),
            ("API_PRODUCTION", "true"),
            ("UPLOAD_MIRROR_DIR", "/srv/mirror"),
            ("UPLOAD_MAX_FILES", "3"),
        ])
        .unwrap();

        assert_eq!(settings.api_port, 8081);
        assert!(settings.api_production);
        assert_eq!(settings.mirror_dir(), Some("/srv/mirror"));
        assert_eq!(settings.upload_max_files, 3);
    }

    #[test]
    fn test_missing_database_url_fails() {
        assert!(settings_from(&[]).is_err());
    }

    #[test]
    fn test_blank_mirror_dir_is_unset() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://localhost/shop"),
            ("UPLOAD_MIRROR_DIR", "  "),
        ])
        .unwrap();

        assert!(settings.mirror_dir().is_none());
    }

    #[test]
    fn test_numeric_jwt_secret_kept_verbatim() {
        let secret = "1234567890123456789012345678901234567890";
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://localhost/shop"),
            ("JWT_SECRET", secret),
        ])
        .unwrap()
        .with_raw_secret(Some(secret.to_string()));

        assert_eq!(settings.jwt_secret.as_deref(), Some(secret));
    }

    #[test]
    fn test_raw_secret_absent_keeps_configured_value() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://localhost/shop"),
            ("JWT_SECRET", "a-secret-of-at-least-32-bytes-long!!"),
        ])
        .unwrap()
        .with_raw_secret(None);

        assert_eq!(
            settings.jwt_secret.as_deref(),
            Some("a-secret-of-at-least-32-bytes-long!!")
        );
    }

    #[test]
    fn test_cors_origin_list() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgresql://localhost/shop"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ])
        .unwrap();

        assert_eq!(settings.cors_origin_list(), vec!["http://a.test", "http://b.test"]);
    }
}
