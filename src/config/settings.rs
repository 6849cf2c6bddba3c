//! Application settings loaded from `config.toml`.
//!
//! Every field has a default, so a missing file or an empty table yields a
//! working configuration. A handful of environment variables (usually set
//! through `.env`) override the file after it is parsed.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Listing settings
    pub catalog: CatalogConfig,
    /// Login session settings
    pub session: SessionConfig,
    /// Categories to create on start-up if they do not exist yet
    pub categories: Vec<CategorySeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Listing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Products per page on the home page
    pub home_page_size: u64,
    /// Products per page on category pages
    pub category_page_size: u64,
    /// Products per page on search results
    pub search_page_size: u64,
    /// Number of related products shown on a detail page
    pub related_limit: u64,
    /// Number of categories in the "top" list
    pub top_categories_limit: usize,
    /// Number of recent orders on the profile page
    pub profile_orders_limit: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            home_page_size: 8,
            category_page_size: 12,
            search_page_size: 12,
            related_limit: 4,
            top_categories_limit: 5,
            profile_orders_limit: 10,
        }
    }
}

/// Longest accepted session lifetime, ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Login session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a login stays valid, `1..=MAX_SESSION_TTL_HOURS`
    pub ttl_hours: i64,
}

impl SessionConfig {
    /// Rejects lifetimes outside `1..=MAX_SESSION_TTL_HOURS`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an out-of-range `ttl_hours`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.ttl_hours) {
            return Err(Error::Config {
                message: format!(
                    "session.ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
                    self.ttl_hours
                ),
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24 * 14,
        }
    }
}

/// A category to seed
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    /// Display name
    pub name: String,
    /// URL slug; derived from the name when omitted
    #[serde(default)]
    pub slug: Option<String>,
    /// Description text
    #[serde(default)]
    pub description: String,
}

/// Parses a configuration from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid, has wrongly typed fields
/// or holds an out-of-range session lifetime.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.session.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Applies `DATABASE_URL`, `STOREFRONT_HOST` and `STOREFRONT_PORT` on top of
/// the file values.
///
/// # Errors
/// Returns [`Error::Config`] if `STOREFRONT_PORT` is not a valid port number.
pub fn apply_env_overrides(mut config: AppConfig) -> Result<AppConfig> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(host) = std::env::var("STOREFRONT_HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("STOREFRONT_PORT") {
        config.server.port = port.parse().map_err(|e| Error::Config {
            message: format!("Invalid STOREFRONT_PORT '{port}': {e}"),
        })?;
    }
    Ok(config)
}

/// Loads `./config.toml` if present (defaults otherwise), then applies the
/// environment overrides.
///
/// # Errors
/// Returns an error if the file exists but is invalid, or an override is malformed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    let config = if path.exists() {
        load_config(path)?
    } else {
        warn!("config.toml not found, using built-in defaults.");
        AppConfig::default()
    };
    let config = apply_env_overrides(config)?;
    config.session.validate()?;
    info!(
        bind = %config.server.bind_address(),
        seeded_categories = config.categories.len(),
        "Application configuration loaded."
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [database]
            url = "sqlite::memory:"

            [catalog]
            home_page_size = 4

            [session]
            ttl_hours = 1

            [[categories]]
            name = "Books"
            description = "Paper and ink"

            [[categories]]
            name = "Garden Tools"
            slug = "garden"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.catalog.home_page_size, 4);
        // Unspecified fields keep their defaults
        assert_eq!(config.catalog.category_page_size, 12);
        assert_eq!(config.session.ttl_hours, 1);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].slug, None);
        assert_eq!(config.categories[1].slug.as_deref(), Some("garden"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.catalog.home_page_size, 8);
        assert_eq!(config.catalog.search_page_size, 12);
        assert_eq!(config.catalog.related_limit, 4);
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = parse_config("[server]\nport = \"eighty\"");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }

    #[test]
    fn test_session_ttl_is_bounded() {
        for bad in ["0", "-5", "9223372036854775807"] {
            let result = parse_config(&format!("[session]\nttl_hours = {bad}"));
            assert!(
                matches!(result, Err(Error::Config { message: _ })),
                "ttl_hours = {bad} should be rejected"
            );
        }

        let config = parse_config(&format!("[session]\nttl_hours = {MAX_SESSION_TTL_HOURS}")).unwrap();
        assert_eq!(config.session.ttl_hours, MAX_SESSION_TTL_HOURS);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
