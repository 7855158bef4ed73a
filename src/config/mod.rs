//! Configuration management
//!
//! Configuration is read from `config.yml` and may be overridden by
//! `POSTBOARD_*` environment variables. Every value is optional; anything
//! missing falls back to a default suitable for local development.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "POSTBOARD";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the browser client, sends cookies)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Externally visible base URL, used to build OAuth redirect URIs
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Connection URL, or a file path for SQLite
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/postboard.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Session cookie configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
    /// Add the `Secure` attribute to session cookies (enable behind HTTPS)
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            cookie_secure: false,
        }
    }
}

fn default_session_ttl_days() -> i64 {
    30
}

impl SessionConfig {
    /// Session lifetime in seconds, as used for the cookie `Max-Age`
    pub fn max_age_seconds(&self) -> i64 {
        self.ttl_days * 24 * 60 * 60
    }
}

/// OAuth sign-in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Google client credentials; Google sign-in is disabled when absent
    #[serde(default)]
    pub google: Option<OAuthClientConfig>,
    /// Where the browser is sent after a successful OAuth sign-in
    #[serde(default = "default_redirect_after_login")]
    pub redirect_after_login: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            google: None,
            redirect_after_login: default_redirect_after_login(),
        }
    }
}

fn default_redirect_after_login() -> String {
    "http://localhost:3000/".to_string()
}

/// Client credentials registered with an OAuth provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Image upload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// File extension used when storing an upload of the given MIME type
    pub fn extension_for(mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing or empty file yields the defaults; a malformed file is an
    /// error carrying the offending line and column.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file, then apply `POSTBOARD_*` overrides.
    ///
    /// Recognised variables:
    /// - `POSTBOARD_SERVER_HOST`, `POSTBOARD_SERVER_PORT`,
    ///   `POSTBOARD_SERVER_CORS_ORIGIN`, `POSTBOARD_SERVER_PUBLIC_URL`
    /// - `POSTBOARD_DATABASE_DRIVER`, `POSTBOARD_DATABASE_URL`
    /// - `POSTBOARD_SESSION_TTL_DAYS`, `POSTBOARD_SESSION_COOKIE_SECURE`
    /// - `POSTBOARD_OAUTH_GOOGLE_CLIENT_ID`, `POSTBOARD_OAUTH_GOOGLE_CLIENT_SECRET`,
    ///   `POSTBOARD_OAUTH_REDIRECT_AFTER_LOGIN`
    /// - `POSTBOARD_UPLOAD_PATH`, `POSTBOARD_UPLOAD_MAX_FILE_SIZE`
    ///
    /// Values that fail to parse are ignored.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_var("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origin) = env_var("SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(url) = env_var("SERVER_PUBLIC_URL") {
            self.server.public_url = url;
        }

        if let Some(driver) = env_var("DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Some(url) = env_var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(days) = env_var("SESSION_TTL_DAYS").and_then(|v| v.parse::<i64>().ok()) {
            if days > 0 {
                self.session.ttl_days = days;
            }
        }
        if let Some(secure) = env_var("SESSION_COOKIE_SECURE").and_then(|v| v.parse().ok()) {
            self.session.cookie_secure = secure;
        }

        if let Some(id) = env_var("OAUTH_GOOGLE_CLIENT_ID") {
            self.oauth.google.get_or_insert_with(Default::default).client_id = id;
        }
        if let Some(secret) = env_var("OAUTH_GOOGLE_CLIENT_SECRET") {
            self.oauth.google.get_or_insert_with(Default::default).client_secret = secret;
        }
        if let Some(url) = env_var("OAUTH_REDIRECT_AFTER_LOGIN") {
            self.oauth.redirect_after_login = url;
        }

        if let Some(path) = env_var("UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Some(size) = env_var("UPLOAD_MAX_FILE_SIZE").and_then(|v| v.parse().ok()) {
            self.upload.max_file_size = size;
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, key)).ok()
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    match e.location() {
        Some(location) => format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        ),
        None => e.to_string(),
    }
}

// Shared by every test that touches the process environment.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            "host-[a-z0-9]{1,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            "data/[a-z0-9_]{1,20}\\.db",
            1i64..365,
            any::<bool>(),
            prop::option::of(("id-[a-z0-9]{1,20}", "sec[A-Za-z0-9]{1,20}")),
        )
            .prop_map(|(host, port, driver, url, ttl_days, secure, google)| Config {
                server: ServerConfig {
                    host,
                    port,
                    ..ServerConfig::default()
                },
                database: DatabaseConfig { driver, url },
                session: SessionConfig {
                    ttl_days,
                    cookie_secure: secure,
                },
                oauth: OAuthConfig {
                    google: google.map(|(client_id, client_secret)| OAuthClientConfig {
                        client_id,
                        client_secret,
                    }),
                    ..OAuthConfig::default()
                },
                upload: UploadConfig::default(),
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn config_survives_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(&mut file, yaml.as_bytes()).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded, config);
        }

        #[test]
        fn single_section_fills_remaining_defaults(port in 1u16..=65535) {
            let yaml = format!("server:\n  port: {}\n", port);
            let config: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(config.server.port, port);
            prop_assert_eq!(config.database, DatabaseConfig::default());
            prop_assert_eq!(config.session, SessionConfig::default());
            prop_assert_eq!(config.oauth, OAuthConfig::default());
        }
    }
}
