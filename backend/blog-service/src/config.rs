/// Configuration management for blog-service
///
/// Configuration is read once from environment variables at startup and then
/// injected into handlers through `AppState`; nothing reads the environment
/// after that.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Persistence settings
    pub database: DatabaseConfig,
    /// Listing settings
    pub pagination: PaginationConfig,
    /// Rendered page cache settings
    pub cache: CacheConfig,
    /// Session token and login redirect settings
    pub auth: AuthConfig,
    /// Uploaded image storage
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// HTTP worker count
    pub workers: usize,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Items on every list page
    pub per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached index page
    pub page_ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret used to sign and verify session tokens
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    /// Cookie carrying the session token for browser clients
    pub session_cookie: String,
    /// Where anonymous requesters are sent, with `?next=`
    pub login_url: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("session_cookie", &self.session_cookie)
            .field("login_url", &self.login_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Filesystem root for uploaded images
    pub root: String,
    /// Public URL prefix images are served under
    pub url: String,
}

const DEV_JWT_SECRET: &str = "development-only-secret";

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                env: "development".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: 4,
                json_logs: false,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: "postgresql://localhost/yatube".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 10,
            },
            pagination: PaginationConfig { per_page: 10 },
            cache: CacheConfig {
                page_ttl_secs: 20,
                max_entries: 1_000,
            },
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                session_ttl_hours: 24 * 14,
                session_cookie: "sessionid".to_string(),
                login_url: "/auth/login/".to_string(),
            },
            media: MediaConfig {
                root: "media".to_string(),
                url: "/media/".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| defaults.app.env.clone());
        let production = app_env.eq_ignore_ascii_case("production");

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if production => return Err("JWT_SECRET must be set in production".to_string()),
            _ => defaults.auth.jwt_secret.clone(),
        };
        if production && jwt_secret == DEV_JWT_SECRET {
            return Err("JWT_SECRET cannot use the development default in production".to_string());
        }

        let per_page: usize = parse_env_or_default("PER_PAGE", defaults.pagination.per_page)?;
        if per_page == 0 {
            return Err("PER_PAGE must be greater than zero".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or(defaults.app.host),
                port: parse_env_or_default("BLOG_SERVICE_PORT", defaults.app.port)?,
                workers: parse_env_or_default("BLOG_SERVICE_WORKERS", defaults.app.workers)?,
                json_logs: std::env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            database: DatabaseConfig {
                backend: match std::env::var("STORAGE_BACKEND") {
                    Ok(value) => value.parse()?,
                    Err(_) => defaults.database.backend,
                },
                url: std::env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_env_or_default(
                    "DB_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                min_connections: parse_env_or_default(
                    "DB_MIN_CONNECTIONS",
                    defaults.database.min_connections,
                )?,
                acquire_timeout_secs: parse_env_or_default(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.database.acquire_timeout_secs,
                )?,
            },
            pagination: PaginationConfig { per_page },
            cache: CacheConfig {
                page_ttl_secs: parse_env_or_default(
                    "PAGE_CACHE_TTL_SECS",
                    defaults.cache.page_ttl_secs,
                )?,
                max_entries: parse_env_or_default(
                    "PAGE_CACHE_MAX_ENTRIES",
                    defaults.cache.max_entries,
                )?,
            },
            auth: AuthConfig {
                jwt_secret,
                session_ttl_hours: parse_env_or_default(
                    "SESSION_TTL_HOURS",
                    defaults.auth.session_ttl_hours,
                )?,
                session_cookie: std::env::var("SESSION_COOKIE_NAME")
                    .unwrap_or(defaults.auth.session_cookie),
                login_url: std::env::var("LOGIN_URL").unwrap_or(defaults.auth.login_url),
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT").unwrap_or(defaults.media.root),
                url: std::env::var("MEDIA_URL").unwrap_or(defaults.media.url),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.pagination.per_page, 10);
        assert_eq!(cfg.cache.page_ttl_secs, 20);
        assert_eq!(cfg.cache.max_entries, 1_000);
        assert_eq!(cfg.auth.login_url, "/auth/login/");
        assert_eq!(cfg.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(
            " PostgreSQL ".parse::<StorageBackend>(),
            Ok(StorageBackend::Postgres)
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let value: usize = parse_env_or_default("BLOG_SERVICE_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let cfg = Config::default();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains(DEV_JWT_SECRET));
        assert!(!rendered.contains("postgresql://"));
    }
}
