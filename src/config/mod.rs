use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub reset_on_startup: bool,
}

/// Identity provider settings used to verify bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Provider domain, e.g. `coffee-shop.us.auth0.com`
    pub domain: String,
    pub audience: String,
    pub algorithms: Vec<String>,
    pub leeway_secs: u64,
    pub jwks_ttl_secs: u64,
    pub jwks_min_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AuthConfig {
    /// Issuer expected in the `iss` claim
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain.trim_end_matches('/'))
    }

    /// Discovery endpoint for the provider's signing keys
    pub fn jwks_url(&self) -> Result<url::Url, ConfigError> {
        let base = url::Url::parse(&self.issuer()).map_err(|e| ConfigError::Invalid {
            field: "AUTH0_DOMAIN",
            reason: e.to_string(),
        })?;
        base.join(".well-known/jwks.json").map_err(|e| ConfigError::Invalid {
            field: "AUTH0_DOMAIN",
            reason: e.to_string(),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("DRINKS_API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("DRINKS_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RESET_ON_STARTUP") {
            self.database.reset_on_startup = v.parse().unwrap_or(self.database.reset_on_startup);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH0_DOMAIN") {
            self.auth.domain = v.trim().to_string();
        }
        if let Ok(v) = env::var("API_AUDIENCE") {
            self.auth.audience = v.trim().to_string();
        }
        if let Ok(v) = env::var("AUTH_ALGORITHMS") {
            self.auth.algorithms = split_list(&v);
        }
        if let Ok(v) = env::var("AUTH_LEEWAY_SECS") {
            self.auth.leeway_secs = v.parse().unwrap_or(self.auth.leeway_secs);
        }
        if let Ok(v) = env::var("AUTH_JWKS_TTL_SECS") {
            self.auth.jwks_ttl_secs = v.parse().unwrap_or(self.auth.jwks_ttl_secs);
        }
        if let Ok(v) = env::var("AUTH_JWKS_MIN_REFRESH_SECS") {
            self.auth.jwks_min_refresh_secs = v.parse().unwrap_or(self.auth.jwks_min_refresh_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    /// Checks the settings the server cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.domain.is_empty() {
            return Err(ConfigError::Missing("AUTH0_DOMAIN"));
        }
        if self.auth.audience.is_empty() {
            return Err(ConfigError::Missing("API_AUDIENCE"));
        }
        if self.auth.algorithms.is_empty() {
            return Err(ConfigError::Missing("AUTH_ALGORITHMS"));
        }
        for alg in &self.auth.algorithms {
            if alg.parse::<jsonwebtoken::Algorithm>().is_err() {
                return Err(ConfigError::Invalid {
                    field: "AUTH_ALGORITHMS",
                    reason: format!("unknown algorithm '{}'", alg),
                });
            }
        }
        self.auth.jwks_url()?;
        if self.database.url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite://database.db?mode=rwc".to_string(),
                max_connections: 5,
                connection_timeout: 30,
                reset_on_startup: false,
            },
            auth: AuthConfig {
                domain: String::new(),
                audience: String::new(),
                algorithms: vec!["RS256".to_string()],
                leeway_secs: 60,
                jwks_ttl_secs: 600,
                jwks_min_refresh_secs: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:8100".to_string(), "http://localhost:4200".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite://database.db?mode=rwc".to_string(),
                max_connections: 10,
                connection_timeout: 10,
                reset_on_startup: false,
            },
            auth: AuthConfig {
                domain: String::new(),
                audience: String::new(),
                algorithms: vec!["RS256".to_string()],
                leeway_secs: 30,
                jwks_ttl_secs: 600,
                jwks_min_refresh_secs: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 512 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://database.db?mode=rwc".to_string(),
                max_connections: 20,
                connection_timeout: 5,
                reset_on_startup: false,
            },
            auth: AuthConfig {
                domain: String::new(),
                audience: String::new(),
                algorithms: vec!["RS256".to_string()],
                leeway_secs: 30,
                jwks_ttl_secs: 3600,
                jwks_min_refresh_secs: 60,
            },
            api: ApiConfig {
                max_request_size_bytes: 256 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }

    /// Development preset with the given provider settings, used by tests
    pub fn for_testing(domain: &str, audience: &str) -> Self {
        let mut config = Self::development();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.auth.domain = domain.to_string();
        config.auth.audience = audience.to_string();
        config
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
