use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub short_links: ShortLinkConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortLinkConfig {
    /// Number of characters in every generated code
    pub code_length: usize,
    /// Path segment short links are served under, without slashes (`s` -> `/s/{code}`)
    pub path_prefix: String,
    /// Base URL of the web frontend; recipe pages live at `{frontend_base_url}/recipes/{id}/`
    pub frontend_base_url: String,
    /// Base URL this server is reachable at, used to build absolute short URLs
    pub backend_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
}

impl DatabaseConfig {
    /// Loggable description of the connection. Leaves out the URL, which may carry credentials.
    pub fn summary(&self) -> String {
        format!(
            "{:?} storage ({} max connections)",
            self.backend, self.max_connections
        )
    }
}

impl ShortLinkConfig {
    pub const MAX_CODE_LENGTH: usize = 32;
    const RESERVED_PREFIXES: [&'static str; 2] = ["api", "health"];

    const fn default_code_length() -> usize {
        6
    }

    /// Absolute URL of the recipe page a short link points at.
    pub fn recipe_url(&self, recipe_id: i64) -> String {
        format!("{}/recipes/{}/", self.frontend_base_url, recipe_id)
    }

    /// Absolute short URL for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}/{}", self.backend_base_url, self.path_prefix, code)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.code_length == 0 || self.code_length > Self::MAX_CODE_LENGTH {
            bail!(
                "SHORT_CODE_LENGTH must be between 1 and {}, got {}",
                Self::MAX_CODE_LENGTH,
                self.code_length
            );
        }
        if self.path_prefix.is_empty() {
            bail!("SHORT_LINK_PREFIX must not be empty");
        }
        let segment_ok = self
            .path_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !segment_ok {
            bail!(
                "SHORT_LINK_PREFIX may only contain letters, digits, '-' and '_', got '{}'",
                self.path_prefix
            );
        }
        if Self::RESERVED_PREFIXES.contains(&self.path_prefix.as_str()) {
            bail!(
                "SHORT_LINK_PREFIX '{}' collides with a built-in route",
                self.path_prefix
            );
        }
        Ok(())
    }
}

impl Default for ShortLinkConfig {
    fn default() -> Self {
        Self {
            code_length: Self::default_code_length(),
            path_prefix: "s".to_string(),
            frontend_base_url: "http://localhost".to_string(),
            backend_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl PaginationConfig {
    const fn default_limit() -> i64 {
        6
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::default_limit(),
        }
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./larder.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let code_length = match std::env::var("SHORT_CODE_LENGTH") {
            Ok(v) => v
                .parse::<usize>()
                .context("SHORT_CODE_LENGTH must be a positive integer")?,
            Err(_) => ShortLinkConfig::default_code_length(),
        };

        let path_prefix = std::env::var("SHORT_LINK_PREFIX")
            .map(|v| v.trim_matches('/').to_string())
            .unwrap_or_else(|_| "s".to_string());

        let frontend_base_url = trim_base_url(
            std::env::var("FRONTEND_BASE_URL").unwrap_or_else(|_| "http://localhost".to_string()),
        );
        let backend_base_url = trim_base_url(
            std::env::var("BACKEND_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{api_port}")),
        );

        let short_links = ShortLinkConfig {
            code_length,
            path_prefix,
            frontend_base_url,
            backend_base_url,
        };
        short_links.validate()?;

        let default_limit = match std::env::var("DEFAULT_PAGE_SIZE") {
            Ok(v) => v
                .parse::<i64>()
                .ok()
                .filter(|limit| *limit > 0)
                .context("DEFAULT_PAGE_SIZE must be a positive integer")?,
            Err(_) => PaginationConfig::default_limit(),
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            short_links,
            pagination: PaginationConfig { default_limit },
        })
    }
}
