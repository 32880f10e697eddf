use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Tuning knobs for entity listing.
#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Page size when the request does not name one. Default: 25.
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,
    /// Upper bound for `perPage`. Default: 100.
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u64,
    /// Maximum entities returned per context window. Default: 100.
    #[serde(default = "default_context_limit")]
    pub context_limit: u64,
    /// The server's offset in minutes behind UTC (positive west of UTC),
    /// used when shifting client-local DATE values. Default: 0.
    #[serde(default)]
    pub server_utc_offset_minutes: i32,
}

fn default_per_page() -> u64 {
    25
}
fn default_max_per_page() -> u64 {
    100
}
fn default_context_limit() -> u64 {
    100
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            context_limit: default_context_limit(),
            server_utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., TALLY__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
