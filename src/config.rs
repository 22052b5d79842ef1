use chrono_tz::Tz;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub focus: FocusConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    #[serde(default)]
    pub additional_base_paths: Vec<String>,
    pub enable_swagger: bool,
}

/// Settings of the focus-time feature itself.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FocusConfig {
    /// IANA zone in which calendar days and months are evaluated, e.g. `America/Sao_Paulo`.
    pub time_zone: String,
}

impl FocusConfig {
    pub fn parse_time_zone(&self) -> Option<Tz> {
        self.time_zone.trim().parse::<Tz>().ok()
    }
}

/// Parsed, immutable focus settings managed as Rocket state.
#[derive(Debug, Clone, Copy)]
pub struct FocusSettings {
    pub time_zone: Tz,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self { time_zone: Tz::UTC }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/focus_tracker".to_string(),
            max_connections: 16,
            min_connections: 2,
            connection_timeout: 5,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // Vite dev server
            allowed_origins: vec!["http://localhost:5173".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            additional_base_paths: Vec::new(),
            enable_swagger: true,
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { time_zone: "UTC".to_string() }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. FocusTracker.toml (base configuration file)
    /// 2. Environment variables (prefixed with FOCUS_TRACKER_)
    /// 3. DATABASE_URL environment variable
    pub fn load() -> Result<Self, figment::Error> {
        let defaults = toml::to_string(&Config::default()).map_err(|e| figment::Error::from(e.to_string()))?;

        let figment = Figment::new()
            .merge(Toml::string(&defaults))
            .merge(Toml::file("FocusTracker.toml"))
            // e.g. FOCUS_TRACKER_DATABASE_URL -> database.url
            .merge(Env::prefixed("FOCUS_TRACKER_").split("_"))
            // "_" splitting cannot express focus.time_zone
            .merge(Env::raw().only(&["FOCUS_TRACKER_TIME_ZONE"]).map(|_| "focus.time_zone".into()))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()));

        figment.extract()
    }
}
