use std::path::Path;

/// Registry configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/registry | Working directory (database, logs) |
/// | DATABASE_PATH | {WORK_DIR}/registry.db | SQLite database file |
/// | LOG_LEVEL | info | Log level filter |
/// | LOG_JSON | false | Emit JSON log lines |
/// | LOG_DIR | {WORK_DIR}/logs | Daily rolling log directory |
/// | ENVIRONMENT | development | Runtime environment |
/// | DB_MAX_CONNECTIONS | 5 | SQLite pool size |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub database_path: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: String,
    /// development | staging | production
    pub environment: String,
    pub db_max_connections: u32,
}

impl Config {
    /// Load `.env` from the working directory, then read the environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Load the given env file, then read the environment
    ///
    /// Variables already set in the process environment take precedence.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        dotenv::from_path(path.as_ref()).ok();
        Self::from_env()
    }

    /// Read configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/registry".into());
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| format!("{work_dir}/registry.db")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| format!("{work_dir}/logs")),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5),
            work_dir,
        }
    }

    /// Override the working directory and database path
    ///
    /// Used by tests
    pub fn with_overrides(work_dir: impl Into<String>, database_path: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = database_path.into();
        config.log_dir = format!("{}/logs", config.work_dir);
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
