//! # Database Configuration
//!
//! Pool and transaction settings, built in code or loaded from environment
//! variables with fallback to defaults.
//!
//! ## Environment Variables
//! ```text
//! TIENDA_DB_PATH                       ./tienda.db
//! TIENDA_DB_MAX_CONNECTIONS            5
//! TIENDA_DB_ACQUIRE_TIMEOUT_SECS       30
//! TIENDA_DB_BUSY_TIMEOUT_SECS          5
//! TIENDA_DB_TRANSACTION_TIMEOUT_SECS   (unset = no limit)
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/tienda.db")
///     .max_connections(10)
///     .transaction_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long `acquire()` waits for a free connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a statement waits on a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Upper bound for a whole unit of work. `None` = unbounded.
    pub transaction_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            transaction_timeout: None,
            run_migrations: true,
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each in-memory connection is its own database, so the pool is
    /// pinned to exactly one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            transaction_timeout: None,
            run_migrations: true,
        }
    }

    /// Loads the configuration from `TIENDA_DB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var("TIENDA_DB_PATH").unwrap_or_else(|_| "./tienda.db".to_string());
        let mut config = DbConfig::new(path);

        if let Some(max) = parse_var::<u32>("TIENDA_DB_MAX_CONNECTIONS")? {
            if max == 0 {
                return Err(ConfigError::InvalidValue(
                    "TIENDA_DB_MAX_CONNECTIONS".to_string(),
                ));
            }
            config.max_connections = max;
            config.min_connections = config.min_connections.min(max);
        }

        if let Some(secs) = parse_var::<u64>("TIENDA_DB_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>("TIENDA_DB_BUSY_TIMEOUT_SECS")? {
            config.busy_timeout = Duration::from_secs(secs);
        }

        config.transaction_timeout =
            parse_var::<u64>("TIENDA_DB_TRANSACTION_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(config)
    }

    /// Returns `true` for `:memory:` databases.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the pool checkout timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Bounds every unit of work run through `run_in_transaction`.
    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = Some(timeout);
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
