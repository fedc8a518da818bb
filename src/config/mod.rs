//! Configuration management.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Path that opens a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Default table name.
pub const DEFAULT_TABLE: &str = "records";

/// Default busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Environment variable overriding the database path.
pub const ENV_PATH: &str = "RECORDSTORE_PATH";

/// Environment variable overriding the table name.
pub const ENV_TABLE: &str = "RECORDSTORE_TABLE";

/// Configuration for one record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file path, or `:memory:`.
    pub path: PathBuf,
    /// Table holding the records.
    pub table: String,
    /// Use WAL journaling for file databases.
    pub journal_wal: bool,
    /// How long to wait on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Logging settings, consumed by [`crate::observability::init_logging`].
    pub logging: LoggingSettings,
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `recordstore=debug`.
    pub level: Option<String>,
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Optional log file (appended to).
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database path.
    pub path: Option<String>,
    /// Table name.
    pub table: Option<String>,
    /// WAL journaling.
    pub journal_wal: Option<bool>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
    /// Logging configuration.
    pub logging: Option<LoggingSettings>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path().unwrap_or_else(|| PathBuf::from("records.db")),
            table: DEFAULT_TABLE.to_string(),
            journal_wal: true,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            logging: LoggingSettings::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_PATH)
    }

    /// Returns the platform data directory location of the default database.
    ///
    /// `~/.local/share/recordstore/records.db` on Linux,
    /// `~/Library/Application Support/recordstore/records.db` on macOS.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("recordstore").join("records.db"))
    }

    /// Returns true if this configuration opens an in-memory database.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the table
    /// name is not a plain identifier.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or names an invalid table.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        let config = Self::from_config_file(file);
        crate::storage::sqlite::validate_table_name(&config.table)?;
        Ok(config)
    }

    /// Converts a `ConfigFile` to `StoreConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = file.path {
            config.path = PathBuf::from(path);
        }
        if let Some(table) = file.table {
            config.table = table;
        }
        if let Some(wal) = file.journal_wal {
            config.journal_wal = wal;
        }
        if let Some(timeout) = file.busy_timeout_ms {
            config.busy_timeout_ms = timeout;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `RECORDSTORE_PATH` and `RECORDSTORE_TABLE` if set.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_PATH).filter(|v| !v.is_empty()) {
            self.path = PathBuf::from(path);
        }
        if let Some(table) = lookup(ENV_TABLE).filter(|v| !v.is_empty()) {
            self.table = table;
        }
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Enables or disables WAL journaling.
    #[must_use]
    pub const fn with_journal_wal(mut self, enabled: bool) -> Self {
        self.journal_wal = enabled;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }
}
