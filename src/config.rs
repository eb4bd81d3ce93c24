use crate::core::db::DatabaseKind;
use crate::core::{LegacyError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[oracle] password`.
pub const ORACLE_PASSWORD_ENV: &str = "LEGACY_ORACLE_PASSWORD";
/// Environment variable overriding `[sqlserver] password`.
pub const SQLSERVER_PASSWORD_ENV: &str = "LEGACY_SQLSERVER_PASSWORD";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultDbConfig,
    pub oracle: Option<OracleConfig>,
    pub sqlserver: Option<SqlServerConfig>,
    #[serde(default)]
    pub students: StudentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Embedded default database.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultDbConfig {
    /// Database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DefaultDbConfig {
    fn default() -> Self {
        DefaultDbConfig {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

/// Oracle connection parameters.
#[derive(Clone, Deserialize)]
pub struct OracleConfig {
    /// Connect string, e.g. `//dbhost:1521/ORCL`
    pub url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Owner of the shared `tpu_*` tables
    pub schema: Option<String>,
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// SQL Server connection parameters.
#[derive(Clone, Deserialize)]
pub struct SqlServerConfig {
    pub server_name: String,
    #[serde(default = "default_sqlserver_port")]
    pub port: u16,
    pub database_name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Installed ODBC driver name
    #[serde(default = "default_odbc_driver")]
    pub driver: String,
    #[serde(default)]
    pub trust_server_certificate: bool,
    pub schema: Option<String>,
}

fn default_sqlserver_port() -> u16 {
    1433
}

fn default_odbc_driver() -> String {
    "ODBC Driver 18 for SQL Server".to_string()
}

impl SqlServerConfig {
    /// ODBC connection string. Contains the password; never log it.
    pub fn connection_string(&self) -> String {
        format!(
            "Driver={};Server={},{};Database={};UID={};PWD={};TrustServerCertificate={};",
            odbc_value(&self.driver),
            self.server_name,
            self.port,
            odbc_value(&self.database_name),
            odbc_value(&self.user),
            odbc_value(&self.password),
            if self.trust_server_certificate { "yes" } else { "no" },
        )
    }
}

/// Braces an ODBC attribute value so `;` and `=` are taken literally.
fn odbc_value(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

impl fmt::Debug for SqlServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlServerConfig")
            .field("server_name", &self.server_name)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("driver", &self.driver)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Student query settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentsConfig {
    /// Database selector used by the student DAO (`oracle`, `sqlserver`, `default`)
    #[serde(default)]
    pub source: String,
    /// School whose records may carry the test marker
    #[serde(default = "default_test_school_code")]
    pub test_school_code: String,
    /// Name fragment marking test records
    #[serde(default = "default_test_marker")]
    pub test_marker: String,
}

impl Default for StudentsConfig {
    fn default() -> Self {
        StudentsConfig {
            source: String::new(),
            test_school_code: default_test_school_code(),
            test_marker: default_test_marker(),
        }
    }
}

fn default_test_school_code() -> String {
    "2603".to_string()
}

fn default_test_marker() -> String {
    "TESTE".to_string()
}

/// Logging settings; `RUST_LOG` takes precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Schema qualifying the shared tables for a database kind.
    pub fn schema_for(&self, kind: DatabaseKind) -> Option<&str> {
        match kind {
            DatabaseKind::Oracle => self.oracle.as_ref().and_then(|c| c.schema.as_deref()),
            DatabaseKind::SqlServer => self.sqlserver.as_ref().and_then(|c| c.schema.as_deref()),
            DatabaseKind::Default => None,
        }
    }

    /// Database kind the student DAO runs against.
    pub fn students_kind(&self) -> DatabaseKind {
        DatabaseKind::parse(&self.students.source)
    }

    /// Replaces passwords with values from the environment when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(oracle) = self.oracle.as_mut() {
            if let Some(password) = lookup(ORACLE_PASSWORD_ENV) {
                oracle.password = password;
            }
        }
        if let Some(sqlserver) = self.sqlserver.as_mut() {
            if let Some(password) = lookup(SQLSERVER_PASSWORD_ENV) {
                sqlserver.password = password;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default.path.trim().is_empty() {
            return Err(LegacyError::Config("[default] path must not be empty".to_string()));
        }
        if let Some(oracle) = &self.oracle {
            if oracle.url.trim().is_empty() {
                return Err(LegacyError::Config("[oracle] url must not be empty".to_string()));
            }
        }
        if let Some(sqlserver) = &self.sqlserver {
            if sqlserver.server_name.trim().is_empty() {
                return Err(LegacyError::Config(
                    "[sqlserver] server_name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file at the given path and applies the
/// password overrides from the environment.
///
/// # Example
///
/// ```no_run
/// let config = legacy_dao::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.apply_env_overrides();
    Ok(config)
}

/// `<config dir>/legacy-dao/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("legacy-dao").join("config.toml"))
}
