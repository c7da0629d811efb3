// ticket-config/src/lib.rs
// ============================================================================
// Module: Ticket Config
// Description: Per-environment settings loader for the ticket intake service.
// Purpose: Provide strict, fail-closed config parsing with an environment
//          variable overlay matching the service's deployment conventions.
// Dependencies: serde, thiserror, ticket-core, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file, then overlaid with a small set
//! of environment variables that historically controlled secrets and
//! degraded-mode behavior in this service's deployment environments (§6).
//! Missing or invalid configuration fails closed: [`TicketConfig::load`]
//! never returns a partially valid configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use ticket_core::ReporterId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ticket-service.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TICKET_SERVICE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

/// Remote ticketing backend password (never written to disk; §6).
pub const SNOW_PASS_ENV_VAR: &str = "SNOW_PASS";
/// Incident store connection string, historically a MongoDB DSN (§6, §9).
pub const STORE_URL_ENV_VAR: &str = "MONGO_URL";
/// Broker connection URL; may be a comma-joined list when
/// [`MULTIPLE_BROKERS_ENV_VAR`] is set (§6).
pub const BROKER_URL_ENV_VAR: &str = "BROKER_URL";
/// When set to a truthy value, [`BROKER_URL_ENV_VAR`] is treated as a
/// comma-separated list of broker URLs for dual-broker publishing (§6).
pub const MULTIPLE_BROKERS_ENV_VAR: &str = "MULTIPLE_BROKERS";
/// When set to a truthy value, declared queues use `x-queue-type=quorum`
/// instead of the classic queue type (§6, §9).
pub const QUORUM_QUEUE_ENV_VAR: &str = "QUORUM_QUEUE";
/// When set to a truthy value, every write path is treated as degraded:
/// local persistence and queue publishing are suppressed (§4.6, §7).
pub const DATABASE_IMPACTED_ENV_VAR: &str = "DATABASE_IMPACTED";
/// Path to the logging configuration file, passed through to the tracing
/// subscriber setup at startup (§6).
pub const LOG_CFG_ENV_VAR: &str = "LOG_CFG";

// ============================================================================
// SECTION: Deployment Environment
// ============================================================================

/// Deployment environment the service is running under (§6).
///
/// Distinct from [`Self::UnitTest`]: `test` names a shared staging
/// environment that still talks to real (sandboxed) backends, while
/// `unit-test` disables all outbound network calls in favor of in-memory
/// fakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SysEnv {
    /// Local development.
    Dev,
    /// Operational test environment.
    Ote,
    /// Production.
    Prod,
    /// Shared staging environment against sandboxed backends.
    Test,
    /// Unit-test environment; no outbound network calls.
    UnitTest,
}

impl Default for SysEnv {
    fn default() -> Self {
        Self::Dev
    }
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Root ticket intake service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    /// Deployment environment.
    #[serde(default)]
    pub sysenv: SysEnv,
    /// Remote ticketing backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Incident store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Broker connection and queue settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Reporter trust classes and user-generated domain exemptions.
    #[serde(default)]
    pub reporters: ReportersConfig,
    /// When true, every write path is treated as degraded (§4.6, §7).
    #[serde(default)]
    pub degraded_mode: bool,
    /// Worker pool size for the RPC surface (§5).
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            sysenv: SysEnv::default(),
            backend: BackendConfig::default(),
            store: StoreConfig::default(),
            broker: BrokerConfig::default(),
            reporters: ReportersConfig::default(),
            degraded_mode: false,
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

impl TicketConfig {
    /// Loads configuration from disk using the default resolution rules,
    /// then overlays the environment variables documented in §6.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_environment_overlay();
        config.validate()?;
        Ok(config)
    }

    /// Applies the environment variable overlay documented in §6 on top of
    /// whatever the TOML file set. Environment variables always win.
    fn apply_environment_overlay(&mut self) {
        if let Ok(password) = env::var(SNOW_PASS_ENV_VAR) {
            self.backend.password = password;
        }
        if let Ok(store_url) = env::var(STORE_URL_ENV_VAR) {
            self.store.connection_string = store_url;
        }
        if let Ok(broker_url) = env::var(BROKER_URL_ENV_VAR) {
            let multiple = env::var(MULTIPLE_BROKERS_ENV_VAR).is_ok_and(|value| is_truthy(&value));
            self.broker.urls = if multiple {
                broker_url.split(',').map(str::trim).map(str::to_string).collect()
            } else {
                vec![broker_url]
            };
        }
        if let Ok(quorum) = env::var(QUORUM_QUEUE_ENV_VAR) {
            self.broker.quorum_queue = is_truthy(&quorum);
        }
        if let Ok(impacted) = env::var(DATABASE_IMPACTED_ENV_VAR) {
            self.degraded_mode = is_truthy(&impacted);
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.store.validate()?;
        self.broker.validate()?;
        self.reporters.validate()?;
        if self.worker_pool_size == 0 {
            return Err(ConfigError::Invalid("worker_pool_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Remote ticketing backend connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the remote ticketing backend table API.
    #[serde(default)]
    pub base_url: String,
    /// Basic auth username.
    #[serde(default)]
    pub username: String,
    /// Basic auth password; normally supplied via [`SNOW_PASS_ENV_VAR`]
    /// rather than committed to the TOML file.
    #[serde(default)]
    pub password: String,
    /// Per-call timeout in milliseconds (§4.1).
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl BackendConfig {
    /// Validates that the base URL and timeout are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `base_url` is empty or
    /// `timeout_ms` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid("backend.base_url must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("backend.timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Incident store connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Store connection string. Historically a MongoDB DSN (§9); the
    /// `ticket-store-sqlite` adapter treats this as a filesystem path.
    #[serde(default)]
    pub connection_string: String,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Validates that the connection string is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `connection_string` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_string.is_empty() {
            return Err(ConfigError::Invalid("store.connection_string must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Broker connection and queue settings (§4.3, §9).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerConfig {
    /// One broker URL, or two when dual-broker publishing is enabled.
    #[serde(default)]
    pub urls: Vec<String>,
    /// Declare queues with `x-queue-type=quorum` instead of classic.
    #[serde(default)]
    pub quorum_queue: bool,
    /// Middleware queue name that `run.process` tasks are published to.
    #[serde(default = "default_middleware_queue")]
    pub middleware_queue: String,
    /// GDBS queue name that `run.hubstream_sync` tasks are published to.
    #[serde(default = "default_gdbs_queue")]
    pub gdbs_queue: String,
}

impl BrokerConfig {
    /// Validates that at least one broker URL is configured and that
    /// dual-broker mode names exactly two distinct URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the URL count is zero, or when
    /// more than two URLs are configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.is_empty() {
            return Err(ConfigError::Invalid("broker.urls must not be empty".to_string()));
        }
        if self.urls.len() > 2 {
            return Err(ConfigError::Invalid(
                "broker.urls supports at most two entries (dual-broker mode)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reporter trust classes and user-generated domain exemptions (§3, §4.4).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportersConfig {
    /// Reporter IDs treated as trusted (§4.4, §4.5).
    #[serde(default)]
    pub trusted: BTreeSet<ReporterId>,
    /// Reporter IDs exempt from the per-domain admission cap.
    #[serde(default)]
    pub exempt: BTreeSet<ReporterId>,
    /// Environment-configured user-generated domain names.
    #[serde(default)]
    pub user_generated_domains: BTreeSet<String>,
}

impl ReportersConfig {
    /// Validates that every trusted reporter is also exempt (§3).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a trusted reporter is missing
    /// from the exempt set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for reporter in &self.trusted {
            if !self.exempt.contains(reporter) {
                return Err(ConfigError::Invalid(format!(
                    "trusted reporter {reporter} must also be listed as exempt"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the explicit argument, environment, or
/// the default filename, in that order.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Interprets an environment variable value as a boolean flag: `1`, `true`,
/// and `yes` (case-insensitive) are truthy; everything else is not.
fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Default per-call backend timeout (§4.1): ten seconds.
const fn default_backend_timeout_ms() -> u64 {
    10_000
}

/// Default SQLite busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default bounded worker pool size (§5).
const fn default_worker_pool_size() -> usize {
    10
}

/// Default middleware queue name.
fn default_middleware_queue() -> String {
    "middleware".to_string()
}

/// Default GDBS (hubstream sync) queue name.
fn default_gdbs_queue() -> String {
    "gdbs".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file creation must succeed in tests");
        file.write_all(contents.as_bytes()).expect("temp file write must succeed in tests");
        file
    }

    #[test]
    fn truthy_values_are_case_insensitive() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("1"));
        assert!(is_truthy("Yes"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn load_applies_defaults_for_missing_sections() {
        let file = write_config(
            "[backend]\nbase_url = \"https://example.test\"\n\n[store]\nconnection_string = \"/tmp/incidents.db\"\n\n[broker]\nurls = [\"amqp://localhost\"]\n",
        );
        let config = TicketConfig::load(Some(file.path())).expect("valid minimal config must load");
        assert_eq!(config.worker_pool_size, 10);
        assert_eq!(config.broker.middleware_queue, "middleware");
        assert!(!config.degraded_mode);
    }

    #[test]
    fn validate_rejects_trusted_reporter_missing_from_exempt_set() {
        let mut config = TicketConfig {
            backend: BackendConfig {
                base_url: "https://example.test".to_string(),
                ..BackendConfig::default()
            },
            store: StoreConfig {
                connection_string: "/tmp/incidents.db".to_string(),
                ..StoreConfig::default()
            },
            broker: BrokerConfig {
                urls: vec!["amqp://localhost".to_string()],
                ..BrokerConfig::default()
            },
            ..TicketConfig::default()
        };
        config.reporters.trusted.insert(ReporterId::new("TR1"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_more_than_two_broker_urls() {
        let broker = BrokerConfig {
            urls: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..BrokerConfig::default()
        };
        assert!(broker.validate().is_err());
    }
}
