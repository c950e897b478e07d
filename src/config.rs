//! Configuration for the conversion engine and session workflow.
//!
//! Everything tunable lives in one [`Config`] struct, built via
//! [`Config::builder()`] or loaded from the environment with
//! [`Config::from_env()`]. Keeping the knobs together makes it trivial to
//! share one config across concurrent jobs and to log the settings a run
//! used.

use crate::error::ConvertError;
use serde::Serialize;
use std::path::PathBuf;

/// Environment variable holding the chat transport authentication token.
pub const TOKEN_ENV: &str = "BOT_TOKEN";

/// Optional environment override for the office engine binary location.
pub const OFFICE_ENGINE_ENV: &str = "ANY2PDF_OFFICE_ENGINE";

/// Runtime configuration.
///
/// # Example
/// ```rust
/// use any2pdf::Config;
///
/// let config = Config::builder()
///     .office_timeout_secs(30)
///     .max_name_len(32)
///     .build()
///     .unwrap();
/// assert_eq!(config.office_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Largest declared upload size the session accepts, in bytes.
    /// Default: 20 MiB — the standard bot-API download ceiling. Inputs over
    /// this are rejected before any download is attempted.
    pub max_input_bytes: u64,

    /// Wall-clock budget for one office engine invocation. Default: 90.
    ///
    /// LibreOffice occasionally hangs on malformed documents; without a hard
    /// budget one bad upload would pin a child process forever. On expiry the
    /// child is killed and the job fails with `ConversionTimeout`.
    pub office_timeout_secs: u64,

    /// Maximum length of a sanitised output filename stem. Default: 64.
    pub max_name_len: usize,

    /// Explicit path to the office engine binary. When `None`, the locator
    /// searches `PATH` and the well-known install locations. Tests and
    /// non-standard installs set this.
    pub office_engine: Option<PathBuf>,

    /// Chat transport authentication token. Required by the bot wiring;
    /// the conversion engine itself never reads it.
    #[serde(skip)]
    pub transport_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_input_bytes: 20 * 1024 * 1024,
            office_timeout_secs: 90,
            max_name_len: 64,
            office_engine: None,
            transport_token: None,
        }
    }
}

impl Config {
    /// Create a new builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// `BOT_TOKEN` is required; its absence is a fatal startup error.
    /// `ANY2PDF_OFFICE_ENGINE` optionally pins the engine binary for hosts
    /// where it is not on `PATH`.
    pub fn from_env() -> Result<Self, ConvertError> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConvertError::MissingToken { var: TOKEN_ENV })?;

        let mut config = Self::default();
        config.transport_token = Some(token);
        if let Ok(path) = std::env::var(OFFICE_ENGINE_ENV) {
            if !path.is_empty() {
                config.office_engine = Some(PathBuf::from(path));
            }
        }
        Ok(config)
    }

    /// JSON snapshot of the effective settings, for startup logging.
    ///
    /// The transport token is excluded from serialisation, so the snapshot
    /// can never leak it into a log.
    pub fn snapshot(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserialisable config: {e}>"))
    }
}

/// Builder for [`Config`].
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn max_input_bytes(mut self, bytes: u64) -> Self {
        self.config.max_input_bytes = bytes;
        self
    }

    pub fn office_timeout_secs(mut self, secs: u64) -> Self {
        self.config.office_timeout_secs = secs;
        self
    }

    pub fn max_name_len(mut self, len: usize) -> Self {
        self.config.max_name_len = len;
        self
    }

    pub fn office_engine(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.office_engine = Some(path.into());
        self
    }

    pub fn transport_token(mut self, token: impl Into<String>) -> Self {
        self.config.transport_token = Some(token.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<Config, ConvertError> {
        let c = &self.config;
        if c.office_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "office timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_name_len == 0 {
            return Err(ConvertError::InvalidConfig(
                "max name length must be ≥ 1".into(),
            ));
        }
        if c.max_input_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "max input size must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}
