use thiserror::Error;

/// Errors surfaced by a reader session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No such device: {target}")]
    NoSuchDevice { target: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The lock acquisition or the wait for fresh data was interrupted.
    #[error("Interrupted while {during}")]
    Interrupted { during: &'static str },

    #[error("Bad destination buffer: {reason}")]
    Fault { reason: String },
}

impl SessionError {
    pub fn no_such_device(target: impl Into<String>) -> Self {
        SessionError::NoSuchDevice { target: target.into() }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        SessionError::InvalidArgument { reason: reason.into() }
    }

    /// Only an interruption leaves the session untouched and may simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Interrupted { .. })
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Errors raised by sample sources on the producer side
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Sensor '{sensor}' acquisition failed: {reason}")]
    AcquireError { sensor: String, reason: String },

    #[error("Sensor '{sensor}' returned out-of-range code {code} for {kind}")]
    CodeOutOfRange { sensor: String, kind: &'static str, code: u16 },

    #[error("Unsupported source driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Sensor '{sensor}' is misconfigured: {reason}")]
    ConfigError { sensor: String, reason: String },
}

/// Device table construction errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to create sample source: {0}")]
    SourceCreationError(#[source] SourceError),
}

/// Result type aliases for convenience
pub type SessionResult<T> = Result<T, SessionError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type SourceResult<T> = Result<T, SourceError>;
pub type RegistryResult<T> = Result<T, RegistryError>;
