//! Domain error types for server startup.

use iag_platform_access::ConfigError;
use std::fmt;

/// Errors that prevent the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Environment variables could not be loaded or deserialized.
    Load { details: String },
    /// A setting failed validation.
    Config(ConfigError),
    /// The listener could not be bound.
    Bind { addr: String, details: String },
    /// The server stopped with an I/O error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load configuration: {details}"),
            Self::Config(error) => write!(f, "invalid configuration: {error}"),
            Self::Bind { addr, details } => write!(f, "failed to bind {addr}: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<config::ConfigError> for StartupError {
    fn from(error: config::ConfigError) -> Self {
        Self::Load {
            details: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = StartupError::from(ConfigError::MissingSetting {
            setting: "token.secret".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "invalid configuration: missing required setting: token.secret"
        );
    }

    #[test]
    fn bind_error_display() {
        let error = StartupError::Bind {
            addr: "0.0.0.0:80".to_string(),
            details: "permission denied".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to bind 0.0.0.0:80: permission denied"
        );
    }
}
