use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for cmdbridge
///
/// Only conditions that prevent an invocation from being attempted end up
/// here. Tool failures, timeouts, conflicts and empty searches are
/// classifications carried by the result envelope instead.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Credential error: {message}")]
    Credential {
        code: u16,
        message: String,
        host: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BridgeError {
    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a credential error with specific code and host
    pub fn credential_with_code(code: u16, message: impl Into<String>, host: Option<String>) -> Self {
        Self::Credential {
            code,
            message: message.into(),
            host,
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Validation { source: src, .. }
            | Self::Credential { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Get the process exit code the CLI uses for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Credential { .. } => 6,
            Self::Validation { .. } => 8,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Validation { code, .. }
            | Self::Credential { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Validation { message, field, .. } => {
                if let Some(f) = field {
                    format!("Invalid parameter '{}': {}", f, message)
                } else {
                    format!("Validation error: {}", message)
                }
            }
            Self::Credential { message, host, .. } => {
                if let Some(h) = host {
                    format!("Credentials for {}: {}", h, message)
                } else {
                    format!("Credential error: {}", message)
                }
            }
        }
    }

    /// Check whether the error was raised before any process was spawned
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Type alias for Results using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let err = BridgeError::config_with_code(ErrorCode::CONFIG_NOT_FOUND, "Cannot read config")
            .with_source(io_err);

        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("[E1001]"));
        assert!(err.source().is_some());
        assert_eq!(
            err.user_message(),
            "Configuration problem: Cannot read config"
        );
    }

    #[test]
    fn test_validation_error_fields() {
        let err = BridgeError::validation_with_code(
            ErrorCode::VALIDATION_REQUIRED_FIELD,
            "must not be empty",
            Some("pattern".to_string()),
        );
        assert!(err.is_validation());
        assert_eq!(err.exit_code(), 8);
        assert_eq!(
            err.user_message(),
            "Invalid parameter 'pattern': must not be empty"
        );
    }

    #[test]
    fn test_credential_error_names_host() {
        let err = BridgeError::credential_with_code(
            ErrorCode::CREDENTIAL_GENERIC,
            "token rejected",
            Some("github.com".to_string()),
        );
        assert!(!err.is_validation());
        assert_eq!(err.exit_code(), 6);
        assert_eq!(err.user_message(), "Credentials for github.com: token rejected");
    }
}
