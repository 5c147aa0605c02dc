//! Error handling for username-sniper

use thiserror::Error;

/// Main error type for username-sniper
#[derive(Error, Debug, Clone)]
pub enum SniperError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("State conflict: {message}")]
    StateConflict { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        url: Option<String>,
    },

    #[error("Unexpected response ({status_code}): {message}")]
    UnexpectedResponse {
        message: String,
        status_code: u16,
        body: Option<String>,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        content: Option<String>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Command error: {message}")]
    Cli { message: String },
}

/// Longest body excerpt kept on an unexpected response
const BODY_EXCERPT_LEN: usize = 200;

impl SniperError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Bad user input: a rejected name or scan configuration
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Operation not allowed in the current scan phase
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::StateConflict {
            message: message.into(),
        }
    }

    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        url: Option<String>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            url,
        }
    }

    /// Create an unexpected response error, keeping a short excerpt of the body
    pub fn unexpected_response(message: impl Into<String>, status_code: u16, body: &str) -> Self {
        let body = body.trim();
        let body = if body.is_empty() {
            None
        } else {
            Some(body.chars().take(BODY_EXCERPT_LEN).collect())
        };
        Self::UnexpectedResponse {
            message: message.into(),
            status_code,
            body,
        }
    }

    pub fn parse(message: impl Into<String>, content: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            content,
        }
    }

    pub fn io(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Io {
            message: message.into(),
            path,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cli(message: impl Into<String>) -> Self {
        Self::Cli {
            message: message.into(),
        }
    }

    /// Whether the lookup retry loop should absorb this error and try again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::UnexpectedResponse { .. } | Self::Parse { .. }
        )
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("❌ Configuration problem: {}\n💡 Check your .env file or SNIPER_* variables", message)
            }
            Self::Validation { message } => {
                format!("❌ {}\n💡 Check your input format", message)
            }
            Self::StateConflict { message } => {
                format!("⚠️  {}", message)
            }
            Self::Network { message, status_code, .. } => {
                let status = status_code.map_or(String::new(), |c| format!(" ({})", c));
                format!("❌ Network error{}: {}\n💡 Check your internet connection and proxy list", status, message)
            }
            Self::UnexpectedResponse { message, status_code, .. } => {
                format!("⏱️  Unexpected response ({}): {}\n💡 The lookup service may be rate limiting, try again later", status_code, message)
            }
            Self::Parse { message, .. } => {
                format!("❌ Parse error: {}\n💡 This might be a temporary issue, try again", message)
            }
            Self::Io { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ File error{}: {}\n💡 Check file permissions and paths", path_info, message)
            }
            Self::Internal { message } => {
                format!("❌ Internal error: {}\n💡 This is a bug, please report it", message)
            }
            Self::Cli { message } => {
                format!("❌ Command error: {}\n💡 Use --help for usage information", message)
            }
        }
    }
}

impl From<reqwest::Error> for SniperError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| u.to_string());

        if err.is_timeout() {
            Self::network("Request timed out", status_code, url)
        } else if err.is_connect() {
            Self::network("Connection failed", status_code, url)
        } else if err.is_request() {
            Self::network("Request failed", status_code, url)
        } else {
            Self::network(err.to_string(), status_code, url)
        }
    }
}

impl From<serde_json::Error> for SniperError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}

impl From<std::io::Error> for SniperError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string(), None)
    }
}

pub type Result<T> = std::result::Result<T, SniperError>;

/// `SniperError::config` with optional formatting
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::SniperError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SniperError::config(format!($fmt, $($arg)*))
    };
}

/// `SniperError::validation` with optional formatting
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::SniperError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SniperError::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::SniperError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SniperError::internal(format!($fmt, $($arg)*))
    };
}
