//! Centralized error types for dashpanel.
//!
//! Every external call resolves to a [`FetchError`] at its own poll boundary.
//! The fallback layer consumes these uniformly; none of them ever reach the
//! scheduler or the render sink as a fault.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Fetch(e) => e.user_message(),
            AppError::Store(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
        }
    }
}

/// Coarse classification of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No API key configured; the request was never sent.
    NoCredential,
    /// Network failure or non-2xx status.
    Transport,
    /// The response arrived but its payload was unusable or empty.
    ParseFailure,
    /// The provider explicitly signalled a rate limit or exhausted quota.
    UpstreamThrottled,
}

/// A failed poll of an external data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("No API key configured for {0}")]
    NoCredential(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upstream throttled: {0}")]
    Throttled(String),
}

impl FetchError {
    pub fn no_credential(service: impl Into<String>) -> Self {
        Self::NoCredential(service.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::NoCredential(_) => ErrorKind::NoCredential,
            FetchError::Http { .. } | FetchError::Network(_) => ErrorKind::Transport,
            FetchError::Parse(_) => ErrorKind::ParseFailure,
            FetchError::Throttled(_) => ErrorKind::UpstreamThrottled,
        }
    }

    /// Short placeholder text shown in place of a reading.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NoCredential(_) => "Key Missing",
            FetchError::Http { status, .. } if *status >= 500 => "Service unavailable",
            FetchError::Http { .. } | FetchError::Network(_) => "Error",
            FetchError::Parse(_) => "Unexpected response",
            FetchError::Throttled(_) => "Rate limited",
        }
    }
}

/// Key/value store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store: {0}")]
    Read(String),

    #[error("Failed to write store: {0}")]
    Write(String),

    #[error("Stored value for '{key}' has an unexpected shape: {message}")]
    Shape { key: String, message: String },
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Read(_) => "Unable to read saved data.",
            StoreError::Write(_) => "Unable to save data. Changes may be lost.",
            StoreError::Shape { .. } => "Saved data is corrupted and was ignored.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to [`FetchError`].
pub trait ReqwestErrorExt {
    fn into_fetch_error(self) -> FetchError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_fetch_error(self) -> FetchError {
        if let Some(status) = self.status() {
            FetchError::Http {
                status: status.as_u16(),
                body: self.to_string(),
            }
        } else if self.is_decode() {
            FetchError::Parse(self.to_string())
        } else {
            FetchError::Network(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(FetchError::no_credential("weather").kind(), ErrorKind::NoCredential);
        assert_eq!(
            FetchError::Http { status: 404, body: String::new() }.kind(),
            ErrorKind::Transport
        );
        assert_eq!(FetchError::Network("reset".into()).kind(), ErrorKind::Transport);
        assert_eq!(FetchError::parse("bad json").kind(), ErrorKind::ParseFailure);
        assert_eq!(
            FetchError::Throttled("quota".into()).kind(),
            ErrorKind::UpstreamThrottled
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(FetchError::no_credential("weather").user_message(), "Key Missing");
        assert_eq!(
            FetchError::Http { status: 503, body: String::new() }.user_message(),
            "Service unavailable"
        );
        assert_eq!(FetchError::Network("x".into()).user_message(), "Error");
    }

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = FetchError::Throttled("slow down".into()).into();
        assert!(matches!(app_err, AppError::Fetch(FetchError::Throttled(_))));
        assert_eq!(app_err.user_message(), "Rate limited");

        let app_err: AppError = ConfigError::Invalid("clock.tick_millis".into()).into();
        assert_eq!(
            app_err.user_message(),
            "Invalid configuration. Check your settings."
        );
    }
}
