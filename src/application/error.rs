use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::parse::ListParseError, infra::error::InfraError};

/// A failure flattened into its message chain, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Parse(#[from] ListParseError),
    #[error("no post list found in `{0}`")]
    NoList(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) | AppError::NoList(_) | AppError::Parse(_) => 2,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_walks_source_chain() {
        let io = std::io::Error::other("disk full");
        let error = AppError::from(InfraError::from(io));

        let report = error.report();

        assert_eq!(
            report.messages.first().map(String::as_str),
            Some("io error: disk full")
        );
        assert!(report.messages.iter().any(|message| message == "disk full"));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn input_problems_exit_with_usage_code() {
        assert_eq!(AppError::validation("bad").exit_code(), 2);
        assert_eq!(AppError::NoList("index.html".into()).exit_code(), 2);
    }

    #[test]
    fn infra_failures_exit_with_general_code() {
        let client = AppError::from(InfraError::http_client("tls backend missing"));
        let telemetry = AppError::from(InfraError::telemetry("subscriber already set"));

        assert_eq!(client.to_string(), "http client error: tls backend missing");
        assert_eq!(client.exit_code(), 1);
        assert_eq!(telemetry.exit_code(), 1);
    }
}
