// src/error.rs
//! Source-local failure taxonomy. None of these abort a refresh cycle.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error reaching the provider.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered, but not with a success status.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    /// Feed, markup, JSON or selector could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// No usable credential for a source that needs one.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch task panicked or was cancelled before settling.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    pub fn parse(msg: impl std::fmt::Display) -> Self {
        Self::Parse(msg.to_string())
    }

    /// Coarse class used as a metrics label.
    pub fn class(&self) -> &'static str {
        match self {
            FetchError::Transport(_) | FetchError::Http { .. } | FetchError::Timeout(_) => {
                "transport"
            }
            FetchError::Parse(_) | FetchError::Task(_) => "parse",
            FetchError::ConfigurationMissing(_) => "configuration",
        }
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(e: tokio::task::JoinError) -> Self {
        FetchError::Task(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::parse(e)
    }
}

impl From<quick_xml::DeError> for FetchError {
    fn from(e: quick_xml::DeError) -> Self {
        FetchError::parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(FetchError::Http { status: 503 }.class(), "transport");
        assert_eq!(FetchError::Timeout(Duration::from_secs(1)).class(), "transport");
        assert_eq!(FetchError::parse("bad xml").class(), "parse");
        assert_eq!(FetchError::Task("panicked".into()).class(), "parse");
        assert_eq!(
            FetchError::ConfigurationMissing("TWITTER_BEARER_TOKEN").class(),
            "configuration"
        );
    }
}
