use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MartError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Missing expected columns: {missing:?}\nFound columns (first 50): {found:?}")]
    MissingColumns { missing: Vec<String>, found: Vec<String> },

    #[error("Unsupported input: column remap is partial (present: {present:?}, absent: {absent:?})")]
    PartialRemap { present: Vec<String>, absent: Vec<String> },

    #[error("Unknown rule set version: {0}")]
    UnknownRuleSet(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),
}

/// Which side of a request boundary an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller passed something unusable
    Client,
    /// The deployment or its data is misconfigured
    Server,
}

impl MartError {
    pub fn class(&self) -> ErrorClass {
        match self {
            MartError::InvalidQuery(_) => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }

    /// True for errors that must abort a run before any output is written.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MartError::Config(_)
                | MartError::SourceNotFound(_)
                | MartError::MissingColumns { .. }
                | MartError::PartialRemap { .. }
                | MartError::UnknownRuleSet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MartError>;
