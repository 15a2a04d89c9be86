// src/error.rs
//! Typed failures for each pipeline stage.
//!
//! Per-source failures (`FetchError`, `ExtractError`) are reported alongside a run's
//! results; `PublishError` and `ConfigError` abort the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{source_name}: request to {url} failed: {reason}")]
    Request {
        source_name: String,
        url: String,
        reason: String,
    },

    #[error("{source_name}: {url} answered HTTP {status}")]
    Status {
        source_name: String,
        url: String,
        status: u16,
    },

    #[error("{source_name}: timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },

    #[error("{source_name}: no rows matched selector '{selector}'")]
    SelectorMissing {
        source_name: String,
        selector: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("{source_name}: {currency} data not found")]
    NotFound {
        source_name: String,
        currency: String,
    },

    #[error("{source_name}: malformed {field} cell '{text}'")]
    Malformed {
        source_name: String,
        field: &'static str,
        text: String,
    },
}

/// Anything that can take one source out of a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("{source_name}: scrape task aborted: {reason}")]
    Join { source_name: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Failed to get Lark access token: {0}")]
    Auth(String),

    #[error("Failed to find sheet ID: {0}")]
    Lookup(String),

    #[error("Lark API error: {0}")]
    Write(String),

    #[error("Failed to build Lark HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("reading {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("parsing {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Why a whole pipeline run was reported as failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("All scrapers failed: {}", .errors.join("; "))]
    AllSourcesFailed { errors: Vec<String> },

    #[error(transparent)]
    Publish(#[from] PublishError),
}
