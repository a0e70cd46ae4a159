//! src/errors.rs

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems. Every message ends with a remediation hint.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration found at {0}. Run `standupmate --setup` to create one.")]
    Missing(PathBuf),

    #[error("Could not parse configuration at {path}: {error}. Fix the file or run `standupmate --setup`.")]
    Malformed {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("No {provider} API key configured. Run `standupmate --switch-llm` or set {env_var}.")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("Invalid custom ticket pattern `{pattern}`: {error}. Edit `customTicketPatterns` in the config.")]
    InvalidPattern { pattern: String, error: regex::Error },

    #[error("A project named `{0}` already exists. Pick another name.")]
    DuplicateProject(String),

    #[error("Invalid date `{0}`. Expected the format YYYY-MM-DD, e.g. --date 2024-05-31.")]
    InvalidDate(String),

    #[error("`git` was not found on PATH. Install git and try again.")]
    GitNotFound,
}

/// Failures talking to an issue tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{tracker} returned {status}: {body}")]
    Status {
        tracker: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{tracker} request failed: {error}")]
    Transport {
        tracker: &'static str,
        error: reqwest::Error,
    },

    #[error("{tracker} sent a response we could not read: {error}")]
    Decode {
        tracker: &'static str,
        error: reqwest::Error,
    },
}
