use std::time::Duration;

use thiserror::Error;

/// Errors produced while turning raw spec text into a [`crate::ParsedSpec`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Input is neither valid JSON nor valid YAML.
    #[error("spec is neither valid JSON nor valid YAML: {0}")]
    Parse(String),

    /// Input parsed, but its root is not a mapping.
    #[error("spec root must be an object")]
    NotAnObject,
}

/// Errors produced while retrieving raw spec text from its source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, TLS).
    #[error("fetch failed for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("fetch failed for {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request exceeded the configured deadline.
    #[error("fetch timed out after {timeout:?} for {url}")]
    Timeout { url: String, timeout: Duration },

    /// Local file read failure.
    #[error("failed to read spec file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
