use thiserror::Error;

/// Failure to obtain a batch from the disclosure source. Any of these aborts
/// the current cycle and moves the poller into backoff.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed parsing error: {0}")]
    Rss(#[from] rss::Error),
    #[error("json decoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document parsing error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("message rejected (status {status}): {description}")]
    Rejected {
        status: reqwest::StatusCode,
        description: String,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize seen set: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown source kind `{0}` (expected html, rss or api)")]
    UnknownSource(String),
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetch from {source_name} failed: {error}")]
    Source {
        source_name: &'static str,
        #[source]
        error: SourceError,
    },
    #[error("poller task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
