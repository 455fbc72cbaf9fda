use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("not configured - run `cca configure` first")]
    NotConfigured,

    /// The device authorization window closed before the operator finished
    /// logging in, either by our own deadline or by the provider saying so.
    #[error("authentication timed out - please try again")]
    AuthorizationTimeout,

    #[error("operation cancelled")]
    Cancelled,

    /// Any provider error that is not part of the polling protocol,
    /// surfaced verbatim.
    #[error("{code}: {message}")]
    Provider { code: String, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid stored state: {0}")]
    Storage(#[from] serde_json::Error),

    #[error("{0}")]
    Config(String),
}
