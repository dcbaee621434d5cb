use thiserror::Error;

pub type Result<T> = std::result::Result<T, KuperError>;

#[derive(Error, Debug)]
pub enum KuperError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("API error {status} for {url}: {body}")]
    Api { status: u16, url: String, body: String },
    #[error("Template error: {0}")]
    Template(String),
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KuperError {
    /// Errors worth skipping a unit of work for, as opposed to aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KuperError::Transport { .. } | KuperError::Api { .. } | KuperError::Decode { .. }
        )
    }
}
