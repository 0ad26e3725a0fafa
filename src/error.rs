use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoraLensError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    MissingCredential(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid {field} timestamp '{value}': {source}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DoraLensError {
    /// Message safe to surface to the workflow. Only configuration and
    /// credential problems are reported verbatim.
    pub fn failure_message(&self) -> String {
        match self {
            Self::MissingInput(_) | Self::MissingCredential(_) => self.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

pub const GENERIC_FAILURE: &str = "Action failed";

pub type Result<T> = std::result::Result<T, DoraLensError>;
