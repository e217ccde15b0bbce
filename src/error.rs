use thiserror::Error;

/// Crate-wide error for everything that is not a calendar gateway outcome.
///
/// Gateway failures travel as [`crate::service::calendar_service::GatewayError`]
/// because their text is shown to the user verbatim.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Transport(err.to_string())
    }
}

pub type BotResult<T> = Result<T, BotError>;
