/// Error types shared across report service crates.
///
/// These errors represent failures in infrastructure components (configuration, the
/// chat-completion client) that any report service needs. Application-specific errors
/// should be defined in each service crate and wrap `CommonError` via `#[from]`.
use crate::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("openai client error: {0}")]
    OpenAi(#[from] OpenAiClientError),
}
