use thiserror::Error;

/// Failures seen by API consumers. Cloneable so the synchronizer can both
/// record and return them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("todo not found")]
    NotFound,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}
