use thiserror::Error;

use crate::tokenizer::{InputKind, TokenId};

/// Result type alias using the crate's Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Tokenizer does not accept {kind} input")]
    UnsupportedInput { kind: InputKind },

    #[error("Special token not found in vocabulary: {0}")]
    MissingSpecialToken(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sentinel prefix merged with the text that followed it.
    #[error(
        "Sentinel prefix tokenization changed for input {text:?}: expected {expected:?}, got {found:?}"
    )]
    PrefixMismatch {
        text: String,
        expected: Vec<TokenId>,
        found: Vec<TokenId>,
    },
}

impl Error {
    pub(crate) fn tokenizer<E: std::fmt::Display>(err: E) -> Self {
        Error::Tokenizer(err.to_string())
    }
}
