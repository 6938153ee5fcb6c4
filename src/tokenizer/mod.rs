/// Tokenizer module: the capability trait every backend implements, and the
/// adapter that turns any of them into a stable mid-stream text encoder.
///
/// Backends natively accept either raw bytes or text. They report the
/// convention they do not support by failing on it, which is what
/// [`TokenizerAdapter`] probes for at construction.
pub mod adapter;
pub mod callable;
pub mod huggingface;
pub mod sentencepiece;
pub mod vocab;

use std::fmt;
use std::sync::Arc;

use crate::Result;

pub use adapter::{SENTINEL_PREFIX, TokenizerAdapter};
pub use callable::CallableTokenizer;
pub use huggingface::HfTokenizer;
pub use sentencepiece::SentencePieceTokenizer;
pub use vocab::Vocabulary;

/// Integer identifier assigned by a tokenizer to a unit of text or bytes
pub type TokenId = u32;

/// The two native calling conventions a tokenizer may have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Bytes,
    Text,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Bytes => f.write_str("byte"),
            InputKind::Text => f.write_str("text"),
        }
    }
}

/// Input handed to [`Tokenizer::encode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerInput<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

impl TokenizerInput<'_> {
    pub fn kind(&self) -> InputKind {
        match self {
            TokenizerInput::Bytes(_) => InputKind::Bytes,
            TokenizerInput::Text(_) => InputKind::Text,
        }
    }
}

/// An external tokenizer as seen by the adapter
///
/// Implementations should return [`crate::Error::UnsupportedInput`] for the
/// input variant they cannot handle.
pub trait Tokenizer {
    /// Encode bytes or text into token IDs
    ///
    /// # Errors
    /// Returns an error on unsupported input kind or malformed input.
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>>;

    /// Vocabulary metadata (special ids and the token byte table)
    fn vocabulary(&self) -> &Vocabulary;
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        (**self).encode(input)
    }

    fn vocabulary(&self) -> &Vocabulary {
        (**self).vocabulary()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        (**self).encode(input)
    }

    fn vocabulary(&self) -> &Vocabulary {
        (**self).vocabulary()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        (**self).encode(input)
    }

    fn vocabulary(&self) -> &Vocabulary {
        (**self).vocabulary()
    }
}
