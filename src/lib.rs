//! Tokenizer adapter
//!
//! Wraps an external tokenizer, whether it natively takes raw bytes or text,
//! behind one `encode(&str) -> Vec<TokenId>` call that returns the tokens the
//! text would get in the middle of a stream. See [`TokenizerAdapter`].
//!
//! Backends for Hugging Face `tokenizer.json` files, SentencePiece models and
//! plain encode closures live in [`tokenizer`]; [`config`] selects one from a
//! JSON file.

pub mod config;
pub mod error;
pub mod tokenizer;

pub use config::TokenizerConfig;
pub use error::{Error, Result};
pub use tokenizer::{
    CallableTokenizer, HfTokenizer, InputKind, SENTINEL_PREFIX, SentencePieceTokenizer, TokenId,
    Tokenizer, TokenizerAdapter, TokenizerInput, Vocabulary,
};
