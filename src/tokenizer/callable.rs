use super::{InputKind, TokenId, Tokenizer, TokenizerInput, Vocabulary};
use crate::{Error, Result};

type EncodeFn = Box<dyn Fn(TokenizerInput<'_>) -> Result<Vec<TokenId>> + Send + Sync>;

/// Tokenizer backed by a plain encode function
///
/// This is the shape of most external tokenizers: a single callable over
/// either bytes or text, plus some vocabulary metadata. The variant it was
/// not built for is rejected with [`Error::UnsupportedInput`].
pub struct CallableTokenizer {
    encode_fn: EncodeFn,
    vocab: Vocabulary,
}

impl CallableTokenizer {
    /// Wrap an encode function that takes raw bytes
    pub fn from_bytes_fn<F>(vocab: Vocabulary, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<TokenId>> + Send + Sync + 'static,
    {
        let encode_fn: EncodeFn = Box::new(move |input: TokenizerInput<'_>| match input {
            TokenizerInput::Bytes(bytes) => f(bytes),
            TokenizerInput::Text(_) => Err(Error::UnsupportedInput {
                kind: InputKind::Text,
            }),
        });
        Self { encode_fn, vocab }
    }

    /// Wrap an encode function that takes text
    pub fn from_text_fn<F>(vocab: Vocabulary, f: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<TokenId>> + Send + Sync + 'static,
    {
        let encode_fn: EncodeFn = Box::new(move |input: TokenizerInput<'_>| match input {
            TokenizerInput::Text(text) => f(text),
            TokenizerInput::Bytes(_) => Err(Error::UnsupportedInput {
                kind: InputKind::Bytes,
            }),
        });
        Self { encode_fn, vocab }
    }
}

impl Tokenizer for CallableTokenizer {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        (self.encode_fn)(input)
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}

impl std::fmt::Debug for CallableTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableTokenizer")
            .field("vocab_size", &self.vocab.len())
            .field("eos_token_id", &self.vocab.eos_token_id)
            .finish_non_exhaustive()
    }
}
