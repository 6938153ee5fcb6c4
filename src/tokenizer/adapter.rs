use std::sync::Arc;

use log::{debug, error};

use super::{InputKind, TokenId, Tokenizer, TokenizerInput, Vocabulary};
use crate::{Error, Result};

/// Prepended to every input so its tokens come out as they would mid-stream.
/// Assumed not to merge with whatever follows it; `encode` checks this.
pub const SENTINEL_PREFIX: &str = "\x02";

const PROBE_INPUT: &[u8] = b"test";

/// Normalizes a byte- or text-based tokenizer into a single
/// `encode(&str) -> Vec<TokenId>` contract
///
/// Many tokenizers treat the first token of an input differently from the
/// same text in the middle of a stream (leading-space conventions, word-start
/// markers). The adapter always tokenizes `SENTINEL_PREFIX + text` and drops
/// the sentinel's own tokens, so results can be appended to tokens already
/// produced for earlier text.
///
/// All state is fixed at construction. `encode` takes `&self`, so the adapter
/// can be shared across threads whenever the wrapped tokenizer is `Sync`.
pub struct TokenizerAdapter<T> {
    inner: T,
    vocab: Vocabulary,
    accepts_bytes: bool,
    prefix_tokens: Vec<TokenId>,
}

impl<T: Tokenizer> TokenizerAdapter<T> {
    /// Wrap a tokenizer, detecting its calling convention and calibrating
    /// the sentinel prefix
    ///
    /// # Errors
    /// Returns an error if the tokenizer cannot encode the sentinel prefix.
    /// A failing byte probe is not an error: it selects text input.
    pub fn new(inner: T) -> Result<Self> {
        let accepts_bytes = match inner.encode(TokenizerInput::Bytes(PROBE_INPUT)) {
            Ok(_) => true,
            Err(e) => {
                debug!("Byte probe rejected, using text input: {}", e);
                false
            }
        };
        let vocab = inner.vocabulary().clone();
        let prefix_tokens = encode_with(&inner, accepts_bytes, SENTINEL_PREFIX)?;
        debug!(
            "Tokenizer adapter ready: accepts_bytes={}, prefix_tokens={:?}, vocab_size={}",
            accepts_bytes,
            prefix_tokens,
            vocab.len()
        );

        Ok(Self {
            inner,
            vocab,
            accepts_bytes,
            prefix_tokens,
        })
    }

    /// Encode `text` as the tokenizer would mid-stream
    ///
    /// # Errors
    /// Propagates any error of the wrapped tokenizer, and returns
    /// [`Error::PrefixMismatch`] if the sentinel's tokens merged with `text`.
    pub fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut prefixed = String::with_capacity(SENTINEL_PREFIX.len() + text.len());
        prefixed.push_str(SENTINEL_PREFIX);
        prefixed.push_str(text);

        let mut tokens = encode_with(&self.inner, self.accepts_bytes, &prefixed)?;
        if !tokens.starts_with(&self.prefix_tokens) {
            let found = tokens[..self.prefix_tokens.len().min(tokens.len())].to_vec();
            error!(
                "Sentinel prefix mismatch for {:?}: expected {:?}, got {:?}",
                text, self.prefix_tokens, found
            );
            return Err(Error::PrefixMismatch {
                text: text.to_owned(),
                expected: self.prefix_tokens.clone(),
                found,
            });
        }
        tokens.drain(..self.prefix_tokens.len());
        Ok(tokens)
    }

    pub fn eos_token_id(&self) -> TokenId {
        self.vocab.eos_token_id
    }

    pub fn bos_token_id(&self) -> Option<TokenId> {
        self.vocab.bos_token_id
    }

    /// Token byte table, the same allocation the wrapped tokenizer exposes
    pub fn tokens(&self) -> &Arc<[Vec<u8>]> {
        &self.vocab.tokens
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn token_bytes(&self, id: TokenId) -> Option<&[u8]> {
        self.vocab.token_bytes(id)
    }

    pub fn accepts_bytes(&self) -> bool {
        self.accepts_bytes
    }

    pub fn input_kind(&self) -> InputKind {
        if self.accepts_bytes {
            InputKind::Bytes
        } else {
            InputKind::Text
        }
    }

    /// Tokens of `SENTINEL_PREFIX` alone
    pub fn prefix_tokens(&self) -> &[TokenId] {
        &self.prefix_tokens
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

fn encode_with<T: Tokenizer>(tokenizer: &T, accepts_bytes: bool, text: &str) -> Result<Vec<TokenId>> {
    if accepts_bytes {
        tokenizer.encode(TokenizerInput::Bytes(text.as_bytes()))
    } else {
        tokenizer.encode(TokenizerInput::Text(text))
    }
}

impl<T> std::fmt::Debug for TokenizerAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerAdapter")
            .field("accepts_bytes", &self.accepts_bytes)
            .field("prefix_tokens", &self.prefix_tokens)
            .field("eos_token_id", &self.vocab.eos_token_id)
            .field("bos_token_id", &self.vocab.bos_token_id)
            .field("vocab_size", &self.vocab.len())
            .finish_non_exhaustive()
    }
}
