use std::path::Path;

use log::info;
use serde_json::Value;
use tokenizers::decoders::DecoderWrapper;

use super::vocab::piece_to_bytes;
use super::{InputKind, TokenId, Tokenizer, TokenizerInput, Vocabulary};
use crate::{Error, Result};

/// Hugging Face `tokenizers` backend
///
/// Text input only. Special tokens are not added on encode unless
/// [`HfTokenizer::with_special_tokens`] is enabled, since the adapter
/// expects the bare tokenization of its input.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    vocab: Vocabulary,
    add_special_tokens: bool,
}

impl HfTokenizer {
    /// Load a `tokenizer.json` file
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or a special token is
    /// missing from the vocabulary.
    pub fn from_file<P: AsRef<Path>>(path: P, eos_token: &str, bos_token: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(Error::tokenizer)?;
        info!("Loaded Hugging Face tokenizer from {}", path.display());
        Self::new(inner, eos_token, bos_token)
    }

    /// Wrap an already constructed tokenizer
    pub fn new(inner: tokenizers::Tokenizer, eos_token: &str, bos_token: Option<&str>) -> Result<Self> {
        let eos_token_id = resolve_special(&inner, eos_token)?;
        let bos_token_id = bos_token.map(|t| resolve_special(&inner, t)).transpose()?;

        let byte_level = inner.get_decoder().is_some_and(is_byte_level);
        let size = inner.get_vocab_size(true);
        let tokens: Vec<Vec<u8>> = (0..size as TokenId)
            .map(|id| {
                inner
                    .id_to_token(id)
                    .map(|piece| piece_to_bytes(&piece, byte_level))
                    .unwrap_or_default()
            })
            .collect();
        info!(
            "Hugging Face vocabulary: {} tokens, byte_level={}, eos={}, bos={:?}",
            tokens.len(),
            byte_level,
            eos_token_id,
            bos_token_id
        );

        Ok(Self {
            inner,
            vocab: Vocabulary::new(eos_token_id, bos_token_id, tokens),
            add_special_tokens: false,
        })
    }

    pub fn with_special_tokens(mut self, add_special_tokens: bool) -> Self {
        self.add_special_tokens = add_special_tokens;
        self
    }

    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.inner
    }
}

fn resolve_special(tokenizer: &tokenizers::Tokenizer, token: &str) -> Result<TokenId> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| Error::MissingSpecialToken(token.to_string()))
}

/// Whether the decoder, possibly nested in a `Sequence`, is byte-level
fn is_byte_level(decoder: &DecoderWrapper) -> bool {
    match decoder {
        DecoderWrapper::ByteLevel(_) => true,
        // Sequence members are private; walk the serialized form instead
        DecoderWrapper::Sequence(_) => serde_json::to_value(decoder)
            .map(|value| contains_byte_level(&value))
            .unwrap_or(false),
        _ => false,
    }
}

fn contains_byte_level(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.get("type").and_then(Value::as_str) == Some("ByteLevel")
                || map.values().any(contains_byte_level)
        }
        Value::Array(items) => items.iter().any(contains_byte_level),
        _ => false,
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        let text = match input {
            TokenizerInput::Text(text) => text,
            TokenizerInput::Bytes(_) => {
                return Err(Error::UnsupportedInput {
                    kind: InputKind::Bytes,
                });
            }
        };
        let encoding = self
            .inner
            .encode(text, self.add_special_tokens)
            .map_err(Error::tokenizer)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}
