use sentencepiece::SentencePieceProcessor;
use std::path::Path;

use log::{info, warn};

use super::vocab::{WORD_BOUNDARY, piece_to_bytes};
use super::{InputKind, TokenId, Tokenizer, TokenizerInput, Vocabulary};
use crate::{Error, Result};

/// SentencePiece backend
///
/// This struct wraps `sentencepiece::SentencePieceProcessor`, the tokenizer
/// format used by models like Mistral and Llama 2. SentencePiece works on
/// text, so byte input is rejected.
///
/// # Thread Safety
/// The underlying processor is `Send + Sync`, so one instance can serve
/// concurrent encode calls.
pub struct SentencePieceTokenizer {
    /// Internal SentencePiece processor
    inner: SentencePieceProcessor,
    vocab: Vocabulary,
}

impl SentencePieceTokenizer {
    /// Load a SentencePiece model file
    ///
    /// # Arguments
    /// * `path` - Path to the SentencePiece model file (typically `tokenizer.model`)
    /// * `eos_token_id` - Overrides the model's end-of-sequence id
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be opened or is not a valid SentencePiece model
    /// - The model defines no end-of-sequence id and none was given
    ///
    /// # Performance Note
    /// Loading decodes every piece once to build the token byte table.
    /// This is typically done once during initialization.
    pub fn load_from_file<P: AsRef<Path>>(path: P, eos_token_id: Option<TokenId>) -> Result<Self> {
        let path = path.as_ref();
        let inner = SentencePieceProcessor::open(path)
            .map_err(|e| Error::Tokenizer(format!("Failed to load tokenizer: {}", e)))?;
        info!("Loaded SentencePiece model from {}", path.display());
        Self::new(inner, eos_token_id)
    }

    pub fn new(inner: SentencePieceProcessor, eos_token_id: Option<TokenId>) -> Result<Self> {
        let eos_token_id = eos_token_id
            .or_else(|| inner.eos_id())
            .ok_or_else(|| Error::MissingSpecialToken("eos".to_string()))?;
        let bos_token_id = inner.bos_id();

        let tokens = token_table(&inner);
        info!(
            "SentencePiece vocabulary: {} tokens, eos={}, bos={:?}",
            tokens.len(),
            eos_token_id,
            bos_token_id
        );

        Ok(Self {
            inner,
            vocab: Vocabulary::new(eos_token_id, bos_token_id, tokens),
        })
    }

    pub fn inner(&self) -> &SentencePieceProcessor {
        &self.inner
    }
}

/// Raw bytes of every piece, indexed by id
///
/// The processor only exposes pieces through decoding. A lone decoded piece
/// loses its leading word-boundary space and byte pieces above 0x7F decode
/// to U+FFFD, so both are recovered by looking the piece back up.
fn token_table(inner: &SentencePieceProcessor) -> Vec<Vec<u8>> {
    let unk_id = inner.unk_id();
    let mut tokens: Vec<Option<Vec<u8>>> = vec![None; inner.len()];

    for b in 0..=255u8 {
        if let Ok(Some(id)) = inner.piece_to_id(&format!("<0x{:02X}>", b)) {
            if id != unk_id {
                if let Some(slot) = tokens.get_mut(id as usize) {
                    *slot = Some(vec![b]);
                }
            }
        }
    }

    let mut undecodable = 0usize;
    let tokens: Vec<Vec<u8>> = tokens
        .into_iter()
        .enumerate()
        .map(|(id, slot)| {
            if let Some(bytes) = slot {
                return bytes;
            }
            let id = id as TokenId;
            match inner.decode_piece_ids(&[id]) {
                Ok(decoded) => {
                    let mut bytes = piece_to_bytes(&decoded, false);
                    if id != unk_id && !decoded.starts_with(' ') {
                        let candidate = format!("{}{}", WORD_BOUNDARY, decoded.replace(' ', "\u{2581}"));
                        if matches!(inner.piece_to_id(&candidate), Ok(Some(found)) if found == id) {
                            bytes.insert(0, b' ');
                        }
                    }
                    bytes
                }
                Err(_) => {
                    undecodable += 1;
                    Vec::new()
                }
            }
        })
        .collect();
    if undecodable > 0 {
        warn!("{} SentencePiece ids could not be decoded, stored as empty", undecodable);
    }
    tokens
}

impl Tokenizer for SentencePieceTokenizer {
    fn encode(&self, input: TokenizerInput<'_>) -> Result<Vec<TokenId>> {
        let text = match input {
            TokenizerInput::Text(text) => text,
            TokenizerInput::Bytes(_) => {
                return Err(Error::UnsupportedInput {
                    kind: InputKind::Bytes,
                });
            }
        };
        // Each piece carries its id and surface string; only ids are kept
        let pieces = self
            .inner
            .encode(text)
            .map_err(|e| Error::Tokenizer(format!("Failed to encode text: {}", e)))?;
        Ok(pieces.iter().map(|piece| piece.id).collect())
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerAdapter;

    const NORMAL: u64 = 1;
    const UNKNOWN: u64 = 2;
    const CONTROL: u64 = 3;
    const BYTE: u64 = 6;

    /// Ids of the pieces in the test model
    const FIRST_BYTE_ID: TokenId = 3;
    const SENTINEL_ID: TokenId = 259;
    const HELLO_WORD_ID: TokenId = 260;
    const HELLO_ID: TokenId = 261;
    const BOUNDARY_ID: TokenId = 263;

    fn varint(out: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    fn field_varint(out: &mut Vec<u8>, field: u64, value: u64) {
        varint(out, field << 3);
        varint(out, value);
    }

    fn field_bytes(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
        varint(out, (field << 3) | 2);
        varint(out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    fn field_f32(out: &mut Vec<u8>, field: u64, value: f32) {
        varint(out, (field << 3) | 5);
        out.extend_from_slice(&value.to_le_bytes());
    }

    /// Serialized unigram `ModelProto` with byte fallback and a dummy
    /// prefix, the way Llama-style models are set up
    fn model_proto(with_eos: bool) -> Vec<u8> {
        let mut pieces: Vec<(String, f32, u64)> = vec![
            ("<unk>".into(), 0.0, UNKNOWN),
            ("<s>".into(), 0.0, CONTROL),
            ("</s>".into(), 0.0, if with_eos { CONTROL } else { NORMAL }),
        ];
        pieces.extend((0..=255u8).map(|b| (format!("<0x{:02X}>", b), 0.0, BYTE)));
        pieces.extend([
            ("\x02".to_string(), -1.0, NORMAL),
            ("\u{2581}hello".to_string(), -1.0, NORMAL),
            ("hello".to_string(), -2.0, NORMAL),
            ("\u{2581}world".to_string(), -1.0, NORMAL),
            ("\u{2581}".to_string(), -3.0, NORMAL),
        ]);

        let mut proto = Vec::new();
        for (piece, score, kind) in &pieces {
            let mut msg = Vec::new();
            field_bytes(&mut msg, 1, piece.as_bytes());
            field_f32(&mut msg, 2, *score);
            field_varint(&mut msg, 3, *kind);
            field_bytes(&mut proto, 1, &msg);
        }

        let mut trainer = Vec::new();
        field_varint(&mut trainer, 3, 1); // unigram
        field_varint(&mut trainer, 35, 1); // byte_fallback
        field_bytes(&mut proto, 2, &trainer);

        let mut normalizer = Vec::new();
        field_bytes(&mut normalizer, 1, b"identity");
        field_varint(&mut normalizer, 3, 1); // add_dummy_prefix
        field_varint(&mut normalizer, 4, 0); // remove_extra_whitespaces
        field_varint(&mut normalizer, 5, 1); // escape_whitespaces
        field_bytes(&mut proto, 3, &normalizer);
        proto
    }

    fn processor(with_eos: bool) -> SentencePieceProcessor {
        SentencePieceProcessor::from_serialized_proto(&model_proto(with_eos))
            .expect("Failed to load test model")
    }

    fn tokenizer() -> SentencePieceTokenizer {
        match SentencePieceTokenizer::new(processor(true), None) {
            Ok(tok) => tok,
            Err(e) => panic!("Failed to build tokenizer: {}", e),
        }
    }

    #[test]
    fn test_load_missing_model_fails() {
        let result = SentencePieceTokenizer::load_from_file("does/not/exist/tokenizer.model", None);
        assert!(matches!(result, Err(Error::Tokenizer(_))));
    }

    #[test]
    fn test_load_invalid_model_fails() {
        let path = std::env::temp_dir().join(format!("sp-invalid-{}.model", std::process::id()));
        std::fs::write(&path, b"not a sentencepiece model").unwrap();
        let result = SentencePieceTokenizer::load_from_file(&path, Some(2));
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("sp-valid-{}.model", std::process::id()));
        std::fs::write(&path, model_proto(true)).unwrap();
        let result = SentencePieceTokenizer::load_from_file(&path, None);
        let _ = std::fs::remove_file(&path);
        let tok = result.ok().expect("Failed to load model file");
        assert_eq!(tok.vocabulary().len(), 264);
    }

    #[test]
    fn test_encode_text() {
        let tok = tokenizer();
        let ids = tok.encode(TokenizerInput::Text("hello")).unwrap();
        assert_eq!(ids, vec![HELLO_WORD_ID]);
    }

    #[test]
    fn test_rejects_byte_input() {
        let tok = tokenizer();
        let err = tok.encode(TokenizerInput::Bytes(b"hello")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput { kind: InputKind::Bytes }));
    }

    #[test]
    fn test_special_ids_from_model() {
        let tok = tokenizer();
        assert_eq!(tok.vocabulary().eos_token_id, 2);
        assert_eq!(tok.vocabulary().bos_token_id, Some(1));
    }

    #[test]
    fn test_eos_override() {
        let tok = SentencePieceTokenizer::new(processor(true), Some(7)).ok().unwrap();
        assert_eq!(tok.vocabulary().eos_token_id, 7);

        // A model without an eos control piece needs the override
        let tok = SentencePieceTokenizer::new(processor(false), Some(2)).ok().unwrap();
        assert_eq!(tok.vocabulary().eos_token_id, 2);
    }

    #[test]
    fn test_missing_eos() {
        let err = SentencePieceTokenizer::new(processor(false), None).err().unwrap();
        assert!(matches!(err, Error::MissingSpecialToken(ref t) if t == "eos"));
    }

    #[test]
    fn test_byte_pieces_keep_their_byte() {
        let tok = tokenizer();
        let vocab = tok.vocabulary();
        for b in [0x00u8, 0x41, 0x80, 0xE3, 0xFF] {
            let id = FIRST_BYTE_ID + b as TokenId;
            assert_eq!(vocab.token_bytes(id), Some(&[b][..]), "byte piece <0x{:02X}>", b);
        }
    }

    #[test]
    fn test_word_boundary_pieces_keep_their_space() {
        let tok = tokenizer();
        let vocab = tok.vocabulary();
        assert_eq!(vocab.token_bytes(HELLO_WORD_ID), Some(&b" hello"[..]));
        assert_eq!(vocab.token_bytes(HELLO_ID), Some(&b"hello"[..]));
        assert_eq!(vocab.token_bytes(SENTINEL_ID), Some(&b"\x02"[..]));
        assert_eq!(vocab.token_bytes(BOUNDARY_ID), Some(&b" "[..]));
        // Control pieces have no surface form
        assert_eq!(vocab.token_bytes(1), Some(&b""[..]));
    }

    #[test]
    fn test_adapter_over_sentencepiece() {
        let adapter = TokenizerAdapter::new(tokenizer()).unwrap();
        assert!(!adapter.accepts_bytes());
        assert_eq!(adapter.input_kind(), InputKind::Text);
        // The dummy prefix lands on the sentinel, not on the text
        assert_eq!(adapter.prefix_tokens(), &[BOUNDARY_ID, SENTINEL_ID]);
        assert_eq!(adapter.encode(" hello").unwrap(), vec![HELLO_WORD_ID]);
        assert_eq!(adapter.encode("hello").unwrap(), vec![HELLO_ID]);
        assert!(adapter.encode("").unwrap().is_empty());
    }
}
