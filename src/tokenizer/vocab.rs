use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::TokenId;

/// SentencePiece word-boundary marker
pub(crate) const WORD_BOUNDARY: char = '\u{2581}';

/// Vocabulary metadata shared between a backend and its adapter
///
/// `tokens` is indexed by token ID and holds the raw bytes each token
/// stands for. It sits behind an `Arc` so cloning a `Vocabulary` keeps the
/// same table.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub eos_token_id: TokenId,
    pub bos_token_id: Option<TokenId>,
    pub tokens: Arc<[Vec<u8>]>,
}

impl Vocabulary {
    pub fn new(eos_token_id: TokenId, bos_token_id: Option<TokenId>, tokens: Vec<Vec<u8>>) -> Self {
        Self {
            eos_token_id,
            bos_token_id,
            tokens: Arc::from(tokens),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_bytes(&self, id: TokenId) -> Option<&[u8]> {
        self.tokens.get(id as usize).map(Vec::as_slice)
    }
}

/// Convert a backend piece string into the raw bytes it represents
///
/// Handles `<0xNN>` byte-fallback pieces, the GPT-2 byte-level alphabet
/// (only when `byte_level` is set) and the `▁` word-boundary marker.
pub fn piece_to_bytes(piece: &str, byte_level: bool) -> Vec<u8> {
    if let Some(byte) = byte_fallback(piece) {
        return vec![byte];
    }
    if byte_level {
        let table = byte_level_decoder();
        let decoded: Option<Vec<u8>> = piece.chars().map(|c| table.get(&c).copied()).collect();
        if let Some(bytes) = decoded {
            return bytes;
        }
    }
    piece.replace(WORD_BOUNDARY, " ").into_bytes()
}

fn byte_fallback(piece: &str) -> Option<u8> {
    let hex = piece.strip_prefix("<0x")?.strip_suffix('>')?;
    if hex.len() != 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}

/// Reverse of the GPT-2 `bytes_to_unicode` table
fn byte_level_decoder() -> &'static HashMap<char, u8> {
    static TABLE: OnceLock<HashMap<char, u8>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let printable = |b: u8| matches!(b, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF);
        let mut table = HashMap::with_capacity(256);
        let mut shifted = 0u32;
        for b in 0..=255u8 {
            let c = if printable(b) {
                char::from(b)
            } else {
                let c = char::from_u32(256 + shifted).unwrap_or(char::REPLACEMENT_CHARACTER);
                shifted += 1;
                c
            };
            table.insert(c, b);
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_fallback_piece() {
        assert_eq!(piece_to_bytes("<0x0A>", false), vec![b'\n']);
        assert_eq!(piece_to_bytes("<0xff>", true), vec![0xFF]);
        // Not a byte piece: wrong width
        assert_eq!(piece_to_bytes("<0x0>", false), b"<0x0>".to_vec());
        // Sign characters are not hex digits
        assert_eq!(piece_to_bytes("<0x+F>", false), b"<0x+F>".to_vec());
        assert_eq!(piece_to_bytes("<0x-1>", false), b"<0x-1>".to_vec());
    }

    #[test]
    fn test_word_boundary_marker() {
        assert_eq!(piece_to_bytes("\u{2581}hello", false), b" hello".to_vec());
    }

    #[test]
    fn test_byte_level_alphabet() {
        // 'Ġ' encodes a space, 'Ċ' a newline
        assert_eq!(piece_to_bytes("\u{120}world", true), b" world".to_vec());
        assert_eq!(piece_to_bytes("\u{10A}", true), vec![b'\n']);
        // Without byte-level decoding the piece is kept as UTF-8
        assert_eq!(piece_to_bytes("\u{120}", false), "\u{120}".as_bytes().to_vec());
    }

    #[test]
    fn test_byte_level_table_is_complete() {
        let table = byte_level_decoder();
        assert_eq!(table.len(), 256);
        let mut seen: Vec<u8> = table.values().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn test_vocabulary_lookup() {
        let vocab = Vocabulary::new(2, None, vec![b"a".to_vec(), b"b".to_vec(), Vec::new()]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.token_bytes(1), Some(&b"b"[..]));
        assert_eq!(vocab.token_bytes(3), None);
        let copy = vocab.clone();
        assert!(Arc::ptr_eq(&vocab.tokens, &copy.tokens));
    }
}
