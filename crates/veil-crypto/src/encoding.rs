//! Standard base64 (RFC 4648, with padding).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{CryptoError, Result};

/// Encode bytes as standard padded base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard padded base64.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Number of characters padded base64 produces for `len` input bytes.
pub const fn encoded_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}

/// Whether every character of `text` belongs to the standard base64 alphabet
/// (including the `=` padding character).
pub fn is_base64_alphabet(text: &str) -> bool {
    text.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_len() {
        assert_eq!(encoded_len(0), 0);
        assert_eq!(encoded_len(1), 4);
        assert_eq!(encoded_len(3), 4);
        assert_eq!(encoded_len(256), 344);
        assert_eq!(encoded_len(294), 392);
    }

    #[test]
    fn test_encoded_len_matches_engine() {
        for len in [1usize, 2, 16, 31, 32, 33, 256] {
            assert_eq!(encode(&vec![0xA5; len]).len(), encoded_len(len));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!").is_err());
    }

    #[test]
    fn test_alphabet() {
        assert!(is_base64_alphabet("AZaz09+/=="));
        assert!(!is_base64_alphabet("abc-def"));
        assert!(!is_base64_alphabet("abc\ndef"));
    }
}
