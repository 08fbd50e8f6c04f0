//! # veil-crypto
//!
//! Cryptographic primitives behind the veil onion layer format.
//!
//! The suite is fixed; nothing is negotiated between hops.
//!
//! ## Modules
//!
//! - [`rsa_oaep`] - RSA-2048 key pairs and OAEP key transport
//! - [`aes_cbc`] - AES-256-CBC with PKCS#7 padding for layer payloads
//! - [`encoding`] - Standard base64, the textual form of every key and layer
//!
//! ## Layer sizes
//!
//! | Item | Bytes | Encoded chars |
//! |---|---|---|
//! | RSA-OAEP ciphertext of the layer key | 256 | 344 |
//! | SPKI DER public key | 294 | 392 |
//! | AES key | 32 | - |
//! | AES IV (always zero) | 16 | - |

pub mod aes_cbc;
pub mod encoding;
pub mod rsa_oaep;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// RSA key generation, encryption or decryption failed.
    #[error("RSA error: {0}")]
    Rsa(String),

    /// A key could not be parsed or serialized.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// AES-CBC decryption failed (bad block length or padding).
    #[error("symmetric decryption failed")]
    SymmetricDecryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Base64 decoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
