//! AES-256-CBC with PKCS#7 padding.
//!
//! Every layer payload is encrypted under a fresh 32-byte key with the fixed
//! all-zero IV in [`ZERO_IV`]. The key is never reused, but the IV is the same
//! for every hop and every message. That is part of the wire format: a relay
//! decrypts with [`ZERO_IV`] and nothing in the layer carries an IV.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// Key size for AES-256 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Block and IV size (128 bits = 16 bytes).
pub const BLOCK_SIZE: usize = 16;

/// The IV used for every layer.
pub const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// A per-layer AES-256 key, wiped on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
        Self { bytes }
    }

    /// Build a key from a recovered byte slice, which must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

/// Encrypt `plaintext`, appending PKCS#7 padding.
///
/// The output is always a whole number of blocks and at least one block long.
pub fn encrypt(key: &SymmetricKey, iv: &[u8; BLOCK_SIZE], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(&key.bytes.into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` and strip PKCS#7 padding.
///
/// Fails if the ciphertext is not block-aligned or the padding is invalid,
/// which is what a wrong key almost always produces.
pub fn decrypt(key: &SymmetricKey, iv: &[u8; BLOCK_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    Aes256CbcDec::new(&key.bytes.into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::SymmetricDecryption)
}
