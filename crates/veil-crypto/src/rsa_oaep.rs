//! RSA-2048 key pairs and OAEP key transport.
//!
//! Each relay owns one [`RsaKeyPair`]. Senders only ever hold the relay's
//! [`OaepPublicKey`], parsed from the base64 SPKI string published in the
//! directory, and use it to wrap the per-layer AES key.
//!
//! OAEP uses SHA-1 for both the label hash and MGF1, which are the default
//! OAEP parameters of common RSA toolkits and keep layers interoperable with
//! them.
//!
//! ## Textual key forms
//!
//! - public: base64 of the DER `SubjectPublicKeyInfo` (PEM body without the
//!   header, footer or line breaks), always [`ENCODED_PUBLIC_KEY_LEN`] chars
//! - private: base64 of the DER PKCS#8 `PrivateKeyInfo`

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::encoding;
use crate::{CryptoError, Result};

/// RSA modulus size in bits.
pub const RSA_KEY_BITS: usize = 2048;

/// Length of an RSA ciphertext in bytes (the modulus size).
pub const RSA_CIPHERTEXT_LEN: usize = RSA_KEY_BITS / 8;

/// DER length of an RSA `SubjectPublicKeyInfo` with exponent 65537.
///
/// 38 bytes of ASN.1 framing around the modulus, including its leading zero.
pub const SPKI_DER_LEN: usize = RSA_CIPHERTEXT_LEN + 38;

/// Base64 length of a wrapped layer key: the first slice of every wire message.
pub const ENCODED_KEY_CIPHERTEXT_LEN: usize = encoding::encoded_len(RSA_CIPHERTEXT_LEN);

/// Base64 length of a published public key.
pub const ENCODED_PUBLIC_KEY_LEN: usize = encoding::encoded_len(SPKI_DER_LEN);

fn oaep() -> Oaep {
    Oaep::new::<Sha1>()
}

/// A relay's RSA key pair. Generated once and held for the life of the process.
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: OaepPublicKey,
}

impl RsaKeyPair {
    /// Generate a fresh 2048-bit key pair.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::Rsa(format!("key generation failed: {e}")))?;
        Ok(Self::from_private(private))
    }

    /// Rebuild a key pair from its base64 PKCS#8 form.
    pub fn from_private_key_b64(text: &str) -> Result<Self> {
        let der = encoding::decode(text)?;
        let private = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8: {e}")))?;
        Ok(Self::from_private(private))
    }

    fn from_private(private: RsaPrivateKey) -> Self {
        let public = OaepPublicKey {
            inner: RsaPublicKey::from(&private),
        };
        Self { private, public }
    }

    /// The public half.
    pub fn public_key(&self) -> &OaepPublicKey {
        &self.public
    }

    /// Base64 SPKI public key, as registered in the directory.
    pub fn public_key_b64(&self) -> Result<String> {
        self.public.to_b64()
    }

    /// Base64 PKCS#8 private key.
    pub fn private_key_b64(&self) -> Result<String> {
        let der = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8: {e}")))?;
        Ok(encoding::encode(der.as_bytes()))
    }

    /// Unwrap an OAEP ciphertext addressed to this key pair.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private
            .decrypt(oaep(), ciphertext)
            .map_err(|e| CryptoError::Rsa(format!("OAEP decryption failed: {e}")))
    }
}

/// An RSA public key used to wrap layer keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OaepPublicKey {
    inner: RsaPublicKey,
}

impl OaepPublicKey {
    /// Parse a base64 SPKI public key.
    pub fn from_b64(text: &str) -> Result<Self> {
        let der = encoding::decode(text)?;
        let inner = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::InvalidKey(format!("SPKI: {e}")))?;
        Ok(Self { inner })
    }

    /// Base64 SPKI form.
    pub fn to_b64(&self) -> Result<String> {
        let der = self
            .inner
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(format!("SPKI: {e}")))?;
        Ok(encoding::encode(der.as_bytes()))
    }

    /// Wrap `plaintext` with OAEP. The result is always [`RSA_CIPHERTEXT_LEN`] bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.inner
            .encrypt(&mut OsRng, oaep(), plaintext)
            .map_err(|e| CryptoError::Rsa(format!("OAEP encryption failed: {e}")))
    }
}
