//! Layer construction and peeling.
//!
//! ## Building (sender, exit hop first)
//!
//! ```text
//! target  = user D
//! payload = plaintext
//! for hop in reverse(circuit):
//!     k       = fresh AES-256 key
//!     payload = b64(RSA(hop.pk, k)) || b64(AES(k, field(target) || payload))
//!     target  = relay hop.id
//! ```
//!
//! ## Peeling (relay)
//!
//! | Step | Failure |
//! |---|---|
//! | split at 344 chars | malformed |
//! | base64 of either slice | malformed |
//! | RSA-OAEP unwrap of the key | decryption |
//! | key length, AES-CBC padding | decryption |
//! | destination field, UTF-8 remainder | malformed |

use veil_crypto::aes_cbc::{self, SymmetricKey, ZERO_IV};
use veil_crypto::encoding;
use veil_crypto::rsa_oaep::{OaepPublicKey, RsaKeyPair, ENCODED_KEY_CIPHERTEXT_LEN};
use veil_types::{Destination, UserId, DESTINATION_FIELD_LEN};

use crate::circuit::Circuit;
use crate::{OnionError, Result};

/// What one relay learns by peeling its layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeeledLayer {
    /// Where `remainder` goes next.
    pub next: Destination,
    /// The inner wire message, or the plaintext at the exit hop.
    pub remainder: String,
}

/// Build the full wire message for `plaintext` travelling through `circuit`
/// to `destination`.
pub fn encrypt_for_circuit(circuit: &Circuit, destination: UserId, plaintext: &str) -> Result<String> {
    let mut target = Destination::User(destination);
    let mut payload = plaintext.to_string();

    for hop in circuit.hops().iter().rev() {
        payload = wrap_layer(&hop.public_key, target, &payload)?;
        target = Destination::Relay(hop.relay_id);
    }

    Ok(payload)
}

/// Wrap `remainder` in one layer addressed to the holder of `public_key`.
pub fn wrap_layer(public_key: &OaepPublicKey, next: Destination, remainder: &str) -> Result<String> {
    let mut inner = next
        .encode_field()
        .map_err(|e| OnionError::InvalidRequest(format!("cannot address {next}: {e}")))?;
    inner.push_str(remainder);

    let key = SymmetricKey::generate();
    let ciphertext = aes_cbc::encrypt(&key, &ZERO_IV, inner.as_bytes());
    let wrapped_key = public_key.encrypt(key.as_bytes())?;

    let mut wire = encoding::encode(&wrapped_key);
    wire.push_str(&encoding::encode(&ciphertext));
    Ok(wire)
}

/// Split a wire message into its wrapped-key slice and payload slice.
pub fn split_envelope(wire: &str) -> Result<(&str, &str)> {
    if wire.len() <= ENCODED_KEY_CIPHERTEXT_LEN || !wire.is_char_boundary(ENCODED_KEY_CIPHERTEXT_LEN) {
        return Err(OnionError::MalformedMessage(format!(
            "expected more than {} characters, got {}",
            ENCODED_KEY_CIPHERTEXT_LEN,
            wire.len()
        )));
    }
    Ok(wire.split_at(ENCODED_KEY_CIPHERTEXT_LEN))
}

/// Remove one layer with this relay's key pair.
pub fn peel(keys: &RsaKeyPair, wire: &str) -> Result<PeeledLayer> {
    let (key_part, payload_part) = split_envelope(wire)?;

    let wrapped_key = encoding::decode(key_part)
        .map_err(|e| OnionError::MalformedMessage(format!("key slice: {e}")))?;
    let key_bytes = keys
        .decrypt(&wrapped_key)
        .map_err(|e| OnionError::Decryption(e.to_string()))?;
    let key = SymmetricKey::from_slice(&key_bytes)
        .map_err(|e| OnionError::Decryption(e.to_string()))?;

    let ciphertext = encoding::decode(payload_part)
        .map_err(|e| OnionError::MalformedMessage(format!("payload slice: {e}")))?;
    let mut inner = aes_cbc::decrypt(&key, &ZERO_IV, &ciphertext)
        .map_err(|e| OnionError::Decryption(e.to_string()))?;

    if inner.len() < DESTINATION_FIELD_LEN {
        return Err(OnionError::MalformedMessage(format!(
            "decrypted layer is {} bytes, shorter than the destination field",
            inner.len()
        )));
    }
    let next = Destination::parse_field(&inner[..DESTINATION_FIELD_LEN])
        .map_err(|e| OnionError::MalformedMessage(e.to_string()))?;

    let remainder = String::from_utf8(inner.split_off(DESTINATION_FIELD_LEN))
        .map_err(|_| OnionError::MalformedMessage("remainder is not UTF-8".to_string()))?;

    Ok(PeeledLayer { next, remainder })
}
