//! # veil-onion
//!
//! Layered-encryption routing over 3-relay circuits.
//!
//! - [`circuit`] - Relay selection, circuit construction, dispatch to the entry hop
//! - [`layer`] - Building the nested envelope and peeling one layer
//! - [`relay`] - [`RouterNode`]: peel, then forward or deliver
//! - [`user`] - [`UserEndpoint`]: mailbox and message origination
//!
//! ## Wire message
//!
//! ```text
//! base64(RSA-OAEP(aes_key))      344 chars
//! base64(AES-256-CBC(zero IV, destination_field[10] || remainder))
//! ```
//!
//! `remainder` is the next wire message when the destination is a relay, and
//! the plaintext when it is a user.
//!
//! ## Key Parameters
//!
//! | Parameter | Value |
//! |---|---|
//! | Circuit hops | 3 |
//! | Relay key | RSA-2048, OAEP (SHA-1) |
//! | Layer cipher | AES-256-CBC, PKCS#7, zero IV |
//! | Destination field | 10 ASCII digits (tag + 9-digit id) |

pub mod circuit;
pub mod layer;
pub mod relay;
pub mod user;

pub use circuit::{build_circuit, send, Circuit, CircuitBuilder, Hop};
pub use layer::{encrypt_for_circuit, peel, PeeledLayer};
pub use relay::{RelayState, RouterNode};
pub use user::{Mailbox, UserEndpoint};
pub use veil_types::CIRCUIT_HOPS;

use veil_crypto::CryptoError;
use veil_transport::{Endpoint, ErrorCode, TransportError};

/// Error types for onion routing operations.
#[derive(Debug, thiserror::Error)]
pub enum OnionError {
    /// Not enough relays registered to build a circuit.
    #[error("insufficient nodes: need {need}, have {have}")]
    InsufficientNodes { need: usize, have: usize },

    /// The requested path is not a valid circuit.
    #[error("circuit construction failed: {0}")]
    CircuitConstruction(String),

    /// A layer could not be decrypted with this relay's key.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// A wire message or decrypted layer is not shaped like one.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The next hop or mailbox could not be reached.
    #[error("forwarding to {to} failed: {source}")]
    Forwarding {
        to: Endpoint,
        #[source]
        source: TransportError,
    },

    /// A request was rejected before any work was done.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Talking to another role failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Cryptographic error from veil-crypto.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl OnionError {
    /// Error code reported to the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            OnionError::InsufficientNodes { .. } => ErrorCode::InsufficientNodes,
            OnionError::Decryption(_) => ErrorCode::DecryptionError,
            OnionError::MalformedMessage(_) => ErrorCode::MalformedMessage,
            OnionError::Forwarding { .. } => ErrorCode::ForwardingFailure,
            OnionError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            OnionError::Transport(_) => ErrorCode::TransportFailure,
            OnionError::CircuitConstruction(_) | OnionError::Crypto(_) => ErrorCode::Internal,
        }
    }
}

/// Convenience result type for onion routing operations.
pub type Result<T> = std::result::Result<T, OnionError>;
