//! # veil-directory
//!
//! The node directory: the authoritative list of relays and their public keys.
//!
//! - [`registry`] - [`NodeDirectory`], registration rules and listing
//! - [`service`] - [`DirectoryService`], the directory as a network role
//!
//! Entries are never removed or replaced. State lives only as long as the
//! process.

pub mod registry;
pub mod service;

pub use registry::NodeDirectory;
pub use service::DirectoryService;

use veil_transport::ErrorCode;
use veil_types::{RelayId, MAX_ENDPOINT_ID};

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// `nodeId` or `pubKey` was absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The public key is not a base64 SPKI string of the expected length.
    #[error("invalid key format: expected {expected} base64 characters, got {actual}")]
    InvalidKeyFormat { expected: usize, actual: usize },

    /// The identifier does not fit the nine-digit destination field, so no
    /// sender could ever route through it.
    #[error("node id {0} exceeds {MAX_ENDPOINT_ID}")]
    NodeIdOutOfRange(RelayId),

    /// A relay with this identifier is already registered.
    #[error("node {0} is already registered")]
    DuplicateNode(RelayId),
}

impl DirectoryError {
    /// Error code reported to the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            DirectoryError::MissingField(_) => ErrorCode::MissingField,
            DirectoryError::InvalidKeyFormat { .. } => ErrorCode::InvalidKeyFormat,
            DirectoryError::NodeIdOutOfRange(_) => ErrorCode::InvalidRequest,
            DirectoryError::DuplicateNode(_) => ErrorCode::DuplicateNode,
        }
    }
}

/// Convenience result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
