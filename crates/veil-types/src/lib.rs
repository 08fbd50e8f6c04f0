//! # veil-types
//!
//! Shared identifiers and records used across the veil workspace.
//!
//! - [`ids`] - Relay and user identifiers, and the tagged [`Destination`]
//!   carried inside every onion layer
//! - [`node`] - Directory entries

pub mod ids;
pub mod node;

pub use ids::{Destination, FieldError, RelayId, UserId};
pub use node::Node;

/// Number of relays in a circuit.
pub const CIRCUIT_HOPS: usize = 3;

/// Length of the ASCII destination field at the front of every decrypted layer.
pub const DESTINATION_FIELD_LEN: usize = 10;

/// Largest identifier that fits in the destination field (9 digits after the tag).
pub const MAX_ENDPOINT_ID: u32 = 999_999_999;
