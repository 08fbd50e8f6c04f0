//! Relay registration and listing.
//!
//! ## Registration rules
//!
//! Checked in this order; the first failure wins and nothing is stored:
//!
//! 1. `nodeId` present and non-zero, `pubKey` present and non-empty
//! 2. `nodeId` at most [`MAX_ENDPOINT_ID`], the widest id a destination
//!    field can carry
//! 3. `pubKey` is exactly [`ENCODED_PUBLIC_KEY_LEN`] base64 characters
//! 4. `nodeId` not already registered
//!
//! The key is checked for shape only. A well-shaped key that is not a valid
//! RSA key is accepted here and fails when a sender tries to build a circuit
//! through it.

use tracing::{debug, info};
use veil_crypto::encoding::is_base64_alphabet;
use veil_crypto::rsa_oaep::ENCODED_PUBLIC_KEY_LEN;
use veil_types::{Node, RelayId, MAX_ENDPOINT_ID};

use crate::{DirectoryError, Result};

/// In-memory relay registry. Registration order is kept for listing.
#[derive(Clone, Debug, Default)]
pub struct NodeDirectory {
    nodes: Vec<Node>,
}

impl NodeDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay.
    ///
    /// Both arguments are optional so a request body with a missing field can
    /// be passed straight through and rejected with
    /// [`DirectoryError::MissingField`].
    pub fn register(&mut self, node_id: Option<RelayId>, pub_key: Option<String>) -> Result<&Node> {
        let node_id = node_id
            .filter(|id| id.0 != 0)
            .ok_or(DirectoryError::MissingField("nodeId"))?;
        let pub_key = pub_key
            .filter(|key| !key.is_empty())
            .ok_or(DirectoryError::MissingField("pubKey"))?;

        if node_id.0 > MAX_ENDPOINT_ID {
            return Err(DirectoryError::NodeIdOutOfRange(node_id));
        }

        validate_key_format(&pub_key)?;

        if self.get(node_id).is_some() {
            debug!("Rejected duplicate registration for node {}", node_id);
            return Err(DirectoryError::DuplicateNode(node_id));
        }

        info!("Node {} registered ({} total)", node_id, self.nodes.len() + 1);
        self.nodes.push(Node { node_id, pub_key });
        self.nodes
            .last()
            .ok_or(DirectoryError::MissingField("nodeId"))
    }

    /// All registered relays, in registration order.
    pub fn list(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up one relay.
    pub fn get(&self, node_id: RelayId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Number of registered relays.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no relay has registered yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn validate_key_format(pub_key: &str) -> Result<()> {
    if pub_key.len() != ENCODED_PUBLIC_KEY_LEN || !is_base64_alphabet(pub_key) {
        return Err(DirectoryError::InvalidKeyFormat {
            expected: ENCODED_PUBLIC_KEY_LEN,
            actual: pub_key.chars().count(),
        });
    }
    Ok(())
}
