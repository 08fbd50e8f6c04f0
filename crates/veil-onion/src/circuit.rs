//! Circuit construction and dispatch.
//!
//! A circuit is an ordered list of distinct relays: entry first, exit last.
//! Each hop carries the relay's parsed public key so layers can be built
//! without consulting the directory again.
//!
//! [`build_circuit`] samples relays uniformly at random from a directory
//! snapshot. [`CircuitBuilder`] assembles an explicit path.

use rand::seq::index;
use tracing::debug;
use veil_crypto::rsa_oaep::OaepPublicKey;
use veil_transport::{Endpoint, Request, Transport};
use veil_types::{Node, RelayId};

use crate::{OnionError, Result, CIRCUIT_HOPS};

/// One relay in a circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    /// The relay's identifier.
    pub relay_id: RelayId,
    /// The relay's public key, used to wrap this hop's layer key.
    pub public_key: OaepPublicKey,
}

impl Hop {
    /// Parse a directory entry into a hop.
    pub fn from_node(node: &Node) -> Result<Self> {
        let public_key = OaepPublicKey::from_b64(&node.pub_key).map_err(|e| {
            OnionError::CircuitConstruction(format!(
                "node {} has an unusable public key: {}",
                node.node_id, e
            ))
        })?;
        Ok(Self {
            relay_id: node.node_id,
            public_key,
        })
    }
}

/// An ordered path of distinct relays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circuit {
    hops: Vec<Hop>,
}

impl Circuit {
    /// Return the hops in order (entry first).
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Return the entry (first) hop.
    pub fn entry_hop(&self) -> &Hop {
        // A built circuit always has at least one hop.
        &self.hops[0]
    }

    /// Return the exit (last) hop.
    pub fn exit_hop(&self) -> &Hop {
        &self.hops[self.hops.len() - 1]
    }

    /// Return the relay identifiers in order.
    pub fn relay_ids(&self) -> Vec<RelayId> {
        self.hops.iter().map(|h| h.relay_id).collect()
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Always false for a built circuit.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Builder for circuits over an explicit relay path.
pub struct CircuitBuilder {
    hops: Vec<Hop>,
    size: usize,
}

impl CircuitBuilder {
    /// Create a builder for a [`CIRCUIT_HOPS`]-hop circuit.
    pub fn new() -> Self {
        Self::with_size(CIRCUIT_HOPS)
    }

    /// Create a builder for a circuit of `size` hops.
    pub fn with_size(size: usize) -> Self {
        Self {
            hops: Vec::with_capacity(size),
            size,
        }
    }

    /// Add a relay to the circuit path.
    ///
    /// Relays must be added in order: entry first, exit last.
    pub fn add_relay(mut self, node: &Node) -> Result<Self> {
        if self.hops.len() >= self.size {
            return Err(OnionError::CircuitConstruction(format!(
                "circuit already has {} hops (maximum {})",
                self.hops.len(),
                self.size,
            )));
        }
        if self.hops.iter().any(|h| h.relay_id == node.node_id) {
            return Err(OnionError::CircuitConstruction(format!(
                "node {} appears twice in the path",
                node.node_id
            )));
        }
        self.hops.push(Hop::from_node(node)?);
        Ok(self)
    }

    /// Build the circuit. Fails unless exactly `size` relays were added.
    pub fn build(self) -> Result<Circuit> {
        if self.size == 0 {
            return Err(OnionError::CircuitConstruction(
                "a circuit needs at least one hop".to_string(),
            ));
        }
        if self.hops.len() != self.size {
            return Err(OnionError::InsufficientNodes {
                need: self.size,
                have: self.hops.len(),
            });
        }
        Ok(Circuit { hops: self.hops })
    }
}

impl Default for CircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick `size` distinct relays uniformly at random, in random order.
///
/// Every ordered selection of distinct relays is equally likely.
pub fn build_circuit(nodes: &[Node], size: usize) -> Result<Circuit> {
    if nodes.len() < size {
        return Err(OnionError::InsufficientNodes {
            need: size,
            have: nodes.len(),
        });
    }

    let picks = index::sample(&mut rand::thread_rng(), nodes.len(), size);
    let mut builder = CircuitBuilder::with_size(size);
    for i in picks.iter() {
        builder = builder.add_relay(&nodes[i])?;
    }
    let circuit = builder.build()?;

    debug!(
        "Selected {} relays from {} candidates: {:?}",
        circuit.len(),
        nodes.len(),
        circuit.relay_ids()
    );
    Ok(circuit)
}

/// Deliver a wire message to the circuit's entry hop.
///
/// No retry. A failure at any hop comes back as the entry relay's error.
pub async fn send(transport: &dyn Transport, circuit: &Circuit, wire: String) -> Result<()> {
    let entry = Endpoint::Relay(circuit.entry_hop().relay_id);
    debug!("Sending {} chars to {}", wire.len(), entry);
    transport.call(entry, Request::message(wire)).await?.expect_ack()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::OnceLock;

    use veil_crypto::rsa_oaep::RsaKeyPair;

    use super::*;

    /// Five shared relay key pairs; key generation dominates test time.
    pub(crate) fn test_keys() -> &'static [RsaKeyPair] {
        static KEYS: OnceLock<Vec<RsaKeyPair>> = OnceLock::new();
        KEYS.get_or_init(|| {
            (0..5)
                .map(|_| RsaKeyPair::generate().expect("generate key pair"))
                .collect()
        })
    }

    pub(crate) fn test_node(id: u32) -> Node {
        let keys = &test_keys()[(id as usize - 1) % 5];
        Node {
            node_id: RelayId(id),
            pub_key: keys.public_key_b64().expect("encode key"),
        }
    }

    #[test]
    fn test_builder_explicit_path() {
        let circuit = CircuitBuilder::new()
            .add_relay(&test_node(2))
            .expect("add 2")
            .add_relay(&test_node(1))
            .expect("add 1")
            .add_relay(&test_node(3))
            .expect("add 3")
            .build()
            .expect("build");

        assert_eq!(circuit.relay_ids(), vec![RelayId(2), RelayId(1), RelayId(3)]);
        assert_eq!(circuit.entry_hop().relay_id, RelayId(2));
        assert_eq!(circuit.exit_hop().relay_id, RelayId(3));
    }

    #[test]
    fn test_builder_rejects_fourth_hop() {
        let builder = CircuitBuilder::new()
            .add_relay(&test_node(1))
            .and_then(|b| b.add_relay(&test_node(2)))
            .and_then(|b| b.add_relay(&test_node(3)))
            .expect("three hops");
        assert!(matches!(
            builder.add_relay(&test_node(4)),
            Err(OnionError::CircuitConstruction(_))
        ));
    }

    #[test]
    fn test_builder_rejects_repeated_relay() {
        let builder = CircuitBuilder::new().add_relay(&test_node(1)).expect("add");
        assert!(matches!(
            builder.add_relay(&test_node(1)),
            Err(OnionError::CircuitConstruction(_))
        ));
    }

    #[test]
    fn test_builder_incomplete_path() {
        let result = CircuitBuilder::new()
            .add_relay(&test_node(1))
            .expect("add")
            .build();
        assert!(matches!(
            result,
            Err(OnionError::InsufficientNodes { need: 3, have: 1 })
        ));
    }

    #[test]
    fn test_builder_rejects_bad_key() {
        let node = Node {
            node_id: RelayId(9),
            pub_key: "A".repeat(392),
        };
        assert!(matches!(
            CircuitBuilder::new().add_relay(&node),
            Err(OnionError::CircuitConstruction(_))
        ));
    }

    #[test]
    fn test_build_circuit_distinct_hops() {
        let nodes: Vec<Node> = (1..=5).map(test_node).collect();
        for _ in 0..20 {
            let circuit = build_circuit(&nodes, CIRCUIT_HOPS).expect("build");
            let ids: HashSet<RelayId> = circuit.relay_ids().into_iter().collect();
            assert_eq!(ids.len(), CIRCUIT_HOPS);
            assert!(ids.iter().all(|id| (1..=5).contains(&id.0)));
        }
    }

    #[test]
    fn test_build_circuit_exact_directory_uses_every_node() {
        let nodes: Vec<Node> = (1..=3).map(test_node).collect();
        let circuit = build_circuit(&nodes, CIRCUIT_HOPS).expect("build");
        let mut ids = circuit.relay_ids();
        ids.sort();
        assert_eq!(ids, vec![RelayId(1), RelayId(2), RelayId(3)]);
    }

    #[test]
    fn test_build_circuit_order_varies() {
        let nodes: Vec<Node> = (1..=3).map(test_node).collect();
        let orders: HashSet<Vec<RelayId>> = (0..200)
            .map(|_| build_circuit(&nodes, CIRCUIT_HOPS).expect("build").relay_ids())
            .collect();
        // 6 permutations; 200 draws miss one with negligible probability.
        assert_eq!(orders.len(), 6);
    }

    #[test]
    fn test_build_circuit_insufficient_nodes() {
        let nodes: Vec<Node> = (1..=2).map(test_node).collect();
        assert!(matches!(
            build_circuit(&nodes, CIRCUIT_HOPS),
            Err(OnionError::InsufficientNodes { need: 3, have: 2 })
        ));
        assert!(matches!(
            build_circuit(&[], CIRCUIT_HOPS),
            Err(OnionError::InsufficientNodes { need: 3, have: 0 })
        ));
    }
}
