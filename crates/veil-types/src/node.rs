//! Directory entries.

use serde::{Deserialize, Serialize};

use crate::RelayId;

/// A registered relay: its identifier and its base64 SPKI public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: RelayId,
    pub pub_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let node = Node {
            node_id: RelayId(7),
            pub_key: "AAAA".to_string(),
        };
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json, serde_json::json!({"nodeId": 7, "pubKey": "AAAA"}));

        let back: Node = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, node);
    }
}
