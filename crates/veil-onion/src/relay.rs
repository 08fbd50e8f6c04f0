//! Relay (onion router) role.
//!
//! A [`RouterNode`] owns one RSA key pair for its whole life. For every
//! message it receives it peels one layer, records what it saw, and passes
//! the remainder on: to the next relay, or into a user's mailbox at the exit.
//!
//! The forward is awaited, so a relay only acknowledges once the rest of the
//! path has accepted the message. The downstream response is not inspected;
//! only a failure to reach the next hop is reported.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use veil_crypto::rsa_oaep::RsaKeyPair;
use veil_transport::messages::{ErrorBody, RegisterNodeBody, Request, Response};
use veil_transport::{BoxFuture, Endpoint, ErrorCode, Service, Transport};
use veil_types::{Destination, RelayId};

use crate::layer::peel;
use crate::{OnionError, Result};

/// What a relay saw most recently. Every field is `None` until a message arrives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayState {
    /// The wire message exactly as received.
    pub last_received_encrypted: Option<String>,
    /// The remainder after peeling.
    pub last_received_decrypted: Option<String>,
    /// Where the remainder was sent.
    pub last_destination: Option<Destination>,
}

/// An onion router.
pub struct RouterNode {
    id: RelayId,
    keys: RsaKeyPair,
    public_key: String,
    state: RwLock<RelayState>,
    transport: Arc<dyn Transport>,
}

impl RouterNode {
    /// Create a relay with a freshly generated key pair.
    pub fn new(id: RelayId, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::with_keys(id, RsaKeyPair::generate()?, transport)
    }

    /// Create a relay with an existing key pair.
    pub fn with_keys(id: RelayId, keys: RsaKeyPair, transport: Arc<dyn Transport>) -> Result<Self> {
        let public_key = keys.public_key_b64()?;
        Ok(Self {
            id,
            keys,
            public_key,
            state: RwLock::new(RelayState::default()),
            transport,
        })
    }

    /// This relay's identifier.
    pub fn id(&self) -> RelayId {
        self.id
    }

    /// Base64 SPKI public key, as published in the directory.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 PKCS#8 private key.
    pub fn private_key(&self) -> Result<String> {
        Ok(self.keys.private_key_b64()?)
    }

    /// Snapshot of the last-seen state.
    pub async fn state(&self) -> RelayState {
        self.state.read().await.clone()
    }

    /// Publish this relay's identifier and public key to the directory.
    pub async fn register(&self) -> Result<()> {
        let request = Request::RegisterNode(RegisterNodeBody {
            node_id: Some(self.id),
            pub_key: Some(self.public_key.clone()),
        });
        self.transport
            .call(Endpoint::Directory, request)
            .await?
            .expect_ack()?;
        info!("Relay {} registered with the directory", self.id);
        Ok(())
    }

    /// Peel one layer from `wire` and pass the remainder on.
    ///
    /// Returns where the remainder went. Nothing is forwarded if peeling fails.
    pub async fn receive(&self, wire: String) -> Result<Destination> {
        let peeled = match peel(&self.keys, &wire) {
            Ok(peeled) => peeled,
            Err(e) => {
                warn!("Relay {} dropped a message: {}", self.id, e);
                self.state.write().await.last_received_encrypted = Some(wire);
                return Err(e);
            }
        };

        let next = peeled.next;
        {
            let mut state = self.state.write().await;
            state.last_received_encrypted = Some(wire);
            state.last_received_decrypted = Some(peeled.remainder.clone());
            state.last_destination = Some(next);
        }

        let endpoint = Endpoint::from(next);
        debug!("Relay {} forwarding {} chars to {}", self.id, peeled.remainder.len(), endpoint);

        match self.transport.deliver(endpoint, Request::message(peeled.remainder)).await {
            Ok(Response::Error(body)) => {
                debug!("{} answered relay {} with {}", endpoint, self.id, body.code);
                Ok(next)
            }
            Ok(_) => Ok(next),
            Err(source) => {
                warn!("Relay {} could not reach {}: {}", self.id, endpoint, source);
                Err(OnionError::Forwarding {
                    to: endpoint,
                    source,
                })
            }
        }
    }
}

impl Service for RouterNode {
    fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            match request {
                Request::Status => Response::Live,
                Request::Message(body) => match self.receive(body.message).await {
                    Ok(_) => Response::Ack,
                    Err(e) => Response::error(e.code(), e.to_string()),
                },
                Request::GetPublicKey => Response::Text(Some(self.public_key.clone())),
                Request::GetPrivateKey => match self.private_key() {
                    Ok(key) => Response::Text(Some(key)),
                    Err(e) => Response::error(ErrorCode::Internal, e.to_string()),
                },
                Request::GetLastReceivedEncryptedMessage => {
                    Response::Text(self.state.read().await.last_received_encrypted.clone())
                }
                Request::GetLastReceivedDecryptedMessage => {
                    Response::Text(self.state.read().await.last_received_decrypted.clone())
                }
                Request::GetLastMessageDestination => {
                    Response::Destination(self.state.read().await.last_destination)
                }
                other => Response::Error(ErrorBody::method_not_supported(other.method())),
            }
        })
    }
}
