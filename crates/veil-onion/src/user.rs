//! User role: a mailbox plus message origination.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use veil_transport::messages::{ErrorBody, Request, Response};
use veil_transport::{BoxFuture, Endpoint, Service, Transport};
use veil_types::UserId;

use crate::circuit::{build_circuit, send};
use crate::layer::encrypt_for_circuit;
use crate::{OnionError, Result, CIRCUIT_HOPS};

/// A user's last received and last sent plaintexts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub last_received: Option<String>,
    pub last_sent: Option<String>,
}

/// A user endpoint.
pub struct UserEndpoint {
    id: UserId,
    circuit_size: usize,
    mailbox: RwLock<Mailbox>,
    transport: Arc<dyn Transport>,
}

impl UserEndpoint {
    /// Create a user that sends over [`CIRCUIT_HOPS`]-hop circuits.
    pub fn new(id: UserId, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            circuit_size: CIRCUIT_HOPS,
            mailbox: RwLock::new(Mailbox::default()),
            transport,
        }
    }

    /// Use circuits of `size` hops instead.
    pub fn with_circuit_size(mut self, size: usize) -> Self {
        self.circuit_size = size;
        self
    }

    /// This user's identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Snapshot of the mailbox.
    pub async fn mailbox(&self) -> Mailbox {
        self.mailbox.read().await.clone()
    }

    /// Accept a delivered plaintext.
    pub async fn receive(&self, message: String) -> Result<()> {
        if message.is_empty() {
            return Err(OnionError::InvalidRequest("message is empty".to_string()));
        }
        info!("User {} received {} bytes", self.id, message.len());
        self.mailbox.write().await.last_received = Some(message);
        Ok(())
    }

    /// Send `plaintext` to `destination` through a fresh random circuit.
    ///
    /// The plaintext is recorded as last sent before anything else happens,
    /// so it is kept even if the send fails.
    pub async fn initiate_send(&self, destination: UserId, plaintext: String) -> Result<()> {
        self.mailbox.write().await.last_sent = Some(plaintext.clone());

        let nodes = self
            .transport
            .call(Endpoint::Directory, Request::GetNodeRegistry)
            .await?
            .into_nodes()?;
        let circuit = build_circuit(&nodes, self.circuit_size)?;
        let wire = encrypt_for_circuit(&circuit, destination, &plaintext)?;

        debug!(
            "User {} sending to user {} via {:?}",
            self.id,
            destination,
            circuit.relay_ids()
        );
        send(self.transport.as_ref(), &circuit, wire).await
    }
}

impl Service for UserEndpoint {
    fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            match request {
                Request::Status => Response::Live,
                Request::Message(body) => match self.receive(body.message).await {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::error(e.code(), e.to_string()),
                },
                Request::SendMessage(body) => {
                    match self.initiate_send(body.destination_user_id, body.message).await {
                        Ok(()) => Response::Ack,
                        Err(e) => {
                            warn!("User {} send failed: {}", self.id, e);
                            Response::error(e.code(), e.to_string())
                        }
                    }
                }
                Request::GetLastReceivedMessage => {
                    Response::Text(self.mailbox.read().await.last_received.clone())
                }
                Request::GetLastSentMessage => {
                    Response::Text(self.mailbox.read().await.last_sent.clone())
                }
                other => Response::Error(ErrorBody::method_not_supported(other.method())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use veil_directory::DirectoryService;
    use veil_transport::messages::SendMessageBody;
    use veil_transport::{ErrorCode, LocalNetwork};

    use super::*;

    fn code(resp: &Response) -> Option<ErrorCode> {
        match resp {
            Response::Error(body) => Some(body.code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_fresh_mailbox_is_empty() {
        let user = UserEndpoint::new(UserId(1), Arc::new(LocalNetwork::new()));
        assert_eq!(user.mailbox().await, Mailbox::default());
        assert_eq!(
            user.handle(Request::GetLastReceivedMessage).await,
            Response::Text(None)
        );
        assert_eq!(user.handle(Request::GetLastSentMessage).await, Response::Text(None));
    }

    #[tokio::test]
    async fn test_receive_overwrites() {
        let user = UserEndpoint::new(UserId(1), Arc::new(LocalNetwork::new()));
        assert_eq!(user.handle(Request::message("first")).await, Response::Ack);
        assert_eq!(user.handle(Request::message("second")).await, Response::Ack);
        assert_eq!(
            user.handle(Request::GetLastReceivedMessage).await,
            Response::Text(Some("second".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let user = UserEndpoint::new(UserId(1), Arc::new(LocalNetwork::new()));
        user.receive("kept".to_string()).await.expect("receive");

        let resp = user.handle(Request::message("")).await;
        assert_eq!(code(&resp), Some(ErrorCode::InvalidRequest));
        assert_eq!(user.mailbox().await.last_received.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_send_without_relays_records_last_sent() {
        let net = LocalNetwork::new();
        net.attach(Endpoint::Directory, Arc::new(DirectoryService::new())).await;
        let user = UserEndpoint::new(UserId(1), Arc::new(net.clone()));

        let resp = user
            .handle(Request::SendMessage(SendMessageBody {
                message: "hello".to_string(),
                destination_user_id: UserId(2),
            }))
            .await;
        assert_eq!(code(&resp), Some(ErrorCode::InsufficientNodes));
        assert_eq!(user.mailbox().await.last_sent.as_deref(), Some("hello"));
        assert_eq!(net.deliveries_to(Endpoint::User(UserId(2))).await, 0);
    }

    #[tokio::test]
    async fn test_send_without_directory() {
        let user = UserEndpoint::new(UserId(1), Arc::new(LocalNetwork::new()));
        let err = user
            .initiate_send(UserId(2), "x".to_string())
            .await
            .expect_err("no directory");
        assert_eq!(err.code(), ErrorCode::TransportFailure);
    }

    #[tokio::test]
    async fn test_relay_methods_not_served() {
        let user = UserEndpoint::new(UserId(1), Arc::new(LocalNetwork::new()));
        let resp = user.handle(Request::GetPublicKey).await;
        assert_eq!(code(&resp), Some(ErrorCode::MethodNotSupported));
    }
}
