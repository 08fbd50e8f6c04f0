//! The directory as a network role.

use tokio::sync::RwLock;
use tracing::warn;
use veil_transport::messages::{ErrorBody, RegisterNodeBody, Request, Response};
use veil_transport::{BoxFuture, Service};
use veil_types::Node;

use crate::NodeDirectory;

/// Serves `status`, `register_node` and `get_node_registry`.
#[derive(Default)]
pub struct DirectoryService {
    directory: RwLock<NodeDirectory>,
}

impl DirectoryService {
    /// Create a service over an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registered relays.
    pub async fn nodes(&self) -> Vec<Node> {
        self.directory.read().await.list().to_vec()
    }

    async fn register(&self, body: RegisterNodeBody) -> Response {
        let mut directory = self.directory.write().await;
        match directory.register(body.node_id, body.pub_key) {
            Ok(_) => Response::Ack,
            Err(e) => {
                warn!("Registration rejected: {}", e);
                Response::error(e.code(), e.to_string())
            }
        }
    }
}

impl Service for DirectoryService {
    fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            match request {
                Request::Status => Response::Live,
                Request::RegisterNode(body) => self.register(body).await,
                Request::GetNodeRegistry => Response::Nodes(self.nodes().await),
                other => Response::Error(ErrorBody::method_not_supported(other.method())),
            }
        })
    }
}
