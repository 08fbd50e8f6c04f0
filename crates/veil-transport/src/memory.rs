//! In-process transport.
//!
//! [`LocalNetwork`] routes requests straight to attached [`Service`]s without
//! serialization. It is how the overlay is simulated in a single process and
//! how the protocol is tested without sockets. Every delivery attempt is
//! appended to a log so tests can assert that a hop did, or did not, forward.
//!
//! The log is never trimmed on its own and grows by one entry per hop. The
//! daemon runs over [`TcpTransport`](crate::TcpTransport) and never builds a
//! `LocalNetwork`; a long-running simulation should call
//! [`LocalNetwork::clear_deliveries`] between rounds.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::messages::{Request, Response};
use crate::{BoxFuture, Endpoint, Result, Service, Transport, TransportError};

/// A delivery attempt recorded by [`LocalNetwork`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub endpoint: Endpoint,
    pub method: &'static str,
}

/// Shared in-process network. Cloning yields another handle to the same network.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    services: Arc<RwLock<HashMap<Endpoint, Arc<dyn Service>>>>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl LocalNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `service` reachable at `endpoint`. Returns the service it replaced.
    pub async fn attach(
        &self,
        endpoint: Endpoint,
        service: Arc<dyn Service>,
    ) -> Option<Arc<dyn Service>> {
        debug!("Attaching {}", endpoint);
        self.services.write().await.insert(endpoint, service)
    }

    /// Make `endpoint` unreachable. Returns whether anything was attached.
    pub async fn detach(&self, endpoint: Endpoint) -> bool {
        self.services.write().await.remove(&endpoint).is_some()
    }

    /// Whether a service is attached at `endpoint`.
    pub async fn is_attached(&self, endpoint: Endpoint) -> bool {
        self.services.read().await.contains_key(&endpoint)
    }

    /// Every delivery attempt so far, reachable or not, in order.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Drop the delivery log, returning how many entries it held.
    pub async fn clear_deliveries(&self) -> usize {
        let mut deliveries = self.deliveries.lock().await;
        let count = deliveries.len();
        deliveries.clear();
        count
    }

    /// Delivery attempts made to one endpoint.
    pub async fn deliveries_to(&self, endpoint: Endpoint) -> usize {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| d.endpoint == endpoint)
            .count()
    }
}

impl Transport for LocalNetwork {
    fn deliver(&self, endpoint: Endpoint, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            self.deliveries.lock().await.push(Delivery {
                endpoint,
                method: request.method(),
            });

            // Clone the handle out so the map is not locked while the
            // service runs; a relay's handler delivers onward.
            let service = self.services.read().await.get(&endpoint).cloned();
            match service {
                Some(service) => Ok(service.handle(request).await),
                None => Err(TransportError::Unreachable(endpoint.to_string())),
            }
        })
    }
}
