//! Bringing the overlay up on localhost TCP.
//!
//! Start order: directory, then each relay (server first, then registration),
//! then each user. Every role gets its own listener and accept loop.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::info;
use veil_directory::DirectoryService;
use veil_onion::{RouterNode, UserEndpoint};
use veil_transport::tcp::serve;
use veil_transport::{AddressBook, Endpoint, Service, TcpTransport, Transport};
use veil_types::{RelayId, UserId};

use crate::config::DaemonConfig;

type ServerTask = (Endpoint, veil_transport::Result<()>);

/// A running overlay.
pub struct Overlay {
    pub relays: Vec<Arc<RouterNode>>,
    pub users: Vec<Arc<UserEndpoint>>,
    servers: JoinSet<ServerTask>,
}

impl Overlay {
    /// Launch the directory, relays and users described by `config`.
    pub async fn launch(config: &DaemonConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let book = config.address_book();
        let transport: Arc<dyn Transport> = Arc::new(TcpTransport::new(book.clone()));
        let mut servers = JoinSet::new();

        start(&mut servers, &book, Endpoint::Directory, Arc::new(DirectoryService::new())).await?;

        let mut relays = Vec::with_capacity(config.topology.relays as usize);
        for id in 1..=config.topology.relays {
            let relay_id = RelayId(id);
            let relay_transport = transport.clone();
            // RSA key generation is CPU-bound.
            let node = tokio::task::spawn_blocking(move || RouterNode::new(relay_id, relay_transport))
                .await??;
            let node = Arc::new(node);

            start(&mut servers, &book, Endpoint::Relay(relay_id), node.clone()).await?;
            node.register()
                .await
                .with_context(|| format!("registering relay {relay_id}"))?;
            relays.push(node);
        }

        let mut users = Vec::with_capacity(config.topology.users as usize);
        for id in 1..=config.topology.users {
            let user_id = UserId(id);
            let user = Arc::new(UserEndpoint::new(user_id, transport.clone()));
            start(&mut servers, &book, Endpoint::User(user_id), user.clone()).await?;
            users.push(user);
        }

        info!(
            "Overlay up: {} relays, {} users, directory on port {}",
            relays.len(),
            users.len(),
            book.directory_port
        );

        Ok(Self {
            relays,
            users,
            servers,
        })
    }

    /// Wait until any server stops. Servers only stop on error.
    pub async fn wait(&mut self) -> anyhow::Result<()> {
        match self.servers.join_next().await {
            Some(Ok((endpoint, result))) => {
                result.with_context(|| format!("server for {endpoint} failed"))?;
                anyhow::bail!("server for {endpoint} stopped")
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Stop every server.
    pub async fn shutdown(mut self) {
        self.servers.shutdown().await;
        info!("All servers stopped");
    }
}

async fn start(
    servers: &mut JoinSet<ServerTask>,
    book: &AddressBook,
    endpoint: Endpoint,
    service: Arc<dyn Service>,
) -> anyhow::Result<()> {
    let addr = book.addr(endpoint)?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {endpoint} on {addr}"))?;
    info!("{} listening on {}", endpoint, addr);

    servers.spawn(async move { (endpoint, serve(listener, service).await) });
    Ok(())
}

#[cfg(test)]
mod tests {
    use veil_transport::messages::SendMessageBody;
    use veil_transport::Request;

    use super::*;
    use crate::config::{NetworkConfig, TopologyConfig};

    fn test_config() -> DaemonConfig {
        DaemonConfig {
            network: NetworkConfig {
                host: "127.0.0.1".to_string(),
                directory_port: 38080,
                relay_base_port: 34000,
                user_base_port: 33000,
            },
            topology: TopologyConfig { relays: 3, users: 2 },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_launch_and_send() {
        let config = test_config();
        let overlay = Overlay::launch(&config).await.expect("launch");
        assert_eq!(overlay.relays.len(), 3);
        assert_eq!(overlay.users.len(), 2);

        let client = TcpTransport::new(config.address_book());
        let nodes = client
            .call(Endpoint::Directory, Request::GetNodeRegistry)
            .await
            .expect("registry")
            .into_nodes()
            .expect("nodes");
        assert_eq!(nodes.len(), 3);

        client
            .call(
                Endpoint::User(UserId(1)),
                Request::SendMessage(SendMessageBody {
                    message: "over tcp".to_string(),
                    destination_user_id: UserId(2),
                }),
            )
            .await
            .expect("send")
            .expect_ack()
            .expect("ack");

        let received = client
            .call(Endpoint::User(UserId(2)), Request::GetLastReceivedMessage)
            .await
            .expect("query")
            .into_text()
            .expect("text");
        assert_eq!(received.as_deref(), Some("over tcp"));

        overlay.shutdown().await;
    }

    #[tokio::test]
    async fn test_colliding_ports_refused_before_binding() {
        let mut config = test_config();
        config.network.directory_port = 34002;
        let err = Overlay::launch(&config).await.err().expect("collision");
        assert!(err.to_string().contains("directory port 34002"), "{err}");
    }
}
