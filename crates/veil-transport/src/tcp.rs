//! TCP transport and server loop.
//!
//! Each role listens on its own port (see [`AddressBook`]). A client opens a
//! connection per request, writes one JSON line and reads one JSON line back.
//! The server side keeps reading lines until the client hangs up, so a
//! long-lived client may also pipeline several requests on one connection.

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

use crate::messages::{ErrorBody, Request, Response};
use crate::{wire, AddressBook, BoxFuture, Endpoint, Result, Service, Transport, TransportError};

/// Client side: delivers each request over a fresh TCP connection.
#[derive(Clone, Debug, Default)]
pub struct TcpTransport {
    book: AddressBook,
}

impl TcpTransport {
    /// Create a transport resolving endpoints through `book`.
    pub fn new(book: AddressBook) -> Self {
        Self { book }
    }

    /// The address book in use.
    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }
}

impl Transport for TcpTransport {
    fn deliver(&self, endpoint: Endpoint, request: Request) -> BoxFuture<'_, Result<Response>> {
        Box::pin(async move {
            let addr = self.book.addr(endpoint)?;
            let stream = TcpStream::connect(&addr)
                .await
                .map_err(|e| TransportError::Unreachable(format!("{endpoint} at {addr}: {e}")))?;

            let (reader, mut writer) = stream.into_split();
            let line = wire::to_line(&request)?;
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;

            let mut reader = BufReader::new(reader);
            let Some(reply) = wire::read_frame(&mut reader).await? else {
                return Err(TransportError::ProtocolViolation(format!(
                    "{endpoint} closed the connection without answering {}",
                    request.method()
                )));
            };
            wire::from_line(&reply)
        })
    }
}

/// Accept connections on `listener` forever, answering each line with `service`.
pub async fn serve(listener: TcpListener, service: Arc<dyn Service>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Accepted connection from {}", peer);
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(service, stream).await {
                        warn!("Connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Accept error: {}", e);
            }
        }
    }
}

/// Handle a single client connection.
///
/// An oversized frame is answered with a parse error and the connection is
/// closed, since the rest of that line cannot be resynchronized.
async fn handle_connection(service: Arc<dyn Service>, stream: TcpStream) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let line = match wire::read_frame(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e @ TransportError::ProtocolViolation(_)) => {
                warn!("Closing connection: {}", e);
                let reply = wire::to_line(&Response::Error(ErrorBody::parse_error(&e.to_string())))?;
                writer.write_all(reply.as_bytes()).await?;
                writer.flush().await?;
                break;
            }
            Err(e) => return Err(e),
        };

        let response = match wire::from_line::<Request>(&line) {
            Ok(request) => service.handle(request).await,
            Err(e) => Response::Error(ErrorBody::parse_error(&e.to_string())),
        };

        let reply = wire::to_line(&response)?;
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
