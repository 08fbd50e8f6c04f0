//! # veil-transport
//!
//! Request/response plumbing between veil roles.
//!
//! Every role (the directory, each relay, each user) is a [`Service`] reachable
//! at an [`Endpoint`]. Roles talk to each other only through a [`Transport`],
//! which delivers one [`Request`](messages::Request) and returns the remote
//! [`Response`](messages::Response).
//!
//! - [`endpoint`] - Endpoint naming and the localhost port layout
//! - [`messages`] - Request and response bodies
//! - [`wire`] - Newline-delimited JSON framing
//! - [`memory`] - In-process transport for simulation and tests
//! - [`tcp`] - TCP transport and server loop
//!
//! ## Architecture
//!
//! ```text
//! Role logic (veil-directory, veil-onion)
//!     |
//!     v
//! Service::handle / Transport::deliver   -- Request -> Response
//!     |
//!     v
//! LocalNetwork (memory.rs) | TcpTransport (tcp.rs, JSON lines)
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod endpoint;
pub mod memory;
pub mod messages;
pub mod tcp;
pub mod wire;

pub use endpoint::{AddressBook, Endpoint};
pub use memory::LocalNetwork;
pub use messages::{ErrorBody, ErrorCode, Request, Response};
pub use tcp::TcpTransport;

/// A boxed, sendable future.
///
/// Used instead of `async fn` in traits so [`Service`] and [`Transport`] stay
/// usable as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No service is reachable at the endpoint.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// Socket or stream I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A message could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Received bytes were not a valid message.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Framing violation (oversized line, closed mid-request).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The remote role answered with an explicit error.
    #[error("remote error {code}: {message}")]
    Remote { code: ErrorCode, message: String },

    /// The remote role answered with a response of the wrong kind.
    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// A role that answers requests.
///
/// Handlers report failures as [`Response::Error`] rather than panicking or
/// returning a transport error: a bad request never takes the role down.
pub trait Service: Send + Sync {
    /// Handle one request to completion.
    fn handle(&self, request: Request) -> BoxFuture<'_, Response>;
}

/// Delivers requests to endpoints.
pub trait Transport: Send + Sync {
    /// Deliver `request` to `endpoint` and return whatever it answered,
    /// including [`Response::Error`].
    fn deliver(&self, endpoint: Endpoint, request: Request) -> BoxFuture<'_, Result<Response>>;

    /// Like [`deliver`](Transport::deliver), but turns a remote
    /// [`Response::Error`] into [`TransportError::Remote`].
    fn call(&self, endpoint: Endpoint, request: Request) -> BoxFuture<'_, Result<Response>> {
        let pending = self.deliver(endpoint, request);
        Box::pin(async move { pending.await?.into_result() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Unreachable("relay 4".to_string());
        assert_eq!(err.to_string(), "endpoint unreachable: relay 4");

        let err = TransportError::Remote {
            code: ErrorCode::DecryptionError,
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "remote error DECRYPTION_ERROR: bad key");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: TransportError = io.into();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
