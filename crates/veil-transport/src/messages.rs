//! Request and response bodies exchanged between roles.
//!
//! Requests are tagged by `method` with their body under `params`:
//!
//! ```text
//! {"method":"message","params":{"message":"<wire message>"}}
//! {"method":"register_node","params":{"nodeId":1,"pubKey":"MIIBIjAN..."}}
//! {"method":"get_node_registry"}
//! ```
//!
//! Responses are tagged by `kind` with their value under `result`.

use std::fmt;

use serde::{Deserialize, Serialize};
use veil_types::{Destination, Node, RelayId, UserId};

use crate::TransportError;

/// Body of a directory registration. Both fields are optional on the wire so
/// the directory can report which one is missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeBody {
    #[serde(default)]
    pub node_id: Option<RelayId>,
    #[serde(default)]
    pub pub_key: Option<String>,
}

/// A message handed to a relay (a wire message) or to a user (plaintext).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: String,
}

/// Ask a user to originate a message through a fresh circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub message: String,
    pub destination_user_id: UserId,
}

/// A request to any role. Roles answer methods they do not serve with
/// [`ErrorCode::MethodNotSupported`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    /// Liveness probe, served by every role.
    Status,

    // Directory
    RegisterNode(RegisterNodeBody),
    GetNodeRegistry,

    // Relay and user
    Message(MessageBody),

    // Relay introspection
    GetPublicKey,
    GetPrivateKey,
    GetLastReceivedEncryptedMessage,
    GetLastReceivedDecryptedMessage,
    GetLastMessageDestination,

    // User
    SendMessage(SendMessageBody),
    GetLastReceivedMessage,
    GetLastSentMessage,
}

impl Request {
    /// Method name, for logs and error reports.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Status => "status",
            Request::RegisterNode(_) => "register_node",
            Request::GetNodeRegistry => "get_node_registry",
            Request::Message(_) => "message",
            Request::GetPublicKey => "get_public_key",
            Request::GetPrivateKey => "get_private_key",
            Request::GetLastReceivedEncryptedMessage => "get_last_received_encrypted_message",
            Request::GetLastReceivedDecryptedMessage => "get_last_received_decrypted_message",
            Request::GetLastMessageDestination => "get_last_message_destination",
            Request::SendMessage(_) => "send_message",
            Request::GetLastReceivedMessage => "get_last_received_message",
            Request::GetLastSentMessage => "get_last_sent_message",
        }
    }

    /// Shorthand for a [`Request::Message`].
    pub fn message(message: impl Into<String>) -> Self {
        Request::Message(MessageBody {
            message: message.into(),
        })
    }
}

/// Stable error codes, one per failure a role can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Directory
    MissingField,
    InvalidKeyFormat,
    DuplicateNode,
    // Circuit construction
    InsufficientNodes,
    // Relay
    DecryptionError,
    MalformedMessage,
    ForwardingFailure,
    // User
    InvalidRequest,
    TransportFailure,
    // Any role
    ParseError,
    MethodNotSupported,
    Internal,
}

impl ErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidKeyFormat => "INVALID_KEY_FORMAT",
            ErrorCode::DuplicateNode => "DUPLICATE_NODE",
            ErrorCode::InsufficientNodes => "INSUFFICIENT_NODES",
            ErrorCode::DecryptionError => "DECRYPTION_ERROR",
            ErrorCode::MalformedMessage => "MALFORMED_MESSAGE",
            ErrorCode::ForwardingFailure => "FORWARDING_FAILURE",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::TransportFailure => "TRANSPORT_FAILURE",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit failure response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    /// Build an error body.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The request line was not valid JSON or not a known request.
    pub fn parse_error(detail: &str) -> Self {
        Self::new(ErrorCode::ParseError, detail)
    }

    /// The role does not serve this method.
    pub fn method_not_supported(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotSupported,
            format!("method {method} is not served here"),
        )
    }
}

/// A role's answer to a [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum Response {
    /// Answer to [`Request::Status`].
    Live,
    /// The request was accepted.
    Ack,
    /// The directory listing.
    Nodes(Vec<Node>),
    /// A textual value (keys, last messages); `None` before anything happened.
    Text(Option<String>),
    /// A relay's last forwarding target.
    Destination(Option<Destination>),
    /// The request failed.
    Error(ErrorBody),
}

impl Response {
    /// Shorthand for [`Response::Error`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error(ErrorBody::new(code, message))
    }

    /// Name of the response kind, for error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Live => "live",
            Response::Ack => "ack",
            Response::Nodes(_) => "nodes",
            Response::Text(_) => "text",
            Response::Destination(_) => "destination",
            Response::Error(_) => "error",
        }
    }

    /// Turn [`Response::Error`] into [`TransportError::Remote`].
    pub fn into_result(self) -> Result<Self, TransportError> {
        match self {
            Response::Error(ErrorBody { code, message }) => {
                Err(TransportError::Remote { code, message })
            }
            other => Ok(other),
        }
    }

    /// Require an acknowledgement.
    pub fn expect_ack(self) -> Result<(), TransportError> {
        match self.into_result()? {
            Response::Ack => Ok(()),
            other => Err(unexpected("ack", &other)),
        }
    }

    /// Require a directory listing.
    pub fn into_nodes(self) -> Result<Vec<Node>, TransportError> {
        match self.into_result()? {
            Response::Nodes(nodes) => Ok(nodes),
            other => Err(unexpected("nodes", &other)),
        }
    }

    /// Require a textual value.
    pub fn into_text(self) -> Result<Option<String>, TransportError> {
        match self.into_result()? {
            Response::Text(text) => Ok(text),
            other => Err(unexpected("text", &other)),
        }
    }

    /// Require a destination value.
    pub fn into_destination(self) -> Result<Option<Destination>, TransportError> {
        match self.into_result()? {
            Response::Destination(dest) => Ok(dest),
            other => Err(unexpected("destination", &other)),
        }
    }
}

fn unexpected(expected: &'static str, actual: &Response) -> TransportError {
    TransportError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let req = Request::message("abc");
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"method": "message", "params": {"message": "abc"}})
        );

        let status: Request =
            serde_json::from_value(serde_json::json!({"method": "status"})).expect("parse");
        assert_eq!(status, Request::Status);
    }

    #[test]
    fn test_register_body_missing_fields() {
        let req: Request = serde_json::from_value(serde_json::json!({
            "method": "register_node",
            "params": {"nodeId": 4}
        }))
        .expect("parse");
        assert_eq!(
            req,
            Request::RegisterNode(RegisterNodeBody {
                node_id: Some(RelayId(4)),
                pub_key: None,
            })
        );
    }

    #[test]
    fn test_send_message_body_names() {
        let json = serde_json::to_value(Request::SendMessage(SendMessageBody {
            message: "hello".to_string(),
            destination_user_id: UserId(20),
        }))
        .expect("serialize");
        assert_eq!(json["params"]["destinationUserId"], 20);
    }

    #[test]
    fn test_method_names_match_serde_tags() {
        let requests = [
            Request::Status,
            Request::GetNodeRegistry,
            Request::message("x"),
            Request::GetLastMessageDestination,
            Request::GetLastSentMessage,
        ];
        for req in requests {
            let json = serde_json::to_value(&req).expect("serialize");
            assert_eq!(json["method"], req.method());
        }
    }

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_value(ErrorCode::DuplicateNode).expect("serialize");
        assert_eq!(json, serde_json::json!("DUPLICATE_NODE"));
        assert_eq!(ErrorCode::DuplicateNode.to_string(), "DUPLICATE_NODE");
    }

    #[test]
    fn test_into_result() {
        assert!(Response::Ack.expect_ack().is_ok());

        let err = Response::error(ErrorCode::InvalidRequest, "empty")
            .expect_ack()
            .expect_err("error response");
        assert!(matches!(
            err,
            TransportError::Remote {
                code: ErrorCode::InvalidRequest,
                ..
            }
        ));

        let err = Response::Live.into_nodes().expect_err("wrong kind");
        assert!(matches!(
            err,
            TransportError::UnexpectedResponse {
                expected: "nodes",
                actual: "live"
            }
        ));
    }

    #[test]
    fn test_response_roundtrip() {
        let resp = Response::Destination(Some(Destination::Relay(RelayId(1))));
        let text = serde_json::to_string(&resp).expect("serialize");
        let back: Response = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, resp);
    }
}
