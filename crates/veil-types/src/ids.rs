//! Endpoint identifiers and the destination field codec.
//!
//! Each decrypted layer starts with a 10-character ASCII field naming where
//! the remainder goes next. The first character is a kind tag and the other
//! nine are the zero-padded identifier:
//!
//! ```text
//! "1000000003"  -> Destination::Relay(RelayId(3))
//! "2000000020"  -> Destination::User(UserId(20))
//! ```
//!
//! The tag is fixed by the sender when the layer is built, so a relay never
//! has to guess whether a number names another relay or a mailbox.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DESTINATION_FIELD_LEN, MAX_ENDPOINT_ID};

const RELAY_TAG: u8 = b'1';
const USER_TAG: u8 = b'2';

/// Identifier of a relay node, as registered in the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(pub u32);

/// Identifier of a user mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the remainder of a peeled layer must be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Destination {
    /// Forward to another relay as a new wire message.
    Relay(RelayId),
    /// Deliver to a user mailbox and stop.
    User(UserId),
}

/// Errors from encoding or parsing the destination field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The field is not exactly [`DESTINATION_FIELD_LEN`] bytes.
    #[error("destination field must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// The field contains something other than ASCII digits.
    #[error("destination field contains a non-digit byte")]
    NonDigit,

    /// The leading tag is neither relay nor user.
    #[error("unknown destination tag {0:?}")]
    UnknownTag(char),

    /// The identifier does not fit in nine digits.
    #[error("identifier {0} exceeds {MAX_ENDPOINT_ID}")]
    IdOutOfRange(u32),
}

impl Destination {
    /// Numeric identifier regardless of kind.
    pub fn id(&self) -> u32 {
        match self {
            Destination::Relay(RelayId(id)) | Destination::User(UserId(id)) => *id,
        }
    }

    /// Whether the remainder must be forwarded to another relay.
    pub fn is_relay(&self) -> bool {
        matches!(self, Destination::Relay(_))
    }

    /// Encode as the fixed-width ASCII field placed in front of a layer payload.
    pub fn encode_field(&self) -> Result<String, FieldError> {
        let (tag, id) = match self {
            Destination::Relay(RelayId(id)) => (RELAY_TAG, *id),
            Destination::User(UserId(id)) => (USER_TAG, *id),
        };
        if id > MAX_ENDPOINT_ID {
            return Err(FieldError::IdOutOfRange(id));
        }
        Ok(format!("{}{:09}", char::from(tag), id))
    }

    /// Parse the fixed-width ASCII field from the front of a decrypted layer.
    pub fn parse_field(field: &[u8]) -> Result<Self, FieldError> {
        if field.len() != DESTINATION_FIELD_LEN {
            return Err(FieldError::WrongLength {
                expected: DESTINATION_FIELD_LEN,
                actual: field.len(),
            });
        }
        if !field.iter().all(u8::is_ascii_digit) {
            return Err(FieldError::NonDigit);
        }

        let id = field[1..]
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));

        match field[0] {
            RELAY_TAG => Ok(Destination::Relay(RelayId(id))),
            USER_TAG => Ok(Destination::User(UserId(id))),
            other => Err(FieldError::UnknownTag(char::from(other))),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Relay(id) => write!(f, "relay {id}"),
            Destination::User(id) => write!(f, "user {id}"),
        }
    }
}

impl From<RelayId> for Destination {
    fn from(id: RelayId) -> Self {
        Destination::Relay(id)
    }
}

impl From<UserId> for Destination {
    fn from(id: UserId) -> Self {
        Destination::User(id)
    }
}
