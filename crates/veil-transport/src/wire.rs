//! Newline-delimited JSON framing.
//!
//! One request or response per line. Serialized JSON never contains a raw
//! newline, so the line break is an unambiguous frame boundary.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::{Result, TransportError};

/// Upper bound on a single frame, newline excluded. A three-hop wire message
/// for a 1 MiB plaintext stays well below this.
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Serialize a value as one frame, trailing newline included.
pub fn to_line<T: Serialize>(value: &T) -> Result<String> {
    let mut line = serde_json::to_string(value)
        .map_err(|e| TransportError::Serialization(format!("JSON serialization failed: {e}")))?;
    if line.len() > MAX_FRAME_LEN {
        return Err(TransportError::ProtocolViolation(format!(
            "frame too large: {} bytes, max {MAX_FRAME_LEN}",
            line.len()
        )));
    }
    line.push('\n');
    Ok(line)
}

/// Parse one frame. Surrounding whitespace, including the newline, is ignored.
pub fn from_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() > MAX_FRAME_LEN {
        return Err(TransportError::ProtocolViolation(format!(
            "frame too large: {} bytes, max {MAX_FRAME_LEN}",
            line.len()
        )));
    }
    serde_json::from_str(line)
        .map_err(|e| TransportError::Deserialization(format!("JSON deserialization failed: {e}")))
}

/// Read one frame from `reader`, trailing newline included.
///
/// Never buffers more than `MAX_FRAME_LEN + 1` bytes. Returns `None` on a
/// clean end of stream and [`TransportError::ProtocolViolation`] when no
/// newline arrives within the limit.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_FRAME_LEN as u64 + 1;
    let mut buf = Vec::new();
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(None);
    }
    if read as u64 == limit && !buf.ends_with(b"\n") {
        return Err(TransportError::ProtocolViolation(format!(
            "frame too large: no newline within {MAX_FRAME_LEN} bytes"
        )));
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| TransportError::Deserialization("frame is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Request, Response};

    #[test]
    fn test_line_has_single_newline() {
        let line = to_line(&Request::message("a\nb")).expect("frame");
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_line_roundtrip() {
        let line = to_line(&Response::Text(Some("k".to_string()))).expect("frame");
        let back: Response = from_line(&line).expect("parse");
        assert_eq!(back, Response::Text(Some("k".to_string())));
    }

    #[test]
    fn test_garbage_rejected() {
        let result: Result<Request> = from_line("{not json}\n");
        assert!(matches!(result, Err(TransportError::Deserialization(_))));

        let result: Result<Request> = from_line("{\"method\":\"teleport\"}\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_frame_stops_at_limit() {
        let oversized = vec![b'a'; MAX_FRAME_LEN + 64];
        let mut reader: &[u8] = &oversized;
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(TransportError::ProtocolViolation(_))));
        // Only the bounded prefix was consumed.
        assert_eq!(reader.len(), 63);
    }

    #[tokio::test]
    async fn test_read_frame_accepts_frame_at_limit() {
        let mut frame = vec![b'a'; MAX_FRAME_LEN];
        frame.push(b'\n');
        frame.extend_from_slice(b"next\n");
        let mut reader: &[u8] = &frame;

        let first = read_frame(&mut reader).await.expect("read").expect("frame");
        assert_eq!(first.len(), MAX_FRAME_LEN + 1);
        let second = read_frame(&mut reader).await.expect("read");
        assert_eq!(second.as_deref(), Some("next\n"));
        assert_eq!(read_frame(&mut reader).await.expect("read"), None);
    }
}
