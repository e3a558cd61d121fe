//! Length-prefixed framing over a byte stream.
//!
//! Frame format:
//! ```text
//! +----------------+------------------+
//! | length         | payload          |
//! | (4 bytes, BE)  | (UTF-8 JSON)     |
//! +----------------+------------------+
//! ```
//!
//! A TCP stream has no message boundaries of its own, so every record is
//! preceded by the byte length of its payload. Decoding consumes nothing
//! until a complete frame is buffered, so partial reads can never leave the
//! stream desynchronized — regardless of what the payload contains.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;

/// Length prefix size in bytes.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Maximum frame payload size. Anything larger is a protocol violation.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame payload of {0} bytes exceeds maximum {MAX_FRAME_LEN}")]
    TooLarge(usize),
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serialize a message and wrap it in a length-prefixed frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<Bytes, FrameError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let mut buf = BytesMut::with_capacity(LEN_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Try to extract the next complete payload from `buf`.
///
/// Returns `Ok(Some(payload))` on success, `Ok(None)` if more data is
/// needed. On `Ok(None)` the buffer is left untouched.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
    if buf.len() < LEN_PREFIX_SIZE {
        return Ok(None);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    if buf.len() < LEN_PREFIX_SIZE + len {
        return Ok(None);
    }
    buf.advance(LEN_PREFIX_SIZE);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Streaming decoder: accumulates raw bytes and yields complete payloads.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append freshly read bytes to the pending buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next complete payload.
    pub fn decode_next(&mut self) -> Result<Option<Bytes>, FrameError> {
        decode(&mut self.buffer)
    }

    /// Bytes currently buffered but not yet resolved into a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        text: String,
    }

    #[test]
    fn encode_decode_roundtrip() {
        let msg = Probe {
            text: "hello".into(),
        };
        let framed = encode(&msg).unwrap();

        let mut buf = BytesMut::from(&framed[..]);
        let payload = decode(&mut buf).unwrap().unwrap();
        let back: Probe = serde_json::from_slice(&payload).unwrap();
        assert_eq!(back, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn braces_in_payload_survive() {
        // Braces are payload bytes like any other; framing must not care.
        let msg = Probe {
            text: r#"tricky } payload {"nested": true} }}"#.into(),
        };
        let framed = encode(&msg).unwrap();

        let mut codec = FrameCodec::new();
        codec.feed(&framed);
        let payload = codec.decode_next().unwrap().unwrap();
        let back: Probe = serde_json::from_slice(&payload).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn byte_at_a_time_delivery_matches_one_shot() {
        let first = Probe { text: "one".into() };
        let second = Probe { text: "two".into() };
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&encode(&first).unwrap());
        wire.extend_from_slice(&encode(&second).unwrap());

        let mut codec = FrameCodec::new();
        let mut decoded = Vec::new();
        for byte in wire.iter() {
            codec.feed(std::slice::from_ref(byte));
            while let Some(payload) = codec.decode_next().unwrap() {
                decoded.push(serde_json::from_slice::<Probe>(&payload).unwrap());
            }
        }

        assert_eq!(decoded, vec![first, second]);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn incomplete_frame_consumes_nothing() {
        let framed = encode(&Probe { text: "abc".into() }).unwrap();

        let mut buf = BytesMut::from(&framed[..framed.len() - 1]);
        let before = buf.len();
        assert!(decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), before);
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_LEN + 1) as u32);
        buf.put_slice(b"junk");

        assert!(matches!(
            decode(&mut buf),
            Err(FrameError::TooLarge(n)) if n == MAX_FRAME_LEN + 1
        ));
    }
}
