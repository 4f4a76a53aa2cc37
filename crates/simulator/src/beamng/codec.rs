//! Length-prefixed MessagePack framing

use std::io;

use bytes::BytesMut;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, LengthDelimitedCodec};

use crate::error::{Result, SimulatorError};

/// Upper bound on one frame, larger prefixes are treated as corruption
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encode a message map as a MessagePack body (no prefix)
pub fn encode_message(message: &Value) -> Result<Vec<u8>> {
    if !message.is_object() {
        return Err(SimulatorError::protocol("message must be a map"));
    }
    rmp_serde::to_vec(message).map_err(|e| SimulatorError::protocol(format!("encode: {e}")))
}

/// Decode a MessagePack body into a message map
pub fn decode_message(body: &[u8]) -> Result<Value> {
    let value: Value = rmp_serde::from_slice(body)
        .map_err(|e| SimulatorError::protocol(format!("decode: {e}")))?;
    if !value.is_object() {
        return Err(SimulatorError::protocol("response is not a map"));
    }
    Ok(value)
}

/// Write one framed message
///
/// Not cancellation safe: a write dropped halfway leaves a partial frame
/// on the peer's side.
pub async fn write_frame<W>(writer: &mut W, message: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = encode_message(message)?;
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| (*len as usize) <= MAX_FRAME_LEN)
        .ok_or_else(|| SimulatorError::protocol(format!("frame too large: {} bytes", body.len())))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Buffered frame reader
///
/// Bytes of a partly received frame stay in the buffer when a read is
/// cancelled, so the next read picks up where the last one stopped.
#[derive(Debug)]
pub struct FrameReader {
    codec: LengthDelimitedCodec,
    buf: BytesMut,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            codec: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .big_endian()
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
            buf: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Read the next complete message
    pub async fn read<R>(&mut self, reader: &mut R) -> Result<Value>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let frame = self
                .codec
                .decode(&mut self.buf)
                .map_err(|e| SimulatorError::protocol(format!("framing: {e}")))?;
            if let Some(frame) = frame {
                return decode_message(&frame);
            }
            if reader.read_buf(&mut self.buf).await? == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_frame_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let msg = json!({"type": "Hello", "_id": 1, "protocolVersion": "v1.26"});

        write_frame(&mut a, &msg).await.unwrap();
        let got = FrameReader::new().read(&mut b).await.unwrap();

        assert_eq!(got["type"], "Hello");
        assert_eq!(got["_id"], 1);
    }

    #[tokio::test]
    async fn test_length_prefix_is_big_endian() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let msg = json!({"type": "Quit"});
        let body_len = encode_message(&msg).unwrap().len();

        write_frame(&mut a, &msg).await.unwrap();
        let mut prefix = [0u8; 4];
        b.read_exact(&mut prefix).await.unwrap();
        assert_eq!(u32::from_be_bytes(prefix) as usize, body_len);
    }

    #[tokio::test]
    async fn test_oversized_prefix_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        let err = FrameReader::new().read(&mut b).await.unwrap_err();
        assert!(matches!(err, SimulatorError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_read_keeps_partial_frame() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let body = encode_message(&json!({"type": "MapLoaded", "_id": 7})).unwrap();
        let (head, tail) = body.split_at(body.len() / 2);
        a.write_all(&(body.len() as u32).to_be_bytes()).await.unwrap();
        a.write_all(head).await.unwrap();

        let mut reader = FrameReader::new();
        let stalled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            reader.read(&mut b),
        )
        .await;
        assert!(stalled.is_err());

        a.write_all(tail).await.unwrap();
        let got = reader.read(&mut b).await.unwrap();
        assert_eq!(got["type"], "MapLoaded");
        assert_eq!(got["_id"], 7);
    }

    #[tokio::test]
    async fn test_eof_is_io_error() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);

        let err = FrameReader::new().read(&mut b).await.unwrap_err();
        assert!(matches!(err, SimulatorError::Io(_)));
    }

    #[test]
    fn test_non_map_message_rejected() {
        assert!(encode_message(&json!([1, 2, 3])).is_err());
        let body = rmp_serde::to_vec(&42u32).unwrap();
        assert!(decode_message(&body).is_err());
    }
}
