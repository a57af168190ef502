//! TCP client for the bus broker.
//!
//! Frames are a big-endian `u32` length followed by a bincode-encoded
//! [`Frame`]. Incoming bytes are buffered so `recv` can be cancelled between
//! reads without dropping a partially received frame.

use std::io::ErrorKind;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::transport::{Inbound, Transport};

/// Default timeout for writes (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum frame size (1 MB). Layout messages are the largest and stay well
/// under this.
pub const MAX_FRAME_SIZE: u32 = 1_000_000;

const READ_CHUNK: usize = 4096;

/// Unit of exchange between a client and the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Client asks to receive messages on `topic`.
    Subscribe { topic: String },
    /// Client publishes to `topic`.
    Publish { topic: String, payload: String },
    /// Broker forwards a message on a subscribed topic.
    Deliver(Inbound),
}

pub fn encode_frame(frame: &Frame, max_frame_size: u32) -> anyhow::Result<Vec<u8>> {
    let data = bincode::serialize(frame).map_err(|e| anyhow!("Serialization error: {}", e))?;
    if data.len() as u64 > max_frame_size as u64 {
        return Err(anyhow!(
            "Message too large: {} bytes (max: {})",
            data.len(),
            max_frame_size
        ));
    }
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(&data);
    Ok(out)
}

/// Accumulates raw bytes and yields complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_frame_size: u32,
}

impl FrameBuffer {
    pub fn new(max_frame_size: u32) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_size,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete frame. A bad length prefix or undecodable body is
    /// an error; the stream cannot be resynchronised after it.
    pub fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        if len > self.max_frame_size {
            return Err(anyhow!(
                "Message too large: {} bytes (max: {})",
                len,
                self.max_frame_size
            ));
        }
        if len == 0 {
            return Err(anyhow!("Invalid message length: 0"));
        }
        let end = 4 + len as usize;
        if self.buf.len() < end {
            return Ok(None);
        }
        let frame = bincode::deserialize(&self.buf[4..end])
            .map_err(|e| anyhow!("Deserialization error: {}", e))?;
        self.buf.drain(..end);
        Ok(Some(frame))
    }
}

/// Read once from `reader` into `frames`. Returns `false` at end of stream.
/// Cancel-safe.
pub async fn fill<R: AsyncRead + Unpin>(
    reader: &mut R,
    frames: &mut FrameBuffer,
) -> anyhow::Result<bool> {
    let mut chunk = [0u8; READ_CHUNK];
    let n = reader.read(&mut chunk).await.map_err(|e| match e.kind() {
        ErrorKind::ConnectionReset => anyhow!("Connection reset by peer"),
        _ => anyhow!("Read error: {}", e),
    })?;
    frames.extend(&chunk[..n]);
    Ok(n > 0)
}

/// Write one frame, bounded by `limit`.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
    max_frame_size: u32,
    limit: Duration,
) -> anyhow::Result<()> {
    let data = encode_frame(frame, max_frame_size)?;
    let op = async {
        writer.write_all(&data).await.map_err(|e| {
            if e.kind() == ErrorKind::BrokenPipe || e.kind() == ErrorKind::ConnectionReset {
                anyhow!("Connection closed by peer")
            } else {
                anyhow!("Write error: {}", e)
            }
        })
    };
    timeout(limit, op)
        .await
        .map_err(|_| anyhow!("Send timeout after {:?}", limit))?
}

pub struct TcpTransport {
    stream: TcpStream,
    frames: FrameBuffer,
    timeout_duration: Duration,
    max_frame_size: u32,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_config(stream, DEFAULT_TIMEOUT, MAX_FRAME_SIZE)
    }

    pub fn with_config(stream: TcpStream, timeout_duration: Duration, max_frame_size: u32) -> Self {
        Self {
            stream,
            frames: FrameBuffer::new(max_frame_size),
            timeout_duration,
            max_frame_size,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    async fn send(&mut self, frame: Frame) -> anyhow::Result<()> {
        write_frame(
            &mut self.stream,
            &frame,
            self.max_frame_size,
            self.timeout_duration,
        )
        .await
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn subscribe(&mut self, topic: &str) -> anyhow::Result<()> {
        self.send(Frame::Subscribe {
            topic: topic.to_string(),
        })
        .await
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> anyhow::Result<()> {
        self.send(Frame::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
        })
        .await
    }

    async fn recv(&mut self) -> anyhow::Result<Inbound> {
        loop {
            match self.frames.next_frame()? {
                Some(Frame::Deliver(msg)) => return Ok(msg),
                Some(other) => {
                    return Err(anyhow!("Unexpected frame from broker: {:?}", other));
                }
                None => {
                    if !fill(&mut self.stream, &mut self.frames).await? {
                        return Err(anyhow!("Connection closed by peer"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_survive_arbitrary_chunking() {
        let a = Frame::Publish {
            topic: "t".into(),
            payload: "u|10,5,green".into(),
        };
        let b = Frame::Subscribe { topic: "x".into() };
        let mut bytes = encode_frame(&a, MAX_FRAME_SIZE).unwrap();
        bytes.extend(encode_frame(&b, MAX_FRAME_SIZE).unwrap());

        let mut frames = FrameBuffer::new(MAX_FRAME_SIZE);
        let mut out = Vec::new();
        for chunk in bytes.chunks(3) {
            frames.extend(chunk);
            while let Some(f) = frames.next_frame().unwrap() {
                out.push(f);
            }
        }
        assert_eq!(out, vec![a, b]);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut frames = FrameBuffer::new(16);
        frames.extend(&1000u32.to_be_bytes());
        assert!(frames.next_frame().is_err());
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut frames = FrameBuffer::new(MAX_FRAME_SIZE);
        frames.extend(&0u32.to_be_bytes());
        assert!(frames.next_frame().is_err());
    }

    #[test]
    fn encode_enforces_limit() {
        let big = Frame::Publish {
            topic: "t".into(),
            payload: "x".repeat(64),
        };
        assert!(encode_frame(&big, 16).is_err());
    }
}
