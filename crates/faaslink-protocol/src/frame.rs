// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Length-prefixed frames carried on every faaslink QUIC stream.
//!
//! ```text
//! +----------------+--------------+------------------+
//! | length: u32 BE | kind: u16 BE | protobuf payload |
//! +----------------+--------------+------------------+
//! ```
//!
//! A resource call is one `Request` frame answered by one `Response` frame.
//! The trigger stream opens with `StreamStart`, exchanges `StreamData` frames
//! in both directions and ends with `StreamEnd` or EOF.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload either side accepts.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Bytes in front of every payload.
pub const HEADER_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MessageType {
    Request = 1,
    Response = 2,
    /// First frame of a trigger stream, carries the init message.
    StreamStart = 3,
    StreamData = 4,
    /// Orderly end of a trigger stream. Empty payload.
    StreamEnd = 5,
    /// The peer could not produce a response. Empty payload.
    Error = 6,
}

impl MessageType {
    const ALL: [MessageType; 6] = [
        MessageType::Request,
        MessageType::Response,
        MessageType::StreamStart,
        MessageType::StreamData,
        MessageType::StreamEnd,
        MessageType::Error,
    ];

    /// Kinds that never carry a payload.
    pub fn is_control(self) -> bool {
        matches!(self, MessageType::StreamEnd | MessageType::Error)
    }
}

impl TryFrom<u16> for MessageType {
    type Error = FrameError;

    fn try_from(raw: u16) -> Result<Self, FrameError> {
        Self::ALL
            .into_iter()
            .find(|kind| *kind as u16 == raw)
            .ok_or(FrameError::InvalidMessageType(raw))
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE} byte limit")]
    FrameTooLarge(usize),

    #[error("unknown frame kind {0}")]
    InvalidMessageType(u16),

    #[error("expected a {expected:?} frame, received {actual:?}")]
    UnexpectedFrame {
        expected: MessageType,
        actual: MessageType,
    },

    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload is not a valid message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("peer closed the stream")]
    ConnectionClosed,
}

/// Parsed 6-byte prefix of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    len: usize,
    kind: MessageType,
}

impl FrameHeader {
    fn parse(raw: [u8; HEADER_SIZE]) -> Result<Self, FrameError> {
        let mut buf = &raw[..];
        let len = buf.get_u32() as usize;
        let kind = MessageType::try_from(buf.get_u16())?;
        if len > MAX_FRAME_SIZE {
            return Err(FrameError::FrameTooLarge(len));
        }
        Ok(Self { len, kind })
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u32(self.len as u32);
        buf.put_u16(self.kind as u16);
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub message_type: MessageType,
    pub payload: Bytes,
}

impl Frame {
    /// Encodes `msg` into a frame of the given kind.
    pub fn new<M: Message>(message_type: MessageType, msg: &M) -> Result<Self, FrameError> {
        let size = msg.encoded_len();
        if size > MAX_FRAME_SIZE {
            return Err(FrameError::FrameTooLarge(size));
        }
        Ok(Self {
            message_type,
            payload: Bytes::from(msg.encode_to_vec()),
        })
    }

    fn control(message_type: MessageType) -> Self {
        Self {
            message_type,
            payload: Bytes::new(),
        }
    }

    pub fn request<M: Message>(msg: &M) -> Result<Self, FrameError> {
        Self::new(MessageType::Request, msg)
    }

    pub fn response<M: Message>(msg: &M) -> Result<Self, FrameError> {
        Self::new(MessageType::Response, msg)
    }

    pub fn stream_end() -> Self {
        Self::control(MessageType::StreamEnd)
    }

    pub fn error() -> Self {
        Self::control(MessageType::Error)
    }

    pub fn decode<M: Message + Default>(&self) -> Result<M, FrameError> {
        Ok(M::decode(self.payload.clone())?)
    }

    /// Like [`Frame::decode`], but fails unless the frame is of kind `expected`.
    pub fn decode_as<M: Message + Default>(&self, expected: MessageType) -> Result<M, FrameError> {
        if self.message_type == expected {
            self.decode()
        } else {
            Err(FrameError::UnexpectedFrame {
                expected,
                actual: self.message_type,
            })
        }
    }

    /// Header and payload as one contiguous buffer.
    pub fn encode(&self) -> Bytes {
        let header = FrameHeader {
            len: self.payload.len(),
            kind: self.message_type,
        };
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + header.len);
        header.put(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), FrameError> {
    let mut wire = frame.encode();
    writer.write_all_buf(&mut wire).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next frame. EOF on a frame boundary is
/// [`FrameError::ConnectionClosed`]; EOF inside a frame is an I/O error.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut raw = [0u8; HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut raw).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => FrameError::ConnectionClosed,
            _ => e.into(),
        });
    }
    let header = FrameHeader::parse(raw)?;

    let mut payload = BytesMut::zeroed(header.len);
    reader.read_exact(&mut payload).await?;
    Ok(Frame {
        message_type: header.kind,
        payload: payload.freeze(),
    })
}

/// Receiving half of a framed stream.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub async fn read_frame(&mut self) -> Result<Frame, FrameError> {
        read_frame(&mut self.inner).await
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Sending half of a framed stream.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        write_frame(&mut self.inner, frame).await
    }

    pub async fn send<M: Message>(
        &mut self,
        message_type: MessageType,
        msg: &M,
    ) -> Result<(), FrameError> {
        self.write_frame(&Frame::new(message_type, msg)?).await
    }

    /// Writes `StreamEnd`, then shuts the underlying writer down.
    pub async fn close(&mut self) -> Result<(), FrameError> {
        self.write_frame(&Frame::stream_end()).await?;
        self.inner.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
