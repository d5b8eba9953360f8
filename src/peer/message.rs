//! Length-prefixed peer wire messages.
//!
//! Every message after the handshake is framed as
//!
//! ```text
//! <length: u32 BE><id: u8><payload: length - 1 bytes>
//! ```
//!
//! with `length == 0` meaning keep-alive (no id byte). The length is always
//! computed from the serialized payload when encoding and must match the
//! message layout exactly when decoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use super::bitfield::Bitfield;
use super::block::{Block, BlockIndex};
use super::caps::Extension;
use super::error::PeerError;
use super::extension::{ExtendedCaps, ExtendedMessage};
use crate::constants::LENGTH_PREFIX_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
    Port = 9,
    // Fast extension (BEP-6)
    Suggest = 13,
    HaveAll = 14,
    HaveNone = 15,
    Reject = 16,
    AllowedFast = 17,
    // Extension protocol (BEP-10)
    Extended = 20,
}

impl MessageId {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(MessageId::Choke),
            1 => Some(MessageId::Unchoke),
            2 => Some(MessageId::Interested),
            3 => Some(MessageId::NotInterested),
            4 => Some(MessageId::Have),
            5 => Some(MessageId::Bitfield),
            6 => Some(MessageId::Request),
            7 => Some(MessageId::Piece),
            8 => Some(MessageId::Cancel),
            9 => Some(MessageId::Port),
            13 => Some(MessageId::Suggest),
            14 => Some(MessageId::HaveAll),
            15 => Some(MessageId::HaveNone),
            16 => Some(MessageId::Reject),
            17 => Some(MessageId::AllowedFast),
            20 => Some(MessageId::Extended),
            _ => None,
        }
    }
}

/// Zero-payload messages that update choke and interest state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Choke,
    Unchoke,
    Interested,
    NotInterested,
}

impl StatusUpdate {
    pub fn id(self) -> MessageId {
        match self {
            StatusUpdate::Choke => MessageId::Choke,
            StatusUpdate::Unchoke => MessageId::Unchoke,
            StatusUpdate::Interested => MessageId::Interested,
            StatusUpdate::NotInterested => MessageId::NotInterested,
        }
    }
}

/// Base protocol transfer messages (BEP-3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegularMessage {
    Have(u32),
    Bitfield(Bitfield),
    Request(BlockIndex),
    Piece(Block),
    Cancel(BlockIndex),
}

impl RegularMessage {
    pub fn id(&self) -> MessageId {
        match self {
            RegularMessage::Have(_) => MessageId::Have,
            RegularMessage::Bitfield(_) => MessageId::Bitfield,
            RegularMessage::Request(_) => MessageId::Request,
            RegularMessage::Piece(_) => MessageId::Piece,
            RegularMessage::Cancel(_) => MessageId::Cancel,
        }
    }
}

/// Fast extension messages (BEP-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastMessage {
    HaveAll,
    HaveNone,
    SuggestPiece(u32),
    RejectRequest(BlockIndex),
    AllowedFast(u32),
}

impl FastMessage {
    pub fn id(self) -> MessageId {
        match self {
            FastMessage::HaveAll => MessageId::HaveAll,
            FastMessage::HaveNone => MessageId::HaveNone,
            FastMessage::SuggestPiece(_) => MessageId::Suggest,
            FastMessage::RejectRequest(_) => MessageId::Reject,
            FastMessage::AllowedFast(_) => MessageId::AllowedFast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Status(StatusUpdate),
    Regular(RegularMessage),
    Port(u16),
    Fast(FastMessage),
    Extended(ExtendedMessage),
}

impl From<StatusUpdate> for Message {
    fn from(status: StatusUpdate) -> Self {
        Message::Status(status)
    }
}

impl From<RegularMessage> for Message {
    fn from(msg: RegularMessage) -> Self {
        Message::Regular(msg)
    }
}

impl From<FastMessage> for Message {
    fn from(msg: FastMessage) -> Self {
        Message::Fast(msg)
    }
}

impl From<ExtendedMessage> for Message {
    fn from(msg: ExtendedMessage) -> Self {
        Message::Extended(msg)
    }
}

impl Message {
    /// The id byte, or `None` for keep-alive.
    pub fn id(&self) -> Option<MessageId> {
        match self {
            Message::KeepAlive => None,
            Message::Status(status) => Some(status.id()),
            Message::Regular(msg) => Some(msg.id()),
            Message::Port(_) => Some(MessageId::Port),
            Message::Fast(msg) => Some(msg.id()),
            Message::Extended(_) => Some(MessageId::Extended),
        }
    }

    /// The reserved-bit extension both peers must support before this message
    /// may be sent or accepted.
    ///
    /// Only classifies; enforcing it is the session's job.
    pub fn requires(&self) -> Option<Extension> {
        match self {
            Message::Port(_) => Some(Extension::Dht),
            Message::Fast(_) => Some(Extension::Fast),
            Message::Extended(_) => Some(Extension::Extended),
            Message::KeepAlive | Message::Status(_) | Message::Regular(_) => None,
        }
    }

    /// Total size of the frame at the front of `buf`, prefix included, once
    /// the 4-byte prefix is available.
    pub fn frame_len(buf: &[u8]) -> Option<usize> {
        let prefix: [u8; LENGTH_PREFIX_LEN] = buf.get(..LENGTH_PREFIX_LEN)?.try_into().ok()?;
        Some(LENGTH_PREFIX_LEN + u32::from_be_bytes(prefix) as usize)
    }

    /// Appends the framed message to `buf`.
    ///
    /// `remote` is the table the receiving peer advertised; it supplies the
    /// sub-id for extension messages. Nothing is written on error.
    pub fn encode_into(&self, remote: &ExtendedCaps, buf: &mut BytesMut) -> Result<(), PeerError> {
        let Some(id) = self.id() else {
            buf.put_u32(0);
            return Ok(());
        };

        let extended = match self {
            Message::Extended(msg) => Some(msg.encode(remote)?),
            _ => None,
        };

        let start = buf.len();
        buf.put_u32(0);
        buf.put_u8(id as u8);

        match self {
            Message::KeepAlive | Message::Status(_) => {}
            Message::Regular(RegularMessage::Have(piece)) => buf.put_u32(*piece),
            Message::Regular(RegularMessage::Bitfield(bits)) => buf.put_slice(bits.as_bytes()),
            Message::Regular(RegularMessage::Request(index))
            | Message::Regular(RegularMessage::Cancel(index)) => index.put(buf),
            Message::Regular(RegularMessage::Piece(block)) => {
                buf.put_u32(block.piece);
                buf.put_u32(block.offset);
                buf.put_slice(&block.data);
            }
            Message::Port(port) => buf.put_u16(*port),
            Message::Fast(FastMessage::HaveAll) | Message::Fast(FastMessage::HaveNone) => {}
            Message::Fast(FastMessage::SuggestPiece(piece))
            | Message::Fast(FastMessage::AllowedFast(piece)) => buf.put_u32(*piece),
            Message::Fast(FastMessage::RejectRequest(index)) => index.put(buf),
            Message::Extended(_) => {
                if let Some((sub_id, payload)) = extended {
                    buf.put_u8(sub_id);
                    buf.put_slice(&payload);
                }
            }
        }

        let length = (buf.len() - start - LENGTH_PREFIX_LEN) as u32;
        buf[start..start + LENGTH_PREFIX_LEN].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }

    pub fn encode(&self, remote: &ExtendedCaps) -> Result<Bytes, PeerError> {
        let mut buf = BytesMut::new();
        self.encode_into(remote, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Decodes the frame at the front of `data` and advances past it.
    ///
    /// `local` is the table we advertised; the remote addresses extension
    /// messages with our ids. [`PeerError::TruncatedInput`] means the frame is
    /// not fully buffered yet and nothing is consumed. Any other error, such as
    /// [`PeerError::LengthMismatch`] or [`PeerError::UnknownMessageId`], comes
    /// after the frame has been consumed, so the stream stays aligned.
    pub fn decode(data: &mut Bytes, local: &ExtendedCaps) -> Result<Self, PeerError> {
        let frame_len = Message::frame_len(data)
            .ok_or_else(|| PeerError::truncated(LENGTH_PREFIX_LEN, data.len()))?;
        if data.len() < frame_len {
            return Err(PeerError::truncated(frame_len, data.len()));
        }

        let mut body = data.split_to(frame_len);
        body.advance(LENGTH_PREFIX_LEN);
        Self::decode_body(body, local)
    }

    fn decode_body(mut body: Bytes, local: &ExtendedCaps) -> Result<Self, PeerError> {
        if body.is_empty() {
            return Ok(Message::KeepAlive);
        }

        let raw_id = body.get_u8();
        let Some(id) = MessageId::from_byte(raw_id) else {
            debug!(id = raw_id, len = body.len(), "unknown message id");
            return Err(PeerError::UnknownMessageId {
                id: raw_id,
                payload: body,
            });
        };

        let message = match id {
            MessageId::Choke => status(id, &body, StatusUpdate::Choke)?,
            MessageId::Unchoke => status(id, &body, StatusUpdate::Unchoke)?,
            MessageId::Interested => status(id, &body, StatusUpdate::Interested)?,
            MessageId::NotInterested => status(id, &body, StatusUpdate::NotInterested)?,
            MessageId::Have => {
                expect_exact(id, &body, 4)?;
                RegularMessage::Have(body.get_u32()).into()
            }
            MessageId::Bitfield => RegularMessage::Bitfield(Bitfield::from_bytes(body)).into(),
            MessageId::Request => {
                expect_exact(id, &body, BlockIndex::ENCODED_LEN)?;
                RegularMessage::Request(BlockIndex::get(&mut body)).into()
            }
            MessageId::Piece => {
                expect_at_least(id, &body, Block::HEADER_LEN)?;
                let piece = body.get_u32();
                let offset = body.get_u32();
                RegularMessage::Piece(Block::new(piece, offset, body)).into()
            }
            MessageId::Cancel => {
                expect_exact(id, &body, BlockIndex::ENCODED_LEN)?;
                RegularMessage::Cancel(BlockIndex::get(&mut body)).into()
            }
            MessageId::Port => {
                expect_exact(id, &body, 2)?;
                Message::Port(body.get_u16())
            }
            MessageId::Suggest => {
                expect_exact(id, &body, 4)?;
                FastMessage::SuggestPiece(body.get_u32()).into()
            }
            MessageId::HaveAll => {
                expect_exact(id, &body, 0)?;
                FastMessage::HaveAll.into()
            }
            MessageId::HaveNone => {
                expect_exact(id, &body, 0)?;
                FastMessage::HaveNone.into()
            }
            MessageId::Reject => {
                expect_exact(id, &body, BlockIndex::ENCODED_LEN)?;
                FastMessage::RejectRequest(BlockIndex::get(&mut body)).into()
            }
            MessageId::AllowedFast => {
                expect_exact(id, &body, 4)?;
                FastMessage::AllowedFast(body.get_u32()).into()
            }
            MessageId::Extended => {
                expect_at_least(id, &body, 1)?;
                let sub_id = body.get_u8();
                ExtendedMessage::decode(sub_id, body, local)?.into()
            }
        };

        Ok(message)
    }
}

fn status(id: MessageId, body: &Bytes, status: StatusUpdate) -> Result<Message, PeerError> {
    expect_exact(id, body, 0)?;
    Ok(Message::Status(status))
}

/// The payload after the id byte must be exactly `len` bytes.
fn expect_exact(id: MessageId, body: &Bytes, len: usize) -> Result<(), PeerError> {
    expect_at_least(id, body, len)?;
    if body.len() > len {
        return Err(mismatch(id, body, len));
    }
    Ok(())
}

/// The frame is already buffered, so a short payload is a bad length prefix
/// rather than a reason to wait for more bytes.
fn expect_at_least(id: MessageId, body: &Bytes, len: usize) -> Result<(), PeerError> {
    if body.len() < len {
        return Err(mismatch(id, body, len));
    }
    Ok(())
}

fn mismatch(id: MessageId, body: &Bytes, len: usize) -> PeerError {
    PeerError::LengthMismatch {
        id: id as u8,
        expected: 1 + len,
        actual: 1 + body.len(),
    }
}
