use bytes::Bytes;
use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors produced while encoding or decoding peer wire data.
///
/// None of these are fatal by themselves: the caller decides whether to drop
/// the message, ignore it, or close the connection.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Fewer bytes were available than a field or frame requires.
    #[error("truncated input: needed {needed} bytes, had {available}")]
    TruncatedInput { needed: usize, available: usize },

    /// A frame declared a length that does not match its message layout.
    #[error("message id {id} declares {actual} bytes, layout requires {expected}")]
    LengthMismatch {
        id: u8,
        expected: usize,
        actual: usize,
    },

    /// A frame carried a message id outside the protocol table.
    ///
    /// The whole frame has been consumed; `payload` holds the bytes that
    /// followed the id.
    #[error("unknown message id {id} ({} payload bytes)", payload.len())]
    UnknownMessageId { id: u8, payload: Bytes },

    /// A bencoded payload could not be decoded or lacked a required key.
    #[error("malformed nested value: {0}")]
    MalformedNestedValue(String),

    /// Tried to send an extension message the remote never advertised.
    #[error("extension {0:?} was not negotiated with the remote peer")]
    UnnegotiatedExtension(String),

    /// A raw extension message tried to use sub-id 0, which always carries
    /// the extended handshake.
    #[error("extended sub-id 0 is reserved for the extended handshake")]
    ReservedExtendedId,

    /// Handshake protocol strings are limited to 255 bytes.
    #[error("protocol string is {0} bytes, at most 255 allowed")]
    ProtocolTooLong(usize),

    /// A frame length prefix exceeds the configured limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// I/O error surfaced through a framed transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BencodeError> for PeerError {
    fn from(err: BencodeError) -> Self {
        PeerError::MalformedNestedValue(err.to_string())
    }
}

impl PeerError {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        PeerError::TruncatedInput { needed, available }
    }
}
