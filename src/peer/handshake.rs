//! The one-time handshake that opens every peer connection.
//!
//! ```text
//! <pstrlen: u8><pstr: pstrlen bytes><reserved: 8><info_hash: 20><peer_id: 20>
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::caps::{Caps, Extension};
use super::error::PeerError;
use super::info_hash::InfoHash;
use super::peer_id::PeerId;
use crate::constants::PROTOCOL;

/// Wire size of a handshake whose protocol string is `protocol_len` bytes.
pub const fn handshake_size(protocol_len: usize) -> usize {
    1 + protocol_len + 8 + 20 + 20
}

/// Largest possible handshake (255-byte protocol string).
pub const HANDSHAKE_MAX_SIZE: usize = handshake_size(255);

/// Size of a handshake carrying the standard `"BitTorrent protocol"` string.
pub const HANDSHAKE_LEN: usize = handshake_size(PROTOCOL.len());

/// A handshake, immutable once built.
///
/// Decoding performs no semantic checks: whether the protocol string and info
/// hash are acceptable is up to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    protocol: Bytes,
    reserved: Caps,
    info_hash: InfoHash,
    peer_id: PeerId,
}

impl Handshake {
    /// A standard handshake advertising `reserved`.
    pub fn new(reserved: Caps, info_hash: InfoHash, peer_id: PeerId) -> Self {
        Self {
            protocol: Bytes::from_static(PROTOCOL),
            reserved,
            info_hash,
            peer_id,
        }
    }

    pub fn with_protocol(
        protocol: impl Into<Bytes>,
        reserved: Caps,
        info_hash: InfoHash,
        peer_id: PeerId,
    ) -> Result<Self, PeerError> {
        let protocol = protocol.into();
        if protocol.len() > u8::MAX as usize {
            return Err(PeerError::ProtocolTooLong(protocol.len()));
        }
        Ok(Self {
            protocol,
            reserved,
            info_hash,
            peer_id,
        })
    }

    pub fn protocol(&self) -> &[u8] {
        &self.protocol
    }

    pub fn has_default_protocol(&self) -> bool {
        &self.protocol[..] == PROTOCOL
    }

    pub fn reserved(&self) -> Caps {
        self.reserved
    }

    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn supports(&self, extension: Extension) -> bool {
        self.reserved.allows(extension)
    }

    pub fn encoded_len(&self) -> usize {
        handshake_size(self.protocol.len())
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u8(self.protocol.len() as u8);
        buf.put_slice(&self.protocol);
        buf.put_slice(&self.reserved.to_reserved());
        buf.put_slice(self.info_hash.as_bytes());
        buf.put_slice(self.peer_id.as_bytes());
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Decodes a handshake from the front of `data`.
    ///
    /// Bytes past the handshake are ignored; use [`Handshake::encoded_len`] to
    /// find where the message stream starts.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        let (&pstrlen, _) = data.split_first().ok_or(PeerError::truncated(1, 0))?;
        let needed = handshake_size(pstrlen as usize);
        if data.len() < needed {
            return Err(PeerError::truncated(needed, data.len()));
        }

        let (protocol, rest) = data[1..].split_at(pstrlen as usize);
        let (reserved, rest) = rest.split_at(8);
        let (info_hash, rest) = rest.split_at(20);
        let peer_id = &rest[..20];

        Ok(Self {
            protocol: Bytes::copy_from_slice(protocol),
            reserved: Caps::from_reserved(fixed(reserved)),
            info_hash: InfoHash(fixed(info_hash)),
            peer_id: PeerId(fixed(peer_id)),
        })
    }
}

fn fixed<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
