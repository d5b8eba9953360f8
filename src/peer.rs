//! Peer wire protocol (BEP-3, BEP-6, BEP-9, BEP-10)
//!
//! This module implements the encoding side of the BitTorrent peer wire
//! protocol: the handshake and its reserved capability bits, the base and
//! fast extension messages, and the extension protocol with its
//! per-connection id table and the `ut_metadata` extension.
//!
//! Everything here is a synchronous transformation between bytes and message
//! values. Whether a message is allowed on a connection, and what to do about
//! errors, is left to the caller; [`Message::requires`] says which reserved
//! bit a message depends on.
//!
//! # Example
//!
//! ```
//! use peerwire::peer::{BlockIndex, ExtendedCaps, Message, RegularMessage};
//!
//! let remote = ExtendedCaps::new();
//! let msg = Message::Regular(RegularMessage::Request(BlockIndex::new(3, 0, 16384)));
//!
//! let mut frame = msg.encode(&remote).unwrap();
//! assert_eq!(frame.len(), 17);
//! assert_eq!(Message::decode(&mut frame, &remote).unwrap(), msg);
//! ```

mod bitfield;
mod block;
mod caps;
mod codec;
mod error;
mod extension;
mod handshake;
mod info_hash;
mod message;
mod metadata;
mod peer_id;

pub use bitfield::Bitfield;
pub use block::{Block, BlockIndex};
pub use caps::{Caps, Extension};
pub use codec::{CodecConfig, HandshakeCodec, MessageCodec};
pub use error::PeerError;
pub use extension::{ExtendedCaps, ExtendedExtension, ExtendedHandshake, ExtendedMessage};
pub use handshake::{handshake_size, Handshake, HANDSHAKE_LEN, HANDSHAKE_MAX_SIZE};
pub use info_hash::InfoHash;
pub use message::{FastMessage, Message, MessageId, RegularMessage, StatusUpdate};
pub use metadata::{metadata_piece_count, metadata_piece_size, MetadataMessage};
pub use peer_id::PeerId;

#[cfg(test)]
mod tests;
