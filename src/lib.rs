//! peerwire - BitTorrent peer wire protocol codec
//!
//! Translates between peer wire messages and their exact byte layout,
//! following the BEP (BitTorrent Enhancement Proposals) specifications.
//!
//! # Modules
//!
//! - [`peer`] - BEP-3/6/9/10 handshake, messages, extension protocol, ut_metadata
//! - [`bencode`] - BEP-3 nested values used by extension payloads
//! - [`constants`] - Protocol constants and codec defaults

pub mod bencode;
pub mod constants;
pub mod peer;

pub use bencode::{BencodeError, Value};
pub use peer::{
    Caps, CodecConfig, ExtendedCaps, ExtendedExtension, ExtendedHandshake, ExtendedMessage,
    Extension, FastMessage, Handshake, HandshakeCodec, Message, MessageCodec, MetadataMessage,
    PeerError, RegularMessage, StatusUpdate,
};
