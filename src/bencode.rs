//! Bencode nested values ([BEP-3]).
//!
//! Extension protocol payloads (the BEP-10 handshake and the BEP-9
//! `ut_metadata` messages) are bencoded dictionaries. This module provides the
//! small part of bencode the peer wire needs:
//!
//! - [`Value`], the generic value model (integers, byte strings, lists and
//!   dictionaries with byte-string keys kept in sorted order)
//! - [`encode`] and [`decode`] for whole buffers
//! - [`decode_prefix`], which decodes one value from the front of a buffer and
//!   reports how many bytes it used, so that raw data appended after a
//!   dictionary can be delimited
//! - [`DictBuilder`] and [`DictReader`] for building and reading dictionaries
//!   with required and optional keys
//!
//! # Examples
//!
//! ```
//! use peerwire::bencode::{decode_prefix, encode, DictBuilder};
//!
//! let dict = DictBuilder::new()
//!     .insert("msg_type", 1i64)
//!     .insert("piece", 0i64)
//!     .build();
//!
//! let mut payload = encode(&dict);
//! payload.extend_from_slice(b"raw tail");
//!
//! let (value, used) = decode_prefix(&payload).unwrap();
//! assert_eq!(value, dict);
//! assert_eq!(&payload[used..], b"raw tail");
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod dict;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_prefix, Decoder};
pub use dict::{DictBuilder, DictReader};
pub use encode::encode;
pub use error::BencodeError;
pub use value::Value;
