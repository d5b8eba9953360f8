//! Extension protocol (BEP-10).
//!
//! All extension traffic rides in message id 20. The first payload byte is a
//! sub-id chosen by the *receiving* peer: each side lists the ids it wants in
//! the `m` dictionary of its extended handshake, and the sender must use the
//! ids from the other side's list. Sub-id 0 is always the extended handshake.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use tracing::{debug, trace};

use super::error::PeerError;
use super::metadata::MetadataMessage;
use crate::bencode::{self, DictBuilder, DictReader, Value};
use crate::constants::{EXTENDED_HANDSHAKE_ID, UT_METADATA};

/// An extension name from an `m` dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtendedExtension {
    /// `ut_metadata` (BEP-9).
    Metadata,
    /// A name this crate has no decoder for, kept so it can be re-advertised.
    Other(String),
}

impl ExtendedExtension {
    pub fn from_name(name: &str) -> Self {
        match name {
            UT_METADATA => ExtendedExtension::Metadata,
            other => ExtendedExtension::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExtendedExtension::Metadata => UT_METADATA,
            ExtendedExtension::Other(name) => name,
        }
    }
}

/// One direction of a connection's extension id mapping.
///
/// A connection holds two: the ids we advertised (used to decode what the
/// remote sends) and the ids the remote advertised (used to encode what we
/// send). Id 0 is reserved for the handshake and is never stored; an `m`
/// entry of 0 means the extension is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedCaps {
    ids: BTreeMap<ExtendedExtension, u8>,
}

impl ExtendedCaps {
    pub const fn new() -> Self {
        Self {
            ids: BTreeMap::new(),
        }
    }

    /// Builder form of [`ExtendedCaps::insert`].
    pub fn with(mut self, extension: ExtendedExtension, id: u8) -> Self {
        self.insert(extension, id);
        self
    }

    /// Maps `extension` to `id`, returning the previous id.
    ///
    /// Inserting id 0 disables the extension instead.
    pub fn insert(&mut self, extension: ExtendedExtension, id: u8) -> Option<u8> {
        if id == EXTENDED_HANDSHAKE_ID {
            return self.ids.remove(&extension);
        }
        self.ids.insert(extension, id)
    }

    pub fn id_of(&self, extension: &ExtendedExtension) -> Option<u8> {
        self.ids.get(extension).copied()
    }

    /// The id to put on an outgoing message for `extension`.
    ///
    /// Fails if the table (the remote's) never listed the extension, including
    /// when no extended handshake has arrived yet.
    pub fn resolve(&self, extension: &ExtendedExtension) -> Result<u8, PeerError> {
        self.id_of(extension)
            .ok_or_else(|| PeerError::UnnegotiatedExtension(extension.name().to_string()))
    }

    /// Reverse lookup used when decoding an incoming sub-id.
    pub fn extension_for(&self, id: u8) -> Option<&ExtendedExtension> {
        self.ids
            .iter()
            .find_map(|(ext, &ext_id)| (ext_id == id).then_some(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExtendedExtension, u8)> {
        self.ids.iter().map(|(ext, &id)| (ext, id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The `m` dictionary, keys in lexicographic order.
    pub fn to_value(&self) -> Value {
        self.iter()
            .fold(DictBuilder::new(), |dict, (ext, id)| dict.insert(ext.name(), id))
            .build()
    }

    /// Parses an `m` dictionary of text keys and integer ids in `0..=255`.
    pub fn from_value(value: &Value) -> Result<Self, PeerError> {
        let dict = value
            .as_dict()
            .ok_or_else(|| malformed("m is not a dictionary"))?;
        Self::from_dict(dict)
    }

    fn from_dict(dict: &BTreeMap<Bytes, Value>) -> Result<Self, PeerError> {
        let mut caps = Self::new();

        for (key, value) in dict {
            let name = std::str::from_utf8(key)
                .map_err(|_| malformed("extension name is not utf-8"))?;
            let id = value
                .as_integer()
                .and_then(|id| u8::try_from(id).ok())
                .ok_or_else(|| malformed(format!("extension {name:?} has no valid id")))?;

            if id == EXTENDED_HANDSHAKE_ID {
                trace!(name, "extension disabled");
                continue;
            }

            let extension = ExtendedExtension::from_name(name);
            if let ExtendedExtension::Other(_) = extension {
                trace!(name, id, "unrecognized extension");
            }
            caps.ids.insert(extension, id);
        }

        Ok(caps)
    }
}

fn malformed(reason: impl Into<String>) -> PeerError {
    PeerError::MalformedNestedValue(reason.into())
}

const KEY_IPV4: &str = "ipv4";
const KEY_IPV6: &str = "ipv6";
const KEY_M: &str = "m";
const KEY_METADATA_SIZE: &str = "metadata_size";
const KEY_PORT: &str = "p";
const KEY_REQQ: &str = "reqq";
const KEY_VERSION: &str = "v";
const KEY_YOURIP: &str = "yourip";

const KNOWN_KEYS: &[&str] = &[
    KEY_IPV4,
    KEY_IPV6,
    KEY_M,
    KEY_METADATA_SIZE,
    KEY_PORT,
    KEY_REQQ,
    KEY_VERSION,
    KEY_YOURIP,
];

/// The first extension message each side sends (sub-id 0).
///
/// Every field except `extensions` is optional. Keys this crate does not know
/// are kept in `extra` and written back out on encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedHandshake {
    /// The sender's own IPv4 address.
    pub ipv4: Option<Ipv4Addr>,
    /// The sender's own IPv6 address.
    pub ipv6: Option<Ipv6Addr>,
    /// The `m` dictionary: ids the sender wants to receive on.
    pub extensions: ExtendedCaps,
    /// The sender's listen port.
    pub listen_port: Option<u16>,
    /// Outstanding requests the sender will queue.
    pub request_queue_len: Option<u32>,
    /// Client name and version.
    pub client_version: Option<String>,
    /// Our address as seen by the sender (compact, 4 or 16 bytes).
    pub yourip: Option<Bytes>,
    /// Size of the info dictionary, for `ut_metadata`.
    pub metadata_size: Option<u32>,
    pub extra: BTreeMap<Bytes, Value>,
}

impl ExtendedHandshake {
    pub fn new(extensions: ExtendedCaps) -> Self {
        Self {
            extensions,
            ..Self::default()
        }
    }

    pub fn to_value(&self) -> Value {
        DictBuilder::new()
            .insert_opt(KEY_IPV4, self.ipv4.map(|ip| Value::from(&ip.octets()[..])))
            .insert_opt(KEY_IPV6, self.ipv6.map(|ip| Value::from(&ip.octets()[..])))
            .insert(KEY_M, self.extensions.to_value())
            .insert_opt(KEY_METADATA_SIZE, self.metadata_size)
            .insert_opt(KEY_PORT, self.listen_port)
            .insert_opt(KEY_REQQ, self.request_queue_len)
            .insert_opt(KEY_VERSION, self.client_version.as_deref())
            .insert_opt(KEY_YOURIP, self.yourip.clone())
            .extend(&self.extra)
            .build()
    }

    pub fn encode(&self) -> Bytes {
        Bytes::from(bencode::encode(&self.to_value()))
    }

    /// Fails only when the payload is not a dictionary or `m` is missing or
    /// malformed; optional keys with unexpected types are dropped.
    pub fn from_value(value: &Value) -> Result<Self, PeerError> {
        let reader = DictReader::new(value)?;
        let extensions = ExtendedCaps::from_dict(reader.required_dict(KEY_M)?)?;

        let ipv4 = reader
            .optional_bytes(KEY_IPV4)
            .and_then(|b| <[u8; 4]>::try_from(&b[..]).ok())
            .map(Ipv4Addr::from);
        let ipv6 = reader
            .optional_bytes(KEY_IPV6)
            .and_then(|b| <[u8; 16]>::try_from(&b[..]).ok())
            .map(Ipv6Addr::from);

        let extra: BTreeMap<Bytes, Value> = reader
            .unknown(KNOWN_KEYS)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extra.is_empty() {
            trace!(count = extra.len(), "keeping unknown extended handshake keys");
        }

        Ok(Self {
            ipv4,
            ipv6,
            extensions,
            listen_port: int_field(&reader, KEY_PORT),
            request_queue_len: int_field(&reader, KEY_REQQ),
            client_version: reader.optional_str(KEY_VERSION).map(String::from),
            yourip: reader.optional_bytes(KEY_YOURIP).cloned(),
            metadata_size: int_field(&reader, KEY_METADATA_SIZE),
            extra,
        })
    }

    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        Self::from_value(&bencode::decode(data)?)
    }
}

/// An optional integer key that must also fit `T`.
fn int_field<T: TryFrom<i64>>(reader: &DictReader<'_>, key: &str) -> Option<T> {
    reader.optional_int(key).and_then(|v| T::try_from(v).ok())
}

/// A message carried inside message id 20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedMessage {
    Handshake(ExtendedHandshake),
    Metadata(MetadataMessage),
    /// A sub-id with no known extension behind it, or a raw message to send
    /// as-is. Sub-id 0 belongs to the handshake and cannot be sent this way.
    Unknown { id: u8, payload: Bytes },
}

impl From<ExtendedHandshake> for ExtendedMessage {
    fn from(hs: ExtendedHandshake) -> Self {
        ExtendedMessage::Handshake(hs)
    }
}

impl From<MetadataMessage> for ExtendedMessage {
    fn from(msg: MetadataMessage) -> Self {
        ExtendedMessage::Metadata(msg)
    }
}

impl ExtendedMessage {
    /// The named extension this message belongs to, if any.
    pub fn extension(&self) -> Option<ExtendedExtension> {
        match self {
            ExtendedMessage::Metadata(_) => Some(ExtendedExtension::Metadata),
            ExtendedMessage::Handshake(_) | ExtendedMessage::Unknown { .. } => None,
        }
    }

    /// Decodes a sub-message that arrived with `id`, looked up in the table
    /// we advertised.
    pub fn decode(id: u8, payload: Bytes, local: &ExtendedCaps) -> Result<Self, PeerError> {
        if id == EXTENDED_HANDSHAKE_ID {
            return ExtendedHandshake::decode(&payload).map(ExtendedMessage::Handshake);
        }

        match local.extension_for(id) {
            Some(ExtendedExtension::Metadata) => {
                MetadataMessage::decode(payload).map(ExtendedMessage::Metadata)
            }
            other => {
                debug!(id, extension = ?other, "no decoder for extended message");
                Ok(ExtendedMessage::Unknown { id, payload })
            }
        }
    }

    /// Resolves the sub-id from the remote's table and serializes the payload.
    pub fn encode(&self, remote: &ExtendedCaps) -> Result<(u8, Bytes), PeerError> {
        match self {
            ExtendedMessage::Handshake(hs) => Ok((EXTENDED_HANDSHAKE_ID, hs.encode())),
            ExtendedMessage::Metadata(msg) => {
                let id = remote.resolve(&ExtendedExtension::Metadata)?;
                Ok((id, msg.encode()))
            }
            ExtendedMessage::Unknown { id, .. } if *id == EXTENDED_HANDSHAKE_ID => {
                Err(PeerError::ReservedExtendedId)
            }
            ExtendedMessage::Unknown { id, payload } => Ok((*id, payload.clone())),
        }
    }
}
