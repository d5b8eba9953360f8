//! Metadata exchange extension (ut_metadata, BEP-9).
//!
//! Lets a peer that only has the info hash (for example from a magnet link)
//! fetch the info dictionary from peers in 16 KiB pieces. Each message is a
//! bencoded dictionary; data messages carry the piece bytes directly after
//! it, outside the bencoding.

use bytes::{Bytes, BytesMut};

use super::error::PeerError;
use crate::bencode::{self, DictBuilder, DictReader, Value};
pub use crate::constants::METADATA_PIECE_SIZE;

const MSG_REQUEST: i64 = 0;
const MSG_DATA: i64 = 1;
const MSG_REJECT: i64 = 2;

/// A ut_metadata message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataMessage {
    /// Ask for a metadata piece.
    Request(u32),
    /// A metadata piece. `payload` is the raw tail after the dictionary.
    Data {
        piece: u32,
        total_size: u32,
        payload: Bytes,
    },
    /// The peer will not serve the requested piece.
    Reject(u32),
    /// A dictionary with a `msg_type` or shape this crate does not understand.
    Unknown(Value),
}

impl MetadataMessage {
    /// The request sequence for fetching metadata of `total_size` bytes.
    pub fn requests_for(total_size: usize) -> impl Iterator<Item = MetadataMessage> {
        (0..metadata_piece_count(total_size) as u32).map(MetadataMessage::Request)
    }

    pub fn piece(&self) -> Option<u32> {
        match self {
            MetadataMessage::Request(piece)
            | MetadataMessage::Reject(piece)
            | MetadataMessage::Data { piece, .. } => Some(*piece),
            MetadataMessage::Unknown(_) => None,
        }
    }

    pub fn encode(&self) -> Bytes {
        let (dict, tail) = match self {
            MetadataMessage::Request(piece) => (header(MSG_REQUEST, *piece).build(), None),
            MetadataMessage::Data {
                piece,
                total_size,
                payload,
            } => (
                header(MSG_DATA, *piece)
                    .insert("total_size", *total_size)
                    .build(),
                Some(payload),
            ),
            MetadataMessage::Reject(piece) => (header(MSG_REJECT, *piece).build(), None),
            MetadataMessage::Unknown(value) => (value.clone(), None),
        };

        let encoded = bencode::encode(&dict);
        let mut buf = BytesMut::with_capacity(encoded.len() + tail.map_or(0, Bytes::len));
        buf.extend_from_slice(&encoded);
        if let Some(tail) = tail {
            buf.extend_from_slice(tail);
        }
        buf.freeze()
    }

    /// Decodes the dictionary from the front of `payload`; whatever follows it
    /// is the piece data.
    ///
    /// Only a payload that does not start with a bencoded value is an error.
    /// Anything that decodes but is not a recognizable message becomes
    /// [`MetadataMessage::Unknown`].
    pub fn decode(payload: Bytes) -> Result<Self, PeerError> {
        let (value, used) = bencode::decode_prefix(&payload)?;
        let tail = payload.slice(used..);
        Ok(Self::from_parts(value, tail))
    }

    fn from_parts(value: Value, tail: Bytes) -> Self {
        let Ok(reader) = DictReader::new(&value) else {
            return MetadataMessage::Unknown(value);
        };

        let u32_key = |key| {
            reader
                .required_int(key)
                .ok()
                .and_then(|v| u32::try_from(v).ok())
        };

        let (Ok(msg_type), Some(piece)) = (reader.required_int("msg_type"), u32_key("piece"))
        else {
            return MetadataMessage::Unknown(value);
        };

        match msg_type {
            MSG_REQUEST => MetadataMessage::Request(piece),
            MSG_REJECT => MetadataMessage::Reject(piece),
            MSG_DATA => match u32_key("total_size") {
                Some(total_size) => MetadataMessage::Data {
                    piece,
                    total_size,
                    payload: tail,
                },
                None => MetadataMessage::Unknown(value),
            },
            _ => MetadataMessage::Unknown(value),
        }
    }
}

fn header(msg_type: i64, piece: u32) -> DictBuilder {
    DictBuilder::new()
        .insert("msg_type", msg_type)
        .insert("piece", piece)
}

/// Calculates the number of metadata pieces for a given metadata size.
pub fn metadata_piece_count(metadata_size: usize) -> usize {
    metadata_size.div_ceil(METADATA_PIECE_SIZE)
}

/// Calculates the size of a specific metadata piece.
pub fn metadata_piece_size(piece: u32, total_size: usize) -> usize {
    let offset = piece as usize * METADATA_PIECE_SIZE;
    if offset >= total_size {
        0
    } else {
        (total_size - offset).min(METADATA_PIECE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let encoded = MetadataMessage::Request(2).encode();
        assert_eq!(&encoded[..], b"d8:msg_typei0e5:piecei2ee");
    }

    #[test]
    fn test_data_encode_decode() {
        let data = Bytes::from(vec![1, 2, 3, 4, 5]);
        let msg = MetadataMessage::Data {
            piece: 2,
            total_size: 1000,
            payload: data.clone(),
        };
        let encoded = msg.encode();
        assert!(encoded.ends_with(&data));

        let decoded = MetadataMessage::decode(encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_data_payload_may_look_like_bencode() {
        let msg = MetadataMessage::Data {
            piece: 0,
            total_size: 12,
            payload: Bytes::from_static(b"d4:name1:xe"),
        };
        assert_eq!(MetadataMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_reject_encode_decode() {
        let msg = MetadataMessage::Reject(10);
        assert_eq!(MetadataMessage::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_unknown_msg_type() {
        let payload = Bytes::from_static(b"d8:msg_typei7e5:piecei0ee");
        let decoded = MetadataMessage::decode(payload.clone()).unwrap();
        let MetadataMessage::Unknown(value) = &decoded else {
            panic!("expected unknown, got {decoded:?}");
        };
        assert_eq!(value.get(b"msg_type"), Some(&Value::Integer(7)));
        assert_eq!(decoded.encode(), payload);
    }

    #[test]
    fn test_data_without_total_size_is_unknown() {
        let payload = Bytes::from_static(b"d8:msg_typei1e5:piecei0eeXYZ");
        assert!(matches!(
            MetadataMessage::decode(payload).unwrap(),
            MetadataMessage::Unknown(_)
        ));
    }

    #[test]
    fn test_non_dict_is_unknown() {
        let decoded = MetadataMessage::decode(Bytes::from_static(b"i5e")).unwrap();
        assert_eq!(decoded, MetadataMessage::Unknown(Value::Integer(5)));
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(matches!(
            MetadataMessage::decode(Bytes::from_static(b"xyz")),
            Err(PeerError::MalformedNestedValue(_))
        ));
    }

    #[test]
    fn test_requests_for() {
        let requests: Vec<_> = MetadataMessage::requests_for(40_000).collect();
        assert_eq!(
            requests,
            vec![
                MetadataMessage::Request(0),
                MetadataMessage::Request(1),
                MetadataMessage::Request(2),
            ]
        );
        assert_eq!(MetadataMessage::requests_for(0).count(), 0);
    }

    #[test]
    fn test_metadata_piece_count() {
        assert_eq!(metadata_piece_count(0), 0);
        assert_eq!(metadata_piece_count(1), 1);
        assert_eq!(metadata_piece_count(16384), 1);
        assert_eq!(metadata_piece_count(16385), 2);
        assert_eq!(metadata_piece_count(50000), 4);
    }

    #[test]
    fn test_metadata_piece_size() {
        assert_eq!(metadata_piece_size(0, 40_000), 16384);
        assert_eq!(metadata_piece_size(2, 40_000), 40_000 - 2 * 16384);
        assert_eq!(metadata_piece_size(3, 40_000), 0);
    }
}
