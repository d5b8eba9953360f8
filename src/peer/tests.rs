use super::*;
use crate::bencode::{self, Value};
use bytes::{BufMut, Bytes, BytesMut};

fn roundtrip(msg: Message, caps: &ExtendedCaps) -> Message {
    let mut encoded = msg.encode(caps).unwrap();
    let decoded = Message::decode(&mut encoded, caps).unwrap();
    assert!(encoded.is_empty(), "frame not fully consumed for {msg:?}");
    decoded
}

fn metadata_caps(id: u8) -> ExtendedCaps {
    ExtendedCaps::new().with(ExtendedExtension::Metadata, id)
}

#[test]
fn test_handshake_encode_decode() {
    let caps = Caps::from_extensions([Extension::Extended, Extension::Fast]);
    let handshake = Handshake::new(caps, InfoHash([1; 20]), PeerId([2; 20]));
    let encoded = handshake.encode();
    assert_eq!(encoded.len(), HANDSHAKE_LEN);
    assert_eq!(encoded[0], 19);
    assert_eq!(&encoded[1..20], b"BitTorrent protocol");

    let decoded = Handshake::decode(&encoded).unwrap();
    assert_eq!(decoded, handshake);
    assert!(decoded.has_default_protocol());
    assert!(decoded.supports(Extension::Extended));
    assert!(decoded.supports(Extension::Fast));
    assert!(!decoded.supports(Extension::Dht));
}

#[test]
fn test_handshake_custom_protocol() {
    let handshake =
        Handshake::with_protocol(&b""[..], Caps::empty(), InfoHash([3; 20]), PeerId([4; 20]))
            .unwrap();
    let encoded = handshake.encode();
    assert_eq!(encoded.len(), handshake_size(0));
    assert_eq!(Handshake::decode(&encoded).unwrap(), handshake);
    assert!(!handshake.has_default_protocol());

    let long = vec![b'x'; 256];
    assert!(matches!(
        Handshake::with_protocol(long, Caps::empty(), InfoHash::default(), PeerId::default()),
        Err(PeerError::ProtocolTooLong(256))
    ));
}

#[test]
fn test_handshake_truncated() {
    let encoded = Handshake::new(Caps::empty(), InfoHash([1; 20]), PeerId([2; 20])).encode();
    assert!(matches!(
        Handshake::decode(&encoded[..67]),
        Err(PeerError::TruncatedInput {
            needed: 68,
            available: 67
        })
    ));
    assert!(matches!(
        Handshake::decode(&[]),
        Err(PeerError::TruncatedInput { .. })
    ));
}

#[test]
fn test_handshake_sizes() {
    assert_eq!(handshake_size(19), 68);
    assert_eq!(HANDSHAKE_MAX_SIZE, 1 + 255 + 48);
}

#[test]
fn test_message_encode_decode() {
    let caps = ExtendedCaps::new();
    let messages = vec![
        Message::KeepAlive,
        StatusUpdate::Choke.into(),
        StatusUpdate::Unchoke.into(),
        StatusUpdate::Interested.into(),
        StatusUpdate::NotInterested.into(),
        RegularMessage::Have(42).into(),
        RegularMessage::Bitfield(Bitfield::from_bytes(vec![0xf0, 0x01])).into(),
        RegularMessage::Request(BlockIndex::new(1, 0, 16384)).into(),
        RegularMessage::Cancel(BlockIndex::new(1, 0, 16384)).into(),
        Message::Port(6881),
        FastMessage::HaveAll.into(),
        FastMessage::HaveNone.into(),
        FastMessage::SuggestPiece(7).into(),
        FastMessage::RejectRequest(BlockIndex::new(2, 16384, 16384)).into(),
        FastMessage::AllowedFast(9).into(),
        ExtendedMessage::Unknown {
            id: 42,
            payload: Bytes::from_static(b"opaque"),
        }
        .into(),
    ];

    for msg in messages {
        assert_eq!(roundtrip(msg.clone(), &caps), msg);
    }
}

#[test]
fn test_piece_message() {
    let block = Block::new(0, 16384, Bytes::from_static(b"hello world"));
    let msg = Message::Regular(RegularMessage::Piece(block.clone()));
    let encoded = msg.encode(&ExtendedCaps::new()).unwrap();
    assert_eq!(&encoded[..5], &[0, 0, 0, 20, 7]);
    assert_eq!(roundtrip(msg, &ExtendedCaps::new()), Message::Regular(RegularMessage::Piece(block.clone())));
    assert_eq!(block.index(), BlockIndex::new(0, 16384, 11));
}

#[test]
fn test_request_wire_format() {
    let msg = Message::Regular(RegularMessage::Request(BlockIndex::new(3, 0, 16384)));
    let encoded = msg.encode(&ExtendedCaps::new()).unwrap();
    assert_eq!(
        &encoded[..],
        &[0, 0, 0, 13, 6, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0x40, 0]
    );
}

#[test]
fn test_have_all_wire_format() {
    let encoded = Message::Fast(FastMessage::HaveAll)
        .encode(&ExtendedCaps::new())
        .unwrap();
    assert_eq!(&encoded[..], &[0, 0, 0, 1, 0x0e]);
}

#[test]
fn test_keep_alive() {
    let mut data = Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 1, 2]);
    assert_eq!(
        Message::decode(&mut data, &ExtendedCaps::new()).unwrap(),
        Message::KeepAlive
    );
    assert_eq!(&data[..], &[0, 0, 0, 1, 2]);
}

#[test]
fn test_truncated_frame_consumes_nothing() {
    let caps = ExtendedCaps::new();
    let mut data = Bytes::from_static(&[0, 0]);
    assert!(matches!(
        Message::decode(&mut data, &caps),
        Err(PeerError::TruncatedInput { needed: 4, available: 2 })
    ));

    let mut data = Bytes::from_static(&[0, 0, 0, 5, 4, 0]);
    assert!(matches!(
        Message::decode(&mut data, &caps),
        Err(PeerError::TruncatedInput { needed: 9, available: 6 })
    ));
    assert_eq!(data.len(), 6);
}

#[test]
fn test_length_must_match_layout() {
    let caps = ExtendedCaps::new();

    let mut long_have = Bytes::from_static(&[0, 0, 0, 6, 4, 0, 0, 0, 1, 0]);
    assert!(matches!(
        Message::decode(&mut long_have, &caps),
        Err(PeerError::LengthMismatch { id: 4, expected: 5, actual: 6 })
    ));

    let mut short_request = Bytes::from_static(&[0, 0, 0, 5, 6, 0, 0, 0, 1, 0, 0, 0, 0]);
    assert!(matches!(
        Message::decode(&mut short_request, &caps),
        Err(PeerError::LengthMismatch { id: 6, expected: 13, actual: 5 })
    ));
    assert_eq!(short_request.len(), 4);
    assert_eq!(
        Message::decode(&mut short_request, &caps).unwrap(),
        Message::KeepAlive
    );

    let mut choke_with_payload = Bytes::from_static(&[0, 0, 0, 2, 0, 0]);
    assert!(matches!(
        Message::decode(&mut choke_with_payload, &caps),
        Err(PeerError::LengthMismatch { id: 0, .. })
    ));

    let mut short_piece = Bytes::from_static(&[0, 0, 0, 5, 7, 0, 0, 0, 0]);
    assert!(matches!(
        Message::decode(&mut short_piece, &caps),
        Err(PeerError::LengthMismatch { id: 7, expected: 9, actual: 5 })
    ));
    assert!(short_piece.is_empty());

    let mut empty_extended = Bytes::from_static(&[0, 0, 0, 1, 20, 0, 0, 0, 1, 2]);
    assert!(matches!(
        Message::decode(&mut empty_extended, &caps),
        Err(PeerError::LengthMismatch { id: 20, expected: 2, actual: 1 })
    ));
    assert_eq!(
        Message::decode(&mut empty_extended, &caps).unwrap(),
        Message::Status(StatusUpdate::Unchoke)
    );
}

#[test]
fn test_unknown_message_id() {
    let caps = ExtendedCaps::new();
    for frame in [&[0u8, 0, 0, 1, 0x7f][..], &[0, 0, 0, 4, 0x7f, 9, 8, 7][..]] {
        let mut data = Bytes::copy_from_slice(frame);
        match Message::decode(&mut data, &caps) {
            Err(PeerError::UnknownMessageId { id, payload }) => {
                assert_eq!(id, 0x7f);
                assert_eq!(&payload[..], &frame[5..]);
            }
            other => panic!("expected unknown id, got {other:?}"),
        }
        assert!(data.is_empty());
    }
}

#[test]
fn test_requires() {
    assert_eq!(Message::Port(1).requires(), Some(Extension::Dht));
    assert_eq!(
        Message::Fast(FastMessage::HaveNone).requires(),
        Some(Extension::Fast)
    );
    assert_eq!(
        Message::Extended(ExtendedMessage::Unknown {
            id: 1,
            payload: Bytes::new()
        })
        .requires(),
        Some(Extension::Extended)
    );
    assert_eq!(Message::KeepAlive.requires(), None);
    assert_eq!(Message::Status(StatusUpdate::Choke).requires(), None);
    assert_eq!(Message::Regular(RegularMessage::Have(0)).requires(), None);
}

#[test]
fn test_extended_caps_roundtrip() {
    let caps = metadata_caps(5);
    let value = caps.to_value();
    assert_eq!(bencode::encode(&value), b"d11:ut_metadatai5ee");
    assert_eq!(ExtendedCaps::from_value(&value).unwrap(), caps);
}

#[test]
fn test_extended_caps_unrecognized_and_disabled() {
    let value = bencode::decode(b"d11:lt_donthavei7e11:ut_metadatai0e6:ut_pexi1ee").unwrap();
    let caps = ExtendedCaps::from_value(&value).unwrap();

    assert_eq!(caps.len(), 2);
    assert_eq!(caps.id_of(&ExtendedExtension::Metadata), None);
    assert_eq!(
        caps.extension_for(1),
        Some(&ExtendedExtension::Other("ut_pex".into()))
    );
    assert_eq!(caps.to_value(), bencode::decode(b"d11:lt_donthavei7e6:ut_pexi1ee").unwrap());
}

#[test]
fn test_extended_caps_rejects_bad_ids() {
    for data in [&b"d6:ut_pexi256ee"[..], b"d6:ut_pex1:xe", b"li1ee"] {
        let value = bencode::decode(data).unwrap();
        assert!(matches!(
            ExtendedCaps::from_value(&value),
            Err(PeerError::MalformedNestedValue(_))
        ));
    }
}

#[test]
fn test_resolve_unnegotiated() {
    let caps = ExtendedCaps::new();
    assert!(matches!(
        caps.resolve(&ExtendedExtension::Metadata),
        Err(PeerError::UnnegotiatedExtension(name)) if name == "ut_metadata"
    ));
    assert_eq!(metadata_caps(3).resolve(&ExtendedExtension::Metadata).unwrap(), 3);
}

#[test]
fn test_insert_zero_disables() {
    let mut caps = metadata_caps(3);
    assert_eq!(caps.insert(ExtendedExtension::Metadata, 0), Some(3));
    assert!(caps.is_empty());
}

#[test]
fn test_extension_handshake() {
    let mut hs = ExtendedHandshake::new(
        ExtendedCaps::new()
            .with(ExtendedExtension::Other("ut_pex".into()), 1)
            .with(ExtendedExtension::Metadata, 2),
    );
    hs.client_version = Some("rbit/0.1".to_string());
    hs.ipv4 = Some("10.0.0.1".parse().unwrap());
    hs.ipv6 = Some("::1".parse().unwrap());
    hs.listen_port = Some(6881);
    hs.request_queue_len = Some(250);
    hs.metadata_size = Some(31_337);
    hs.yourip = Some(Bytes::from_static(&[192, 168, 1, 2]));

    let encoded = hs.encode();
    let decoded = ExtendedHandshake::decode(&encoded).unwrap();
    assert_eq!(decoded, hs);
    assert_eq!(decoded.extensions.id_of(&ExtendedExtension::Metadata), Some(2));
}

#[test]
fn test_extension_handshake_unknown_keys_preserved() {
    let data = b"d1:ai1e1:md11:ut_metadatai3ee1:p5:oops!1:zli1eee";
    let hs = ExtendedHandshake::decode(data).unwrap();
    assert_eq!(hs.listen_port, None);
    assert_eq!(hs.extra.len(), 2);
    assert_eq!(
        hs.extra.get(&b"z"[..]),
        Some(&Value::List(vec![Value::Integer(1)]))
    );
    assert_eq!(&hs.encode()[..], b"d1:ai1e1:md11:ut_metadatai3ee1:zli1eee");
}

#[test]
fn test_extension_handshake_empty_m_is_encoded() {
    let hs = ExtendedHandshake::default();
    assert_eq!(&hs.encode()[..], b"d1:mdee");
}

#[test]
fn test_extension_handshake_requires_m() {
    for data in [&b"d1:pi6881ee"[..], b"d1:mi1ee", b"i1e"] {
        assert!(matches!(
            ExtendedHandshake::decode(data),
            Err(PeerError::MalformedNestedValue(_))
        ));
    }
}

#[test]
fn test_metadata_request_frame() {
    let caps = metadata_caps(5);
    let msg = Message::from(ExtendedMessage::from(MetadataMessage::Request(2)));
    let encoded = msg.encode(&caps).unwrap();

    let dict = b"d8:msg_typei0e5:piecei2ee";
    let mut expected = BytesMut::new();
    expected.put_u32(2 + dict.len() as u32);
    expected.put_u8(20);
    expected.put_u8(5);
    expected.put_slice(dict);
    assert_eq!(encoded, expected.freeze());

    assert_eq!(roundtrip(msg.clone(), &caps), msg);
}

#[test]
fn test_metadata_data_roundtrip_through_envelope() {
    let caps = metadata_caps(3);
    let msg: Message = ExtendedMessage::Metadata(MetadataMessage::Data {
        piece: 1,
        total_size: 20_000,
        payload: Bytes::from(vec![0xab; 20_000 - 16384]),
    })
    .into();
    assert_eq!(roundtrip(msg.clone(), &caps), msg);
}

#[test]
fn test_metadata_unnegotiated() {
    let msg = Message::from(ExtendedMessage::from(MetadataMessage::Reject(0)));
    assert!(matches!(
        msg.encode(&ExtendedCaps::new()),
        Err(PeerError::UnnegotiatedExtension(_))
    ));
}

#[test]
fn test_raw_extended_message_cannot_use_handshake_id() {
    let msg = Message::from(ExtendedMessage::Unknown {
        id: 0,
        payload: Bytes::from_static(b"xyz"),
    });
    let mut buf = BytesMut::new();
    assert!(matches!(
        msg.encode_into(&ExtendedCaps::new(), &mut buf),
        Err(PeerError::ReservedExtendedId)
    ));
    assert!(buf.is_empty());
}

#[test]
fn test_unknown_extended_sub_id() {
    let mut frame = Bytes::from_static(&[0, 0, 0, 4, 20, 9, 1, 2]);
    assert_eq!(
        Message::decode(&mut frame, &metadata_caps(3)).unwrap(),
        Message::Extended(ExtendedMessage::Unknown {
            id: 9,
            payload: Bytes::from_static(&[1, 2])
        })
    );
}

#[test]
fn test_extended_handshake_through_envelope() {
    let hs = ExtendedHandshake::new(metadata_caps(3));
    let msg = Message::Extended(hs.into());
    let encoded = msg.encode(&ExtendedCaps::new()).unwrap();
    assert_eq!(encoded[4], 20);
    assert_eq!(encoded[5], 0);
    assert_eq!(roundtrip(msg.clone(), &ExtendedCaps::new()), msg);
}

#[test]
fn test_bitfield_is_opaque() {
    let bf = Bitfield::from_bytes(vec![0x80, 0x10]);
    assert_eq!(bf.len(), 2);
    assert!(!bf.is_empty());
    assert_eq!(&bf.as_bytes()[..], &[0x80, 0x10]);
    assert!(Bitfield::default().is_empty());
}

#[test]
fn test_peer_id_from_bytes() {
    let raw = [7u8; 20];
    let id = PeerId::from_bytes(&raw).unwrap();
    assert_eq!(id.as_bytes(), &raw);
    assert_eq!(format!("{:?}", id), format!("PeerId({})", "07".repeat(20)));
    assert!(PeerId::from_bytes(&raw[..19]).is_none());
}
