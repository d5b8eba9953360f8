//! Protocol constants and codec defaults.

// ============================================================================
// Handshake
// ============================================================================

/// Protocol string sent by standard BitTorrent peers
pub const PROTOCOL: &[u8] = b"BitTorrent protocol";

// ============================================================================
// Message framing
// ============================================================================

/// Size of the big-endian length prefix on every message
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest frame the codec accepts by default (16 MiB).
/// Piece messages are the largest regular traffic; this leaves room for
/// unusually large blocks and bitfields of huge torrents.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// ============================================================================
// Extension protocol (BEP-10) and metadata exchange (BEP-9)
// ============================================================================

/// Sub-id of the extended handshake; never assigned to an extension
pub const EXTENDED_HANDSHAKE_ID: u8 = 0;

/// Extension name of the metadata exchange
pub const UT_METADATA: &str = "ut_metadata";

/// Sub-id we ask peers to use for ut_metadata
pub const DEFAULT_UT_METADATA_ID: u8 = 2;

/// Size of a metadata piece (16 KiB)
pub const METADATA_PIECE_SIZE: usize = 16384;

/// Client version advertised in the extended handshake (`v`)
pub const CLIENT_VERSION: &str = concat!("peerwire/", env!("CARGO_PKG_VERSION"));

/// Request queue depth advertised in the extended handshake (`reqq`)
pub const DEFAULT_REQUEST_QUEUE_LEN: u32 = 500;
