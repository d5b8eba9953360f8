use bytes::Bytes;

/// The bitmap carried by a bitfield message.
///
/// The codec moves these bytes verbatim. How many bits are meaningful depends
/// on the torrent, which the wire does not know.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitfield {
    bits: Bytes,
}

impl Bitfield {
    pub fn from_bytes(bits: impl Into<Bytes>) -> Self {
        Self { bits: bits.into() }
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.bits
    }

    /// Width of the bitmap in bytes.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}
