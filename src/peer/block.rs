use bytes::{Buf, BufMut, Bytes};

/// Identifies a block: a byte range inside a piece.
///
/// Request, cancel and reject messages carry it as three big-endian `u32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIndex {
    pub piece: u32,
    pub offset: u32,
    pub length: u32,
}

impl BlockIndex {
    pub const ENCODED_LEN: usize = 12;

    pub fn new(piece: u32, offset: u32, length: u32) -> Self {
        Self {
            piece,
            offset,
            length,
        }
    }

    pub(crate) fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.piece);
        buf.put_u32(self.offset);
        buf.put_u32(self.length);
    }

    /// Caller guarantees 12 bytes are available.
    pub(crate) fn get<B: Buf>(buf: &mut B) -> Self {
        Self {
            piece: buf.get_u32(),
            offset: buf.get_u32(),
            length: buf.get_u32(),
        }
    }
}

/// The payload of a piece message.
///
/// Only piece and offset travel in the header; the length is whatever the
/// frame has left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub piece: u32,
    pub offset: u32,
    pub data: Bytes,
}

impl Block {
    pub const HEADER_LEN: usize = 8;

    pub fn new(piece: u32, offset: u32, data: Bytes) -> Self {
        Self {
            piece,
            offset,
            data,
        }
    }

    pub fn index(&self) -> BlockIndex {
        BlockIndex {
            piece: self.piece,
            offset: self.offset,
            length: self.data.len() as u32,
        }
    }
}
