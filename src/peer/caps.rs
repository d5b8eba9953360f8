//! Reserved-byte capability flags exchanged in the handshake.

use bitflags::bitflags;

/// An optional base-protocol feature advertised through the reserved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// BEP-5 DHT; enables the `port` message.
    Dht,
    /// BEP-6 fast extension.
    Fast,
    /// BEP-10 extension protocol; enables the `extended` message.
    Extended,
}

impl Extension {
    /// Every extension, in declaration order.
    pub const ALL: [Extension; 3] = [Extension::Dht, Extension::Fast, Extension::Extended];

    pub const fn mask(self) -> Caps {
        match self {
            Extension::Dht => Caps::DHT,
            Extension::Fast => Caps::FAST,
            Extension::Extended => Caps::EXTENDED,
        }
    }
}

bitflags! {
    /// The 8 reserved handshake bytes read as one big-endian `u64`.
    ///
    /// Combining two sets keeps only what both sides support, so the neutral
    /// element for [`Caps::merge`] is [`Caps::IDENTITY`] rather than the empty
    /// set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps: u64 {
        /// reserved[7] & 0x01
        const DHT = 0x0000_0000_0000_0001;
        /// reserved[7] & 0x04
        const FAST = 0x0000_0000_0000_0004;
        /// reserved[5] & 0x10
        const EXTENDED = 0x0000_0000_0010_0000;
    }
}

impl Caps {
    /// All 64 bits set.
    pub const IDENTITY: Caps = Caps::from_bits_retain(u64::MAX);

    pub fn from_extensions<I: IntoIterator<Item = Extension>>(extensions: I) -> Self {
        extensions
            .into_iter()
            .fold(Caps::empty(), |caps, ext| caps | ext.mask())
    }

    pub fn to_extensions(self) -> Vec<Extension> {
        Extension::ALL
            .into_iter()
            .filter(|ext| self.allows(*ext))
            .collect()
    }

    pub fn allows(self, extension: Extension) -> bool {
        self.contains(extension.mask())
    }

    /// What both sides allow.
    pub fn merge(self, other: Caps) -> Caps {
        self & other
    }

    pub fn merge_all<I: IntoIterator<Item = Caps>>(sets: I) -> Caps {
        sets.into_iter().fold(Caps::IDENTITY, Caps::merge)
    }

    /// Reads the reserved bytes. Bits without a known meaning are dropped.
    pub fn from_reserved(reserved: [u8; 8]) -> Self {
        Caps::from_bits_truncate(u64::from_be_bytes(reserved))
    }

    /// Writes the reserved bytes with every unknown bit cleared.
    pub fn to_reserved(self) -> [u8; 8] {
        (self & Caps::all()).bits().to_be_bytes()
    }
}

impl FromIterator<Extension> for Caps {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        Caps::from_extensions(iter)
    }
}
