//! The base type table: wire tags, widths, and invalid markers.

/// The primitive wire encoding of a field.
///
/// Each base type has a fixed byte width (strings and byte arrays are sized by
/// their definition entry) and a fixed 'invalid' marker value, written in
/// place of absent data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    String,
    Float32,
    Float64,
    UInt8z,
    UInt16z,
    UInt32z,
    Byte,
    SInt64,
    UInt64,
    UInt64z,
}

impl BaseType {
    /// Look up a base type from its definition record tag.
    ///
    /// Returns `None` for tags outside the protocol's table.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Self::Enum,
            0x01 => Self::SInt8,
            0x02 => Self::UInt8,
            0x83 => Self::SInt16,
            0x84 => Self::UInt16,
            0x85 => Self::SInt32,
            0x86 => Self::UInt32,
            0x07 => Self::String,
            0x88 => Self::Float32,
            0x89 => Self::Float64,
            0x0A => Self::UInt8z,
            0x8B => Self::UInt16z,
            0x8C => Self::UInt32z,
            0x0D => Self::Byte,
            0x8E => Self::SInt64,
            0x8F => Self::UInt64,
            0x90 => Self::UInt64z,
            _ => return None,
        })
    }

    /// The definition record tag for this base type.
    pub fn tag(self) -> u8 {
        match self {
            Self::Enum => 0x00,
            Self::SInt8 => 0x01,
            Self::UInt8 => 0x02,
            Self::SInt16 => 0x83,
            Self::UInt16 => 0x84,
            Self::SInt32 => 0x85,
            Self::UInt32 => 0x86,
            Self::String => 0x07,
            Self::Float32 => 0x88,
            Self::Float64 => 0x89,
            Self::UInt8z => 0x0A,
            Self::UInt16z => 0x8B,
            Self::UInt32z => 0x8C,
            Self::Byte => 0x0D,
            Self::SInt64 => 0x8E,
            Self::UInt64 => 0x8F,
            Self::UInt64z => 0x90,
        }
    }

    /// The width of one element of this base type, in bytes.
    ///
    /// Strings and byte arrays are streams of single bytes; their field width
    /// comes from the definition entry instead.
    pub fn width(self) -> usize {
        match self {
            Self::Enum
            | Self::SInt8
            | Self::UInt8
            | Self::UInt8z
            | Self::String
            | Self::Byte => 1,
            Self::SInt16 | Self::UInt16 | Self::UInt16z => 2,
            Self::SInt32 | Self::UInt32 | Self::UInt32z | Self::Float32 => 4,
            Self::SInt64 | Self::UInt64 | Self::UInt64z | Self::Float64 => 8,
        }
    }

    /// Whether this base type stores signed integers.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::SInt8 | Self::SInt16 | Self::SInt32 | Self::SInt64)
    }

    /// Whether this base type stores floating point values.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The 'invalid' marker for this base type, as its raw bit pattern.
    ///
    /// Unsigned types (and floats) mark absence with an all-ones pattern,
    /// signed types with their maximum, and `z`-suffixed types and strings
    /// with zero. Float patterns are NaN when reinterpreted.
    pub fn invalid_bits(self) -> u64 {
        match self {
            Self::Enum | Self::UInt8 | Self::Byte => 0xFF,
            Self::SInt8 => 0x7F,
            Self::SInt16 => 0x7FFF,
            Self::UInt16 => 0xFFFF,
            Self::SInt32 => 0x7FFF_FFFF,
            Self::UInt32 | Self::Float32 => 0xFFFF_FFFF,
            Self::SInt64 => 0x7FFF_FFFF_FFFF_FFFF,
            Self::UInt64 | Self::Float64 => 0xFFFF_FFFF_FFFF_FFFF,
            Self::String | Self::UInt8z | Self::UInt16z | Self::UInt32z | Self::UInt64z => 0,
        }
    }

    /// Read one element's raw bit pattern from the head of a slice.
    ///
    /// The slice must hold at least [`width`](Self::width) bytes. Signed
    /// values are sign-extended into the returned word.
    pub(crate) fn read_bits(self, r: &[u8], big_endian: bool) -> u64 {
        let width = self.width();
        let mut bytes = [0; 8];

        if big_endian {
            bytes[8 - width..].copy_from_slice(&r[..width]);
            let x = u64::from_be_bytes(bytes);
            self.extend(x)
        } else {
            bytes[..width].copy_from_slice(&r[..width]);
            let x = u64::from_le_bytes(bytes);
            self.extend(x)
        }
    }

    /// Write one element's raw bit pattern to the tail of a buffer.
    pub(crate) fn write_bits(self, bits: u64, big_endian: bool, w: &mut Vec<u8>) {
        let width = self.width();

        if big_endian {
            w.extend_from_slice(&bits.to_be_bytes()[8 - width..]);
        } else {
            w.extend_from_slice(&bits.to_le_bytes()[..width]);
        }
    }

    /// Sign-extend a raw pattern of this type's width to 64 bits.
    fn extend(self, x: u64) -> u64 {
        if !self.is_signed() {
            return x;
        }

        match self.width() {
            1 => x as u8 as i8 as i64 as u64,
            2 => x as u16 as i16 as i64 as u64,
            4 => x as u32 as i32 as i64 as u64,
            _ => x,
        }
    }
}
