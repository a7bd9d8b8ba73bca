//! ID3v2 size integers
//!
//! Two encodings share the same 4-byte big-endian slot on disk:
//!
//! ```text
//! plain (v2.3 frame sizes):  aaaaaaaa bbbbbbbb cccccccc dddddddd   32 bits
//! sync-safe (everything else): 0aaaaaaa 0bbbbbbb 0ccccccc 0ddddddd 28 bits
//! ```
//!
//! The tag header size is always sync-safe. Frame sizes are plain in v2.3 and
//! sync-safe from v2.4 on, so the choice is made once per file with
//! [`SizeCodec::for_version`] and passed down to every size computation.

use byteorder::{BigEndian, ByteOrder};

use crate::error::TagError;

/// Largest value a sync-safe integer can hold
pub const SYNCHSAFE_MAX: u32 = (1 << 28) - 1;

/// Unpack a sync-safe integer already read as big-endian
pub fn decode_synchsafe(raw: u32) -> u32 {
    (raw & 0x7F) | ((raw >> 1) & 0x3F80) | ((raw >> 2) & 0x001F_C000) | ((raw >> 3) & 0x0FE0_0000)
}

/// Spread a value over the low 7 bits of each byte
pub fn encode_synchsafe(value: u32) -> Result<u32, TagError> {
    if value > SYNCHSAFE_MAX {
        return Err(TagError::SizeOverflow(value));
    }

    Ok((value & 0x7F)
        | ((value & 0x3F80) << 1)
        | ((value & 0x001F_C000) << 2)
        | ((value & 0x0FE0_0000) << 3))
}

/// Size encoding used by the frames of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCodec {
    /// 8 significant bits per byte (ID3v2.3)
    Plain,
    /// 7 significant bits per byte (ID3v2.4+)
    SyncSafe,
}

impl SizeCodec {
    /// Frame size codec for a tag's major version
    pub fn for_version(major: u8) -> Self {
        if major == 3 {
            SizeCodec::Plain
        } else {
            SizeCodec::SyncSafe
        }
    }

    /// Decode the 4 big-endian bytes at the start of `raw`
    ///
    /// `raw` must hold at least 4 bytes.
    pub fn decode(self, raw: &[u8]) -> u32 {
        let value = BigEndian::read_u32(raw);
        match self {
            SizeCodec::Plain => value,
            SizeCodec::SyncSafe => decode_synchsafe(value),
        }
    }

    /// Encode a size into its 4 on-disk bytes
    pub fn encode(self, value: u32) -> Result<[u8; 4], TagError> {
        let raw = match self {
            SizeCodec::Plain => value,
            SizeCodec::SyncSafe => encode_synchsafe(value)?,
        };

        let mut out = [0u8; 4];
        BigEndian::write_u32(&mut out, raw);
        Ok(out)
    }
}
