//! ID3v2 file and frame headers
//!
//! Both headers are exactly 10 bytes and are decoded field by field:
//!
//! ```text
//! file header:  "ID3" | major | minor | flags | size (sync-safe, 4 bytes)
//! frame header: id (4 bytes) | size (4 bytes, see SizeCodec) | status | format
//! ```

use crate::error::TagError;
use crate::synchsafe::{decode_synchsafe, encode_synchsafe, SizeCodec};

use byteorder::{BigEndian, ByteOrder};

/// Size of both the file header and a frame header
pub const HEADER_SIZE: usize = 10;

/// Frame IDs are always 4 characters from v2.3 on
pub const FRAME_ID_LEN: usize = 4;

const ID3_MAGIC: &[u8; 3] = b"ID3";

pub const FLAG_UNSYNCHRONIZED: u8 = 1 << 7;
pub const FLAG_EXTENDED: u8 = 1 << 6;
pub const FLAG_EXPERIMENTAL: u8 = 1 << 5;
pub const FLAG_FOOTER: u8 = 1 << 4;
const FLAGS_RESERVED: u8 = 0b0000_1111;

/// Frame status byte: the frame must not be altered
const STATUS_READ_ONLY: u8 = 1 << 5;

/// The header at offset 0 of a tagged MP3 file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 3],
    pub major_version: u8,
    pub minor_version: u8,
    pub flags: u8,
    /// Tag section size, excluding this header
    pub size: u32,
}

impl FileHeader {
    /// Decode the header fields; no validation is done here
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: [raw[0], raw[1], raw[2]],
            major_version: raw[3],
            minor_version: raw[4],
            flags: raw[5],
            size: decode_synchsafe(BigEndian::read_u32(&raw[6..10])),
        }
    }

    /// Check the header against what this crate can read and rewrite
    pub fn validate(&self) -> Result<(), TagError> {
        if &self.magic != ID3_MAGIC {
            return Err(TagError::InvalidHeader("missing ID3 magic"));
        }
        if self.major_version < 3 || self.major_version == 0xFF || self.minor_version == 0xFF {
            return Err(TagError::InvalidHeader("obsolete or corrupt version"));
        }
        if self.flags & (FLAG_EXTENDED | FLAG_EXPERIMENTAL | FLAGS_RESERVED) != 0 {
            return Err(TagError::InvalidHeader("unsupported header flags"));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Frame size codec implied by the major version
    pub fn size_codec(&self) -> SizeCodec {
        SizeCodec::for_version(self.major_version)
    }

    /// "2.3.0" style version string
    pub fn version(&self) -> String {
        format!("2.{}.{}", self.major_version, self.minor_version)
    }

    pub fn is_unsynchronized(&self) -> bool {
        self.flags & FLAG_UNSYNCHRONIZED != 0
    }

    pub fn has_footer(&self) -> bool {
        self.flags & FLAG_FOOTER != 0
    }

    /// Offset of the first byte after the tag section
    pub fn audio_offset(&self) -> u32 {
        HEADER_SIZE as u32 + self.size
    }

    /// Encode this header with a new tag section size
    pub fn to_bytes(&self, section_size: u32) -> Result<[u8; HEADER_SIZE], TagError> {
        let mut out = [0u8; HEADER_SIZE];
        out[..3].copy_from_slice(&self.magic);
        out[3] = self.major_version;
        out[4] = self.minor_version;
        out[5] = self.flags;
        BigEndian::write_u32(&mut out[6..], encode_synchsafe(section_size)?);
        Ok(out)
    }
}

/// The header preceding every frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: [u8; FRAME_ID_LEN],
    /// Payload size, excluding this header
    pub size: u32,
    pub status: u8,
    pub format: u8,
}

impl FrameHeader {
    /// Decode a frame header from the start of `raw`
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes remain.
    pub fn parse(raw: &[u8], codec: SizeCodec) -> Option<Self> {
        if raw.len() < HEADER_SIZE {
            return None;
        }

        Some(Self {
            id: [raw[0], raw[1], raw[2], raw[3]],
            size: codec.decode(&raw[4..8]),
            status: raw[8],
            format: raw[9],
        })
    }

    /// Header plus payload
    pub fn total_size(&self) -> usize {
        HEADER_SIZE + self.size as usize
    }

    pub fn is_read_only(&self) -> bool {
        self.status & STATUS_READ_ONLY != 0
    }

    /// Encode a header for writing; status and format flags are always cleared
    pub fn write_bytes(
        id: &[u8; FRAME_ID_LEN],
        size: u32,
        codec: SizeCodec,
    ) -> Result<[u8; HEADER_SIZE], TagError> {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(id);
        out[4..8].copy_from_slice(&codec.encode(size)?);
        Ok(out)
    }
}

/// True if `id` is exactly four characters from `[0-9A-Z]`
pub fn is_valid_frame_id(id: &[u8]) -> bool {
    id.len() == FRAME_ID_LEN
        && id
            .iter()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

/// True if the bytes at `raw` look like the start of the padding region
///
/// Padding starts with a zero byte; a garbled frame ID is treated the same way.
pub fn is_padding(raw: &[u8]) -> bool {
    match raw.first() {
        None | Some(0) => true,
        Some(_) => raw.len() < FRAME_ID_LEN || !is_valid_frame_id(&raw[..FRAME_ID_LEN]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(bytes: [u8; 10]) -> FileHeader {
        FileHeader::parse(&bytes)
    }

    #[test]
    fn test_parse_file_header() {
        let h = header([b'I', b'D', b'3', 4, 0, 0, 0x00, 0x00, 0x02, 0x01]);
        assert_eq!(h.major_version, 4);
        assert_eq!(h.size, 257);
        assert_eq!(h.audio_offset(), 267);
        assert_eq!(h.version(), "2.4.0");
        assert!(h.is_valid());
        assert_eq!(h.size_codec(), SizeCodec::SyncSafe);
    }

    #[test]
    fn test_invalid_file_headers() {
        assert!(!header(*b"XYZ\x03\x00\x00\x00\x00\x00\x00").is_valid());
        // ID3v2.2 is obsolete
        assert!(!header(*b"ID3\x02\x00\x00\x00\x00\x00\x00").is_valid());
        assert!(!header(*b"ID3\xFF\x00\x00\x00\x00\x00\x00").is_valid());
        assert!(!header(*b"ID3\x03\xFF\x00\x00\x00\x00\x00").is_valid());
        // Extended header, experimental, reserved bits
        assert!(!header(*b"ID3\x03\x00\x40\x00\x00\x00\x00").is_valid());
        assert!(!header(*b"ID3\x03\x00\x20\x00\x00\x00\x00").is_valid());
        assert!(!header(*b"ID3\x03\x00\x01\x00\x00\x00\x00").is_valid());
        // Unsynchronized and footer bits are tolerated
        assert!(header(*b"ID3\x03\x00\x90\x00\x00\x00\x00").is_valid());
    }

    #[test]
    fn test_file_header_to_bytes() {
        let h = header(*b"ID3\x03\x00\x00\x00\x00\x00\x00");
        let bytes = h.to_bytes(4096).unwrap();
        assert_eq!(&bytes, b"ID3\x03\x00\x00\x00\x00\x20\x00");
        assert_eq!(FileHeader::parse(&bytes).size, 4096);
        assert!(h.to_bytes(1 << 28).is_err());
    }

    #[test]
    fn test_frame_header_version_dependent_size() {
        let raw = [b'T', b'I', b'T', b'2', 0x00, 0x00, 0x01, 0x00, 0x20, 0x00];
        let v3 = FrameHeader::parse(&raw, SizeCodec::Plain).unwrap();
        let v4 = FrameHeader::parse(&raw, SizeCodec::SyncSafe).unwrap();
        assert_eq!(v3.size, 256);
        assert_eq!(v4.size, 128);
        assert!(v3.is_read_only());
        assert_eq!(v3.total_size(), 266);
        assert!(FrameHeader::parse(&raw[..9], SizeCodec::Plain).is_none());
    }

    #[test]
    fn test_frame_header_write_bytes() {
        let bytes = FrameHeader::write_bytes(b"TALB", 200, SizeCodec::SyncSafe).unwrap();
        assert_eq!(&bytes, b"TALB\x00\x00\x01\x48\x00\x00");
        let bytes = FrameHeader::write_bytes(b"TALB", 200, SizeCodec::Plain).unwrap();
        assert_eq!(&bytes, b"TALB\x00\x00\x00\xC8\x00\x00");
    }

    #[test]
    fn test_frame_id_validity() {
        assert!(is_valid_frame_id(b"TIT2"));
        assert!(is_valid_frame_id(b"COMM"));
        assert!(!is_valid_frame_id(b"tit2"));
        assert!(!is_valid_frame_id(b"TI:2"));
        assert!(!is_valid_frame_id(b"TI@2"));
        assert!(!is_valid_frame_id(b"TIT"));

        assert!(is_padding(&[0, 0, 0, 0]));
        assert!(is_padding(b"T\x00\x00\x00"));
        assert!(is_padding(&[]));
        assert!(!is_padding(b"TPE1\x00\x00"));
    }
}
