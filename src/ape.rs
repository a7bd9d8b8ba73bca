//! APEv2 tag locator and reader
//!
//! An APEv2 block sits near the end of the file:
//!
//! ```text
//! header (32) | item ... | footer (32)
//! header/footer: "APETAGEX" | version | size | item count | flags | reserved (8)
//! item:          value size | flags | key | NUL | value
//! ```
//!
//! All integers are little-endian. `size` covers the items and the footer but
//! not the header. APEv2 tags are only read, never written.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::TagError;

/// APEv2 tag preamble
pub const APE_PREAMBLE: &[u8; 8] = b"APETAGEX";

/// Size of the header and of the footer
pub const APE_HEADER_SIZE: usize = 32;

/// APEv2 tag version
const APE_VERSION: u32 = 2000;

/// APEv2 tag flags
const APE_FLAG_HEADER_PRESENT: u32 = 1 << 31;
const APE_FLAG_IS_HEADER: u32 = 1 << 29;

/// APEv2 item flags
const APE_ITEM_READ_ONLY: u32 = 1 << 0;
const APE_ITEM_BINARY: u32 = 1 << 1;

/// Longest key accepted in an item
const APE_MAX_KEY_LEN: usize = 255;

/// An APEv2 header or footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApeHeader {
    pub version: u32,
    /// Items plus footer, in bytes
    pub size: u32,
    pub item_count: u32,
    pub flags: u32,
}

impl ApeHeader {
    /// Decode the 32 bytes at the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self, TagError> {
        if data.len() < APE_HEADER_SIZE {
            return Err(TagError::InvalidApeTag("truncated header"));
        }
        if &data[..8] != APE_PREAMBLE {
            return Err(TagError::InvalidApeTag("missing APETAGEX preamble"));
        }

        Ok(Self {
            version: LittleEndian::read_u32(&data[8..]),
            size: LittleEndian::read_u32(&data[12..]),
            item_count: LittleEndian::read_u32(&data[16..]),
            flags: LittleEndian::read_u32(&data[20..]),
        })
    }

    pub fn is_header(&self) -> bool {
        self.flags & APE_FLAG_IS_HEADER != 0
    }

    pub fn has_header(&self) -> bool {
        self.flags & APE_FLAG_HEADER_PRESENT != 0
    }
}

/// APEv2 tag item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApeItem {
    pub key: String,
    pub flags: u32,
    pub value: Vec<u8>,
}

impl ApeItem {
    pub fn is_binary(&self) -> bool {
        self.flags & APE_ITEM_BINARY != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & APE_ITEM_READ_ONLY != 0
    }

    /// Value as UTF-8 text, `None` for binary items
    pub fn text(&self) -> Option<String> {
        if self.is_binary() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.value).into_owned())
    }
}

/// APEv2 tag collection
#[derive(Debug, Clone, Default)]
pub struct ApeTag {
    /// Absolute file offset of the first byte of the block
    pub offset: u64,
    pub version: u32,
    items: Vec<ApeItem>,
}

impl ApeTag {
    /// Get an item by key (case-insensitive)
    pub fn get(&self, key: &str) -> Option<&ApeItem> {
        self.items
            .iter()
            .find(|item| item.key.eq_ignore_ascii_case(key))
    }

    pub fn items(&self) -> &[ApeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parse a block that begins with its 32-byte header
    pub fn parse(block: &[u8]) -> Result<Self, TagError> {
        let header = ApeHeader::parse(block)?;
        if !header.is_header() {
            return Err(TagError::InvalidApeTag("block does not start with a header"));
        }

        let mut tag = Self::parse_items(&block[APE_HEADER_SIZE..], &header)?;
        tag.version = header.version;
        Ok(tag)
    }

    // `data` starts at the first item; `header` is the header or the footer
    fn parse_items(data: &[u8], header: &ApeHeader) -> Result<Self, TagError> {
        if header.version != APE_VERSION {
            log::debug!("APE tag version {} (expected {})", header.version, APE_VERSION);
        }

        let mut tag = Self {
            version: header.version,
            ..Self::default()
        };
        let mut pos = 0;

        for _ in 0..header.item_count {
            if pos + 8 > data.len() {
                return Err(TagError::InvalidApeTag("item header past end of tag"));
            }
            let value_size = LittleEndian::read_u32(&data[pos..]) as usize;
            let flags = LittleEndian::read_u32(&data[pos + 4..]);
            pos += 8;

            let key_len = data[pos..]
                .iter()
                .take(APE_MAX_KEY_LEN + 1)
                .position(|&b| b == 0)
                .ok_or(TagError::InvalidApeTag("unterminated or oversized item key"))?;
            let key = String::from_utf8_lossy(&data[pos..pos + key_len]).into_owned();
            pos += key_len + 1;

            let value = data
                .get(pos..pos + value_size)
                .ok_or(TagError::InvalidApeTag("item value past end of tag"))?;
            pos += value_size;

            tag.items.push(ApeItem {
                key,
                flags,
                value: value.to_vec(),
            });
        }

        // The items should be followed directly by the footer
        let footer_ok = pos + APE_HEADER_SIZE == header.size as usize
            && ApeHeader::parse(&data[pos..]).is_ok_and(|footer| !footer.is_header());
        if !footer_ok {
            log::warn!(
                "APE tag footer mismatch: items end at {}, declared size {}",
                pos,
                header.size
            );
        }

        Ok(tag)
    }
}

/// Search backwards from the end of the file for the APEv2 preamble
///
/// Windows of `chunk` bytes are read from the end towards the start. Every
/// window after the first reaches 7 bytes into the one before it, so a
/// preamble straddling a window boundary is still found. Returns the absolute
/// offset of the last preamble in the window where one is found, so stray
/// text earlier in the file cannot hide a tag near its end.
pub fn find_ape_tag<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
    chunk: usize,
) -> io::Result<Option<u64>> {
    let chunk = chunk.max(APE_PREAMBLE.len()) as u64;
    let overlap = APE_PREAMBLE.len() as u64 - 1;

    let mut start = file_len.saturating_sub(chunk);
    let mut window = chunk;
    let mut buf = Vec::new();

    loop {
        let len = window.min(file_len - start) as usize;
        buf.resize(len, 0);
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut buf)?;

        if let Some(pos) = buf.windows(APE_PREAMBLE.len()).rposition(|w| w == APE_PREAMBLE) {
            return Ok(Some(start + pos as u64));
        }

        if start == 0 {
            return Ok(None);
        }
        start = start.saturating_sub(chunk);
        window = chunk + overlap;
    }
}

/// Locate and read the APEv2 tag, if the file has one
///
/// If the search lands on a footer, its declared size leads back to the
/// start of the block.
pub fn read_ape_tag<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
    chunk: usize,
) -> anyhow::Result<Option<ApeTag>> {
    let Some(found) = find_ape_tag(reader, file_len, chunk)? else {
        return Ok(None);
    };

    let first = read_block(reader, found, APE_HEADER_SIZE)?;
    let located = ApeHeader::parse(&first)?;

    let tag = if located.is_header() {
        let block = read_block(reader, found, APE_HEADER_SIZE + located.size as usize)?;
        let mut tag = ApeTag::parse(&block)?;
        tag.offset = found;
        tag
    } else {
        // Found the footer: items sit `size - 32` bytes before it
        let items_start = (found + APE_HEADER_SIZE as u64)
            .checked_sub(located.size as u64)
            .ok_or(TagError::InvalidApeTag("footer size exceeds file"))?;
        let block = read_block(reader, items_start, located.size as usize)?;
        let mut tag = ApeTag::parse_items(&block, &located)?;
        tag.offset = if located.has_header() {
            items_start.saturating_sub(APE_HEADER_SIZE as u64)
        } else {
            items_start
        };
        tag
    };

    log::debug!("APE tag at offset {} with {} items", tag.offset, tag.len());
    Ok(Some(tag))
}

fn read_block<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let mut block = vec![0u8; len];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut block)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ape_header(size: u32, count: u32, is_header: bool) -> Vec<u8> {
        let mut out = APE_PREAMBLE.to_vec();
        out.extend_from_slice(&APE_VERSION.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        let mut flags = APE_FLAG_HEADER_PRESENT;
        if is_header {
            flags |= APE_FLAG_IS_HEADER;
        }
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out
    }

    fn ape_block(items: &[(&str, u32, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (key, flags, value) in items {
            body.extend_from_slice(&(value.len() as u32).to_le_bytes());
            body.extend_from_slice(&flags.to_le_bytes());
            body.extend_from_slice(key.as_bytes());
            body.push(0);
            body.extend_from_slice(value);
        }
        let size = (body.len() + APE_HEADER_SIZE) as u32;
        let count = items.len() as u32;

        let mut out = ape_header(size, count, true);
        out.extend(body);
        out.extend(ape_header(size, count, false));
        out
    }

    #[test]
    fn test_parse_items() {
        let block = ape_block(&[
            ("Artist", 0, b"Someone"),
            ("Cover", APE_ITEM_BINARY | APE_ITEM_READ_ONLY, &[1, 2, 3]),
        ]);
        let tag = ApeTag::parse(&block).unwrap();
        assert_eq!(tag.len(), 2);
        assert_eq!(tag.version, 2000);

        let artist = tag.get("ARTIST").unwrap();
        assert_eq!(artist.text().as_deref(), Some("Someone"));
        assert!(!artist.is_read_only());

        let cover = tag.get("cover").unwrap();
        assert!(cover.is_binary());
        assert!(cover.is_read_only());
        assert_eq!(cover.text(), None);
        assert!(tag.get("Album").is_none());
    }

    #[test]
    fn test_parse_rejects_truncated_items() {
        let mut block = ape_block(&[("Title", 0, b"Long value here")]);
        block.truncate(APE_HEADER_SIZE + 12);
        assert!(ApeTag::parse(&block).is_err());
        assert!(ApeTag::parse(b"APETAGEX").is_err());
    }

    #[test]
    fn test_find_at_chunk_boundary() {
        let mut data = vec![0u8; 10_000];
        let at = data.len() - 4096;
        data[at..at + 8].copy_from_slice(APE_PREAMBLE);
        let len = data.len() as u64;
        let found = find_ape_tag(&mut Cursor::new(data), len, 4096).unwrap();
        assert_eq!(found, Some(at as u64));
    }

    #[test]
    fn test_find_straddling_chunk_boundary() {
        let mut data = vec![0u8; 10_000];
        let at = data.len() - 4096 - 3;
        data[at..at + 8].copy_from_slice(APE_PREAMBLE);
        let len = data.len() as u64;
        let found = find_ape_tag(&mut Cursor::new(data), len, 4096).unwrap();
        assert_eq!(found, Some(at as u64));
    }

    #[test]
    fn test_find_near_start_and_missing() {
        let mut data = vec![0u8; 9_000];
        data[2..10].copy_from_slice(APE_PREAMBLE);
        let found = find_ape_tag(&mut Cursor::new(data.clone()), 9_000, 4096).unwrap();
        assert_eq!(found, Some(2));

        data[2] = b'X';
        assert_eq!(find_ape_tag(&mut Cursor::new(data), 9_000, 4096).unwrap(), None);
        assert_eq!(find_ape_tag(&mut Cursor::new(Vec::new()), 0, 4096).unwrap(), None);
    }

    #[test]
    fn test_find_prefers_match_nearest_end() {
        let block = ape_block(&[("Title", 0, b"Real")]);
        let mut data = b"see APETAGEX docs".to_vec();
        data.resize(200, 0);
        data.extend_from_slice(&block);
        let len = data.len() as u64;

        let found = find_ape_tag(&mut Cursor::new(data.clone()), len, 4096).unwrap();
        assert_eq!(found, Some(len - APE_HEADER_SIZE as u64));

        let tag = read_ape_tag(&mut Cursor::new(data), len, 4096).unwrap().unwrap();
        assert_eq!(tag.offset, 200);
        assert_eq!(tag.get("title").unwrap().text().as_deref(), Some("Real"));
    }

    #[test]
    fn test_read_follows_footer_back() {
        // A tag bigger than one window: only the footer is in the last chunk
        let big = vec![b'x'; 300];
        let block = ape_block(&[("Lyrics", 0, &big), ("Year", 0, b"1999")]);
        let mut data = vec![0u8; 1000];
        data.extend_from_slice(&block);
        let len = data.len() as u64;

        let tag = read_ape_tag(&mut Cursor::new(data), len, 64).unwrap().unwrap();
        assert_eq!(tag.offset, 1000);
        assert_eq!(tag.len(), 2);
        assert_eq!(tag.get("year").unwrap().text().as_deref(), Some("1999"));
    }

    #[test]
    fn test_read_from_header() {
        let block = ape_block(&[("Album", 0, b"Greatest")]);
        let mut data = vec![0u8; 500];
        data.extend_from_slice(&block);
        data.extend_from_slice(&[0u8; 128]);
        let len = data.len() as u64;

        let tag = read_ape_tag(&mut Cursor::new(data), len, 4096).unwrap().unwrap();
        assert_eq!(tag.offset, 500);
        assert_eq!(tag.get("ALBUM").unwrap().value, b"Greatest");
    }
}
