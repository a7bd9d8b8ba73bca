//! Text and comment frame payloads
//!
//! ```text
//! text frame:    enc | string (no terminator)
//! comment frame: enc | lang (3) | description | NUL | text
//! ```
//!
//! For UTF-16 the description and the text each carry their own byte order
//! mark and the terminator is two NUL bytes. Writes always produce encoding 0
//! with the raw bytes of the string.

use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1252};
use serde::Serialize;

use crate::error::TagError;
use crate::header::{FrameHeader, FRAME_ID_LEN, HEADER_SIZE};
use crate::synchsafe::SizeCodec;

/// Language code stamped on every comment this crate writes
pub const COMMENT_LANGUAGE: &[u8; 3] = b"eng";

const BOM_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_BE: [u8; 2] = [0xFE, 0xFF];

/// Text encoding selector, the first payload byte of text and comment frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextEncoding {
    /// Single byte
    Ansi = 0,
    /// UTF-16 with a byte order mark
    Utf16 = 1,
    /// UTF-16 big endian, no byte order mark
    Utf16Be = 2,
    /// ID3v2.4 only
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_u8(byte: u8) -> Result<Self, TagError> {
        match byte {
            0 => Ok(Self::Ansi),
            1 => Ok(Self::Utf16),
            2 => Ok(Self::Utf16Be),
            3 => Ok(Self::Utf8),
            other => Err(TagError::UnsupportedEncoding(other)),
        }
    }
}

/// A decoded comment frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub language: String,
    pub description: String,
    pub text: String,
}

/// Decode a text frame payload (everything after the frame header)
pub fn decode_text_payload(payload: &[u8]) -> Result<String, TagError> {
    let (&encoding, text) = payload
        .split_first()
        .ok_or_else(|| TagError::MalformedFrame("text".to_string()))?;

    let value = match TextEncoding::from_u8(encoding)? {
        TextEncoding::Ansi | TextEncoding::Utf8 => decode_narrow(text),
        TextEncoding::Utf16 => decode_utf16(text, true),
        TextEncoding::Utf16Be => return Err(TagError::UnsupportedEncoding(encoding)),
    };

    Ok(trim_nuls(value))
}

/// Decode a comment frame payload (everything after the frame header)
pub fn decode_comment_payload(payload: &[u8]) -> Result<Comment, TagError> {
    if payload.len() < 1 + COMMENT_LANGUAGE.len() {
        return Err(TagError::MalformedFrame("COMM".to_string()));
    }

    let encoding = TextEncoding::from_u8(payload[0])?;
    let language = trim_nuls(decode_narrow(&payload[1..4]));
    let body = &payload[4..];

    let (description, text) = match encoding {
        TextEncoding::Ansi | TextEncoding::Utf8 => {
            let (description, text) = match body.iter().position(|&b| b == 0) {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, &[][..]),
            };
            (decode_narrow(description), decode_narrow(text))
        }
        TextEncoding::Utf16 => {
            let end = body
                .chunks_exact(2)
                .position(|unit| unit == [0, 0])
                .map(|unit| unit * 2);
            let (description, text) = match end {
                Some(end) => (&body[..end], &body[end + 2..]),
                None => (body, &[][..]),
            };
            // The text repeats the BOM; without one, follow the description
            let little_endian = !description.starts_with(&BOM_BE);
            (
                decode_utf16(description, true),
                decode_utf16(text, little_endian),
            )
        }
        TextEncoding::Utf16Be => return Err(TagError::UnsupportedEncoding(payload[0])),
    };

    Ok(Comment {
        language,
        description: trim_nuls(description),
        text: trim_nuls(text),
    })
}

/// Total bytes of a text frame written for `text`, header included
pub fn text_frame_len(text: &str) -> usize {
    HEADER_SIZE + 1 + text.len()
}

/// Total bytes of a comment frame written for `text`, header included
pub fn comment_frame_len(text: &str) -> usize {
    HEADER_SIZE + 1 + COMMENT_LANGUAGE.len() + 1 + text.len()
}

/// Build a complete single-byte text frame
pub fn encode_text_frame(
    id: &[u8; FRAME_ID_LEN],
    text: &str,
    codec: SizeCodec,
) -> Result<Vec<u8>, TagError> {
    let len = text_frame_len(text);
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&FrameHeader::write_bytes(id, payload_size(len)?, codec)?);
    out.push(TextEncoding::Ansi as u8);
    out.extend_from_slice(text.as_bytes());

    debug_assert_eq!(out.len(), len);
    Ok(out)
}

/// Build a complete single-byte comment frame with an empty description
pub fn encode_comment_frame(text: &str, codec: SizeCodec) -> Result<Vec<u8>, TagError> {
    let len = comment_frame_len(text);
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&FrameHeader::write_bytes(b"COMM", payload_size(len)?, codec)?);
    out.push(TextEncoding::Ansi as u8);
    out.extend_from_slice(COMMENT_LANGUAGE);
    out.push(0);
    out.extend_from_slice(text.as_bytes());

    debug_assert_eq!(out.len(), len);
    Ok(out)
}

fn payload_size(frame_len: usize) -> Result<u32, TagError> {
    u32::try_from(frame_len - HEADER_SIZE).map_err(|_| TagError::SizeOverflow(u32::MAX))
}

// Strings written by this crate are UTF-8 bytes behind an ANSI selector, so
// valid UTF-8 is taken as-is and anything else is read as Windows-1252.
fn decode_narrow(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], default_little_endian: bool) -> String {
    let (little_endian, body) = if bytes.starts_with(&BOM_LE) {
        (true, &bytes[2..])
    } else if bytes.starts_with(&BOM_BE) {
        (false, &bytes[2..])
    } else {
        (default_little_endian, bytes)
    };

    // An odd trailing byte is not a character
    let body = &body[..body.len() & !1];
    let decoder = if little_endian { UTF_16LE } else { UTF_16BE };
    decoder.decode_without_bom_handling(body).0.into_owned()
}

// Some encoders count a terminator into the frame size
fn trim_nuls(mut value: String) -> String {
    let end = value.trim_end_matches('\0').len();
    value.truncate(end);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        let mut out = BOM_LE.to_vec();
        for unit in s.encode_utf16() {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_ansi_text() {
        assert_eq!(decode_text_payload(b"\x00Test Title").unwrap(), "Test Title");
        assert_eq!(decode_text_payload(b"\x03Test Title").unwrap(), "Test Title");
        // Buggy encoders count trailing NULs
        assert_eq!(decode_text_payload(b"\x00Abc\x00\x00").unwrap(), "Abc");
        assert_eq!(decode_text_payload(b"\x00").unwrap(), "");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Café" in Windows-1252
        assert_eq!(decode_text_payload(b"\x00Caf\xE9").unwrap(), "Café");
        // Already UTF-8
        assert_eq!(decode_text_payload("\x00Café".as_bytes()).unwrap(), "Café");
    }

    #[test]
    fn test_decode_utf16_text() {
        let mut payload = vec![1u8];
        payload.extend(utf16le("Ünïcödé"));
        assert_eq!(decode_text_payload(&payload).unwrap(), "Ünïcödé");

        payload.extend_from_slice(&[0, 0]);
        assert_eq!(decode_text_payload(&payload).unwrap(), "Ünïcödé");

        let payload = [1u8, 0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_text_payload(&payload).unwrap(), "Hi");
    }

    #[test]
    fn test_utf16be_is_unsupported() {
        assert_eq!(
            decode_text_payload(&[2, 0x00, b'A']),
            Err(TagError::UnsupportedEncoding(2))
        );
        assert_eq!(
            decode_text_payload(&[9, b'A']),
            Err(TagError::UnsupportedEncoding(9))
        );
        assert!(decode_text_payload(&[]).is_err());
    }

    #[test]
    fn test_decode_ansi_comment() {
        let comment = decode_comment_payload(b"\x00engDesc\x00Hello there").unwrap();
        assert_eq!(comment.language, "eng");
        assert_eq!(comment.description, "Desc");
        assert_eq!(comment.text, "Hello there");

        let comment = decode_comment_payload(b"\x00eng\x00Only text\x00").unwrap();
        assert_eq!(comment.description, "");
        assert_eq!(comment.text, "Only text");

        assert!(decode_comment_payload(b"\x00en").is_err());
    }

    #[test]
    fn test_decode_utf16_comment() {
        let mut payload = vec![1u8];
        payload.extend_from_slice(b"deu");
        payload.extend(utf16le("Beschreibung"));
        payload.extend_from_slice(&[0, 0]);
        payload.extend(utf16le("Grüße"));
        let comment = decode_comment_payload(&payload).unwrap();
        assert_eq!(comment.language, "deu");
        assert_eq!(comment.description, "Beschreibung");
        assert_eq!(comment.text, "Grüße");

        // Empty description: BOM, terminator, BOM, text
        let mut payload = vec![1u8];
        payload.extend_from_slice(b"eng");
        payload.extend(utf16le(""));
        payload.extend_from_slice(&[0, 0]);
        payload.extend(utf16le("x"));
        assert_eq!(decode_comment_payload(&payload).unwrap().text, "x");
    }

    #[test]
    fn test_encode_text_frame() {
        let frame = encode_text_frame(b"TPE1", "New Artist", SizeCodec::SyncSafe).unwrap();
        assert_eq!(frame.len(), text_frame_len("New Artist"));
        assert_eq!(&frame[..4], b"TPE1");
        assert_eq!(SizeCodec::SyncSafe.decode(&frame[4..8]), 11);
        assert_eq!(&frame[8..10], &[0, 0]);
        assert_eq!(frame[10], 0);
        assert_eq!(decode_text_payload(&frame[10..]).unwrap(), "New Artist");
    }

    #[test]
    fn test_encode_comment_frame() {
        let frame = encode_comment_frame("Nice", SizeCodec::Plain).unwrap();
        assert_eq!(frame.len(), comment_frame_len("Nice"));
        assert_eq!(&frame[..4], b"COMM");
        assert_eq!(SizeCodec::Plain.decode(&frame[4..8]), 9);
        assert_eq!(&frame[10..], b"\x00eng\x00Nice");

        let comment = decode_comment_payload(&frame[10..]).unwrap();
        assert_eq!(comment.text, "Nice");
        assert_eq!(comment.description, "");
    }
}
