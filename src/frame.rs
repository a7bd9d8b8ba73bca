//! A single ID3v2 frame and where its bytes live

use std::ops::Range;

use crate::frame_type::{is_comment_frame_id, is_text_frame_id, FrameType};
use crate::header::{FrameHeader, FRAME_ID_LEN, HEADER_SIZE};
use crate::synchsafe::SizeCodec;

/// Where a frame's bytes come from when the tag is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameData {
    /// Unchanged; the bytes are the frame's window into the loaded tag section
    Original,
    /// Deleted; contributes nothing to a rewrite
    Tombstoned,
    /// Edited or newly created; header and payload, written verbatim
    Replacement(Vec<u8>),
}

/// One frame of the collection
///
/// The ID never changes once the frame exists. Frames read from disk keep the
/// byte range they were loaded from, even after being replaced or deleted.
#[derive(Debug, Clone)]
pub struct Frame {
    id: [u8; FRAME_ID_LEN],
    source: Option<Range<usize>>,
    data: FrameData,
}

impl Frame {
    /// A frame as found in the tag section buffer
    pub(crate) fn original(id: [u8; FRAME_ID_LEN], source: Range<usize>) -> Self {
        Self {
            id,
            source: Some(source),
            data: FrameData::Original,
        }
    }

    /// A frame that did not exist on disk
    pub(crate) fn created(id: [u8; FRAME_ID_LEN], bytes: Vec<u8>) -> Self {
        Self {
            id,
            source: None,
            data: FrameData::Replacement(bytes),
        }
    }

    pub fn id(&self) -> &[u8; FRAME_ID_LEN] {
        &self.id
    }

    pub fn id_str(&self) -> &str {
        // Parsing only admits [0-9A-Z] IDs
        std::str::from_utf8(&self.id).unwrap_or("????")
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    pub fn is_text(&self) -> bool {
        is_text_frame_id(&self.id)
    }

    pub fn is_comment(&self) -> bool {
        is_comment_frame_id(&self.id)
    }

    pub fn is_frame_type(&self, frame_type: FrameType) -> bool {
        self.id == frame_type.id_bytes()
    }

    pub fn is_tombstoned(&self) -> bool {
        self.data == FrameData::Tombstoned
    }

    /// True if the frame differs from what is on disk
    pub fn is_dirty(&self) -> bool {
        !matches!(self.data, FrameData::Original)
    }

    /// Full frame bytes, header included
    ///
    /// Tombstoned frames still answer with their original bytes, if any.
    pub fn bytes<'a>(&'a self, section: &'a [u8]) -> Option<&'a [u8]> {
        match &self.data {
            FrameData::Replacement(bytes) => Some(bytes),
            FrameData::Original | FrameData::Tombstoned => {
                self.source.clone().and_then(|range| section.get(range))
            }
        }
    }

    /// Payload bytes, following the frame header
    pub fn payload<'a>(&'a self, section: &'a [u8]) -> Option<&'a [u8]> {
        self.bytes(section).and_then(|b| b.get(HEADER_SIZE..))
    }

    /// Decoded frame header
    pub fn header(&self, section: &[u8], codec: SizeCodec) -> Option<FrameHeader> {
        self.bytes(section)
            .and_then(|b| FrameHeader::parse(b, codec))
    }

    /// Bytes this frame contributes to a rewrite
    pub fn write_len(&self) -> usize {
        match &self.data {
            FrameData::Original => self.source.as_ref().map_or(0, |r| r.len()),
            FrameData::Tombstoned => 0,
            FrameData::Replacement(bytes) => bytes.len(),
        }
    }

    pub(crate) fn replace(&mut self, bytes: Vec<u8>) {
        debug_assert_eq!(&bytes[..FRAME_ID_LEN], &self.id);
        self.data = FrameData::Replacement(bytes);
    }

    pub(crate) fn tombstone(&mut self) {
        self.data = FrameData::Tombstoned;
    }
}
