//! Ordered, editable list of frames
//!
//! Frames keep their on-disk order; frames created by an edit are appended
//! at the tail. Two index vectors hold the positions of live text frames and
//! live comment frames. Deleting a frame tombstones it in place and drops its
//! position from the index, so the master list never shrinks.

use crate::error::TagError;
use crate::frame::Frame;
use crate::frame_type::FrameType;

#[derive(Debug, Clone, Default)]
pub struct FrameCollection {
    frames: Vec<Frame>,
    text_index: Vec<usize>,
    comment_index: Vec<usize>,
}

impl FrameCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_original(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Classify every live frame into the text and comment indices
    pub(crate) fn build_indices(&mut self) {
        self.text_index.clear();
        self.comment_index.clear();

        for (pos, frame) in self.frames.iter().enumerate() {
            if frame.is_tombstoned() {
                continue;
            }
            if frame.is_text() {
                self.text_index.push(pos);
            } else if frame.is_comment() {
                self.comment_index.push(pos);
            }
        }
    }

    /// All frames in write order, tombstones included
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Live text frames in write order
    pub fn text_frames(&self) -> impl Iterator<Item = &Frame> {
        self.text_index.iter().map(|&pos| &self.frames[pos])
    }

    pub fn get(&self, pos: usize) -> Option<&Frame> {
        self.frames.get(pos)
    }

    /// Position of the first live frame of `frame_type`
    pub fn text_position(&self, frame_type: FrameType) -> Option<usize> {
        self.text_index
            .iter()
            .copied()
            .find(|&pos| self.frames[pos].is_frame_type(frame_type))
    }

    /// Number of live frames of `frame_type`
    pub fn text_occurrences(&self, frame_type: FrameType) -> usize {
        self.text_frames()
            .filter(|frame| frame.is_frame_type(frame_type))
            .count()
    }

    pub fn comment_count(&self) -> usize {
        self.comment_index.len()
    }

    /// Position of the `index`-th live comment
    pub fn comment_position(&self, index: usize) -> Option<usize> {
        self.comment_index.get(index).copied()
    }

    /// Replace the first `frame_type` frame, or append a new one
    ///
    /// Returns the position written.
    pub(crate) fn upsert_text(&mut self, frame_type: FrameType, bytes: Vec<u8>) -> usize {
        match self.text_position(frame_type) {
            Some(pos) => {
                self.frames[pos].replace(bytes);
                pos
            }
            None => {
                let pos = self.frames.len();
                self.frames.push(Frame::created(frame_type.id_bytes(), bytes));
                self.text_index.push(pos);
                pos
            }
        }
    }

    /// Replace comment `index`; `index == comment_count()` appends
    pub(crate) fn upsert_comment(&mut self, index: usize, bytes: Vec<u8>) -> Result<usize, TagError> {
        let count = self.comment_count();
        if index > count {
            return Err(TagError::CommentIndexOutOfRange { index, count });
        }

        match self.comment_position(index) {
            Some(pos) => {
                self.frames[pos].replace(bytes);
                Ok(pos)
            }
            None => {
                let pos = self.frames.len();
                self.frames
                    .push(Frame::created(FrameType::Comment.id_bytes(), bytes));
                self.comment_index.push(pos);
                Ok(pos)
            }
        }
    }

    /// Tombstone the first `frame_type` frame; false if there was none
    pub(crate) fn remove_text(&mut self, frame_type: FrameType) -> bool {
        match self.text_position(frame_type) {
            Some(pos) => {
                self.frames[pos].tombstone();
                self.text_index.retain(|&p| p != pos);
                true
            }
            None => false,
        }
    }

    /// Tombstone comment `index`; false if `index == comment_count()`
    pub(crate) fn remove_comment(&mut self, index: usize) -> Result<bool, TagError> {
        let count = self.comment_count();
        if index > count {
            return Err(TagError::CommentIndexOutOfRange { index, count });
        }

        match self.comment_position(index) {
            Some(pos) => {
                self.frames[pos].tombstone();
                self.comment_index.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// True if any frame was replaced, created or deleted
    pub fn is_dirty(&self) -> bool {
        self.frames.iter().any(Frame::is_dirty)
    }

    /// Number of frames a rewrite would emit
    pub fn live_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_tombstoned()).count()
    }

    /// Bytes of frame data a rewrite would emit, padding excluded
    pub fn section_size(&self) -> usize {
        self.frames.iter().map(Frame::write_len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
        out
    }

    // TIT2 "Abc" | COMM | TPE1 "Me"
    fn sample() -> (Vec<u8>, FrameCollection) {
        let mut section = frame_bytes(b"TIT2", b"\x00Abc");
        let title_end = section.len();
        section.extend(frame_bytes(b"COMM", b"\x00eng\x00Hi"));
        let comment_end = section.len();
        section.extend(frame_bytes(b"TPE1", b"\x00Me"));

        let mut frames = FrameCollection::new();
        frames.push_original(Frame::original(*b"TIT2", 0..title_end));
        frames.push_original(Frame::original(*b"COMM", title_end..comment_end));
        frames.push_original(Frame::original(*b"TPE1", comment_end..section.len()));
        frames.build_indices();
        (section, frames)
    }

    #[test]
    fn test_indices_partition_frames() {
        let (section, frames) = sample();
        assert_eq!(frames.text_position(FrameType::Title), Some(0));
        assert_eq!(frames.text_position(FrameType::Artist), Some(2));
        assert_eq!(frames.text_position(FrameType::Album), None);
        assert_eq!(frames.comment_count(), 1);
        assert_eq!(frames.comment_position(0), Some(1));
        assert!(!frames.is_dirty());
        assert_eq!(frames.section_size(), section.len());
    }

    #[test]
    fn test_upsert_replaces_in_place_or_appends() {
        let (_, mut frames) = sample();
        let pos = frames.upsert_text(FrameType::Title, frame_bytes(b"TIT2", b"\x00X"));
        assert_eq!(pos, 0);
        let pos = frames.upsert_text(FrameType::Album, frame_bytes(b"TALB", b"\x00Y"));
        assert_eq!(pos, 3);
        assert_eq!(frames.live_count(), 4);
        assert!(frames.is_dirty());

        let ids: Vec<&str> = frames.iter().map(|f| f.id_str()).collect();
        assert_eq!(ids, ["TIT2", "COMM", "TPE1", "TALB"]);
    }

    #[test]
    fn test_remove_keeps_master_order() {
        let (section, mut frames) = sample();
        assert!(frames.remove_text(FrameType::Title));
        assert!(!frames.remove_text(FrameType::Title));
        assert_eq!(frames.text_position(FrameType::Title), None);
        assert_eq!(frames.iter().count(), 3);
        assert_eq!(frames.live_count(), 2);
        assert_eq!(frames.section_size(), section.len() - 14);
    }

    #[test]
    fn test_comment_contract() {
        let (_, mut frames) = sample();
        assert_eq!(
            frames.upsert_comment(5, frame_bytes(b"COMM", b"\x00eng\x00z")),
            Err(TagError::CommentIndexOutOfRange { index: 5, count: 1 })
        );
        assert_eq!(frames.upsert_comment(1, frame_bytes(b"COMM", b"\x00eng\x00z")), Ok(3));
        assert_eq!(frames.comment_count(), 2);

        assert_eq!(frames.remove_comment(0), Ok(true));
        assert_eq!(frames.comment_count(), 1);
        assert_eq!(frames.comment_position(0), Some(3));
        assert_eq!(frames.remove_comment(1), Ok(false));
        assert!(frames.remove_comment(2).is_err());
    }

    #[test]
    fn test_create_then_delete_leaves_count() {
        let (_, mut frames) = sample();
        let before = frames.live_count();
        frames.upsert_text(FrameType::Composer, frame_bytes(b"TCOM", b"\x00C"));
        frames.remove_text(FrameType::Composer);
        assert_eq!(frames.live_count(), before);
        assert_eq!(frames.text_position(FrameType::Composer), None);
    }
}
