//! The editable tag state of one MP3 file

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};

use crate::ape::{read_ape_tag, ApeTag};
use crate::collection::FrameCollection;
use crate::config::TagOptions;
use crate::error::TagError;
use crate::frame_type::FrameType;
use crate::header::{FileHeader, HEADER_SIZE};
use crate::parse::parse_frames;
use crate::synchsafe::SizeCodec;
use crate::text::{
    decode_comment_payload, decode_text_payload, encode_comment_frame, encode_text_frame, Comment,
};
use crate::write::rewrite;

/// ID3v2 tag (and optional APEv2 tag) of an MP3 file
///
/// Edits only change the in-memory frame list until [`TagFile::write`] is
/// called, which rewrites the tag section and reloads the file from disk.
#[derive(Debug, Clone)]
pub struct TagFile {
    path: PathBuf,
    options: TagOptions,
    header: FileHeader,
    codec: SizeCodec,
    /// The tag section as loaded, frames and padding
    section: Vec<u8>,
    frames: FrameCollection,
    ape: Option<ApeTag>,
}

impl TagFile {
    /// Load the tags of `path` with default options
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, TagOptions::default())
    }

    /// Load the tags of `path`
    ///
    /// Fails if the file cannot be read or does not start with an ID3v2.3+
    /// header this crate can handle. A missing or broken APEv2 tag is not an
    /// error.
    pub fn load_with_options(path: impl AsRef<Path>, options: TagOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let file_len = file
            .metadata()
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?
            .len();

        let mut raw = [0u8; HEADER_SIZE];
        if let Err(err) = file.read_exact(&mut raw) {
            log::warn!("Failed to read ID3 header from {}: {}", path.display(), err);
            return Err(err).with_context(|| format!("Failed to read: {}", path.display()));
        }

        let header = FileHeader::parse(&raw);
        if let Err(err) = header.validate() {
            log::warn!("{}: {}", path.display(), err);
            return Err(err).with_context(|| format!("Unsupported file: {}", path.display()));
        }

        let mut section = vec![0u8; header.size as usize];
        file.read_exact(&mut section)
            .with_context(|| format!("Failed to read tag section: {}", path.display()))?;

        let ape = if options.read_ape {
            read_ape_tag(&mut file, file_len, options.ape_search_chunk).unwrap_or_else(|err| {
                log::warn!("Ignoring APE tag in {}: {:#}", path.display(), err);
                None
            })
        } else {
            None
        };

        // Close the file on another thread while the frames are parsed
        let codec = header.size_codec();
        let frames = thread::scope(|s| {
            s.spawn(move || drop(file));
            parse_frames(&section, codec)
        });

        Ok(Self {
            path: path.to_path_buf(),
            options,
            header,
            codec,
            section,
            frames,
            ape,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> TagOptions {
        self.options
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.header
    }

    /// "2.3.0" style version string
    pub fn version(&self) -> String {
        self.header.version()
    }

    /// Offset of the first audio byte
    pub fn audio_buffer_offset(&self) -> u32 {
        self.header.audio_offset()
    }

    /// Frames a rewrite would emit, of any type
    pub fn frame_count(&self) -> usize {
        self.frames.live_count()
    }

    pub fn frames(&self) -> &FrameCollection {
        &self.frames
    }

    pub fn ape_tag(&self) -> Option<&ApeTag> {
        self.ape.as_ref()
    }

    /// True if there are edits that [`TagFile::write`] would persist
    pub fn is_dirty(&self) -> bool {
        self.frames.is_dirty()
    }

    /// Value of a text frame; empty if the file has none
    pub fn get_text(&self, frame_type: FrameType) -> Result<String> {
        ensure_text(frame_type)?;
        let Some(pos) = self.frames.text_position(frame_type) else {
            return Ok(String::new());
        };

        let payload = self.payload(pos)?;
        let text = decode_text_payload(payload).with_context(|| {
            format!("Failed to decode {} in {}", frame_type.id(), self.path.display())
        })?;
        Ok(text)
    }

    /// Set a text frame; an empty value deletes it
    pub fn set_text(&mut self, frame_type: FrameType, value: &str) -> Result<()> {
        ensure_text(frame_type)?;
        if value.is_empty() {
            self.delete_text(frame_type)?;
            return Ok(());
        }

        if let Some(pos) = self.frames.text_position(frame_type) {
            self.warn_read_only(pos);
        }
        let bytes = encode_text_frame(&frame_type.id_bytes(), value, self.codec)?;
        self.frames.upsert_text(frame_type, bytes);
        Ok(())
    }

    /// Delete a text frame; false if the file had none
    pub fn delete_text(&mut self, frame_type: FrameType) -> Result<bool> {
        ensure_text(frame_type)?;
        if let Some(pos) = self.frames.text_position(frame_type) {
            self.warn_read_only(pos);
        }
        Ok(self.frames.remove_text(frame_type))
    }

    pub fn get_comment_count(&self) -> usize {
        self.frames.comment_count()
    }

    /// Text of comment `index`; empty at `index == get_comment_count()`
    pub fn get_comment(&self, index: usize) -> Result<String> {
        Ok(self.comment(index)?.text)
    }

    /// Comment `index` with its language and description
    pub fn comment(&self, index: usize) -> Result<Comment> {
        let count = self.frames.comment_count();
        if index > count {
            return Err(TagError::CommentIndexOutOfRange { index, count }.into());
        }
        let Some(pos) = self.frames.comment_position(index) else {
            return Ok(Comment::default());
        };

        let payload = self.payload(pos)?;
        let comment = decode_comment_payload(payload).with_context(|| {
            format!("Failed to decode comment {} in {}", index, self.path.display())
        })?;
        Ok(comment)
    }

    /// Set comment `index`; `index == get_comment_count()` adds one and an
    /// empty value deletes it
    pub fn set_comment(&mut self, index: usize, value: &str) -> Result<()> {
        if value.is_empty() {
            self.delete_comment(index)?;
            return Ok(());
        }

        if let Some(pos) = self.frames.comment_position(index) {
            self.warn_read_only(pos);
        }
        let bytes = encode_comment_frame(value, self.codec)?;
        self.frames.upsert_comment(index, bytes)?;
        Ok(())
    }

    /// Delete comment `index`; later comments move down by one
    pub fn delete_comment(&mut self, index: usize) -> Result<bool> {
        if let Some(pos) = self.frames.comment_position(index) {
            self.warn_read_only(pos);
        }
        Ok(self.frames.remove_comment(index)?)
    }

    /// Persist pending edits and reload the file
    ///
    /// Returns `Ok(false)` without touching the file if nothing changed. On
    /// error the in-memory state is left as it was.
    pub fn write(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }

        let plan = rewrite(&self.path, &self.header, &self.frames, &self.section, &self.options)?;
        log::debug!(
            "Wrote {} frames ({} bytes, {} padding) to {}",
            self.frames.live_count(),
            plan.frames_size,
            plan.padding,
            self.path.display()
        );

        *self = Self::load_with_options(&self.path, self.options)?;
        Ok(true)
    }

    fn payload(&self, pos: usize) -> Result<&[u8]> {
        let payload = self
            .frames
            .get(pos)
            .and_then(|frame| frame.payload(&self.section));
        payload.ok_or_else(|| TagError::MalformedFrame(format!("frame #{}", pos)).into())
    }

    fn warn_read_only(&self, pos: usize) {
        let Some(frame) = self.frames.get(pos) else {
            return;
        };
        if frame
            .header(&self.section, self.codec)
            .is_some_and(|h| h.is_read_only())
        {
            log::warn!(
                "Editing read-only frame {} in {}",
                frame.id_str(),
                self.path.display()
            );
        }
    }
}

fn ensure_text(frame_type: FrameType) -> Result<(), TagError> {
    if frame_type.is_text() {
        Ok(())
    } else {
        Err(TagError::NotATextFrame(frame_type.id()))
    }
}

impl fmt::Display for TagFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        writeln!(f, "Path: {}", self.path.display())?;
        writeln!(f, "Id3: {}", String::from_utf8_lossy(&h.magic))?;
        writeln!(f, "Version: {}.{}", h.major_version, h.minor_version)?;
        writeln!(f, "Flags: 0x{:X}", h.flags)?;
        writeln!(f, "Size: {} ({:X})", h.size, h.size)?;
        writeln!(f, "Audio offset: {}", self.audio_buffer_offset())?;
        for frame in self.frames.text_frames() {
            writeln!(f, "FrameID: {}", frame.id_str())?;
        }
        Ok(())
    }
}
