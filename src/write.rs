//! Rewrite the tag section of a file in place
//!
//! ```text
//! before: header | old frames | old padding | audio ...
//! after:  header | live frames | padding     | audio ...
//! ```
//!
//! When the live frames fit in the old frames plus padding, the leftover
//! space becomes the new padding and the audio is not touched. Otherwise
//! the tag grows by the configured padding and everything from the old
//! audio offset to EOF (audio, APEv2, ID3v1) is read and written back after it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::collection::FrameCollection;
use crate::config::TagOptions;
use crate::error::TagError;
use crate::header::FileHeader;

/// Layout of a rewrite, decided before the file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
    /// Bytes of live frames
    pub frames_size: usize,
    /// Zero bytes following the frames
    pub padding: usize,
    /// True if the audio data has to move
    pub relocate_audio: bool,
}

impl WritePlan {
    /// Decide padding for `frames_size` bytes of frames replacing a section
    /// of `old_size` bytes
    pub fn new(frames_size: usize, old_size: usize, options: &TagOptions) -> Self {
        if frames_size <= old_size {
            Self {
                frames_size,
                padding: old_size - frames_size,
                relocate_audio: false,
            }
        } else {
            Self {
                frames_size,
                padding: options.padding as usize,
                relocate_audio: true,
            }
        }
    }

    /// New tag section size, as stored in the file header
    pub fn section_size(&self) -> Result<u32, TagError> {
        let total = self.frames_size + self.padding;
        u32::try_from(total).map_err(|_| TagError::SizeOverflow(u32::MAX))
    }
}

/// Write `frames` to `path` behind an updated copy of `header`
///
/// Nothing is written unless the new tag can be fully assembled and, on the
/// growth path, the trailing bytes have been read back into memory.
pub fn rewrite(
    path: &Path,
    header: &FileHeader,
    frames: &FrameCollection,
    section: &[u8],
    options: &TagOptions,
) -> Result<WritePlan> {
    let plan = WritePlan::new(frames.section_size(), section.len(), options);
    let tag = assemble_tag(header, frames, section, &plan)?;

    let mut file = open_for_write(path, options.open_retries)
        .with_context(|| format!("Failed to open for writing: {}", path.display()))?;

    let mut trailing = Vec::new();
    if plan.relocate_audio {
        file.seek(SeekFrom::Start(header.audio_offset() as u64))?;
        file.read_to_end(&mut trailing)
            .with_context(|| format!("Failed to read audio data: {}", path.display()))?;
        log::debug!(
            "Tag grows to {} bytes; moving {} bytes of audio",
            tag.len(),
            trailing.len()
        );
    }

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&tag)
        .with_context(|| format!("Failed to write tag: {}", path.display()))?;
    if plan.relocate_audio {
        file.write_all(&trailing)
            .with_context(|| format!("Failed to write audio data: {}", path.display()))?;
    }
    file.flush()?;

    Ok(plan)
}

// Header, live frames in collection order, zero padding
fn assemble_tag(
    header: &FileHeader,
    frames: &FrameCollection,
    section: &[u8],
    plan: &WritePlan,
) -> Result<Vec<u8>> {
    let header_bytes = header.to_bytes(plan.section_size()?)?;

    let mut tag = Vec::with_capacity(header_bytes.len() + plan.frames_size + plan.padding);
    tag.extend_from_slice(&header_bytes);

    for frame in frames.iter().filter(|f| !f.is_tombstoned()) {
        let bytes = frame
            .bytes(section)
            .ok_or_else(|| TagError::MalformedFrame(frame.id_str().to_string()))?;
        tag.extend_from_slice(bytes);
    }

    tag.resize(tag.len() + plan.padding, 0);
    debug_assert_eq!(tag.len(), header_bytes.len() + plan.frames_size + plan.padding);
    Ok(tag)
}

// Scanners and indexers may hold the file briefly; try again before giving up
fn open_for_write(path: &Path, retries: u8) -> io::Result<File> {
    let mut attempt = 0;
    loop {
        match write_options().open(path) {
            Ok(file) => return Ok(file),
            Err(err) if attempt < retries => {
                log::warn!("Failed to open {} for writing: {}; retrying", path.display(), err);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn write_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true).write(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        // FILE_SHARE_READ | FILE_SHARE_WRITE
        options.share_mode(0x1 | 0x2);
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_reuses_old_space() {
        let options = TagOptions::new();
        let plan = WritePlan::new(100, 1000, &options);
        assert_eq!(plan.padding, 900);
        assert!(!plan.relocate_audio);
        assert_eq!(plan.section_size().unwrap(), 1000);

        let plan = WritePlan::new(1000, 1000, &options);
        assert_eq!(plan.padding, 0);
        assert!(!plan.relocate_audio);
    }

    #[test]
    fn test_plan_grows_with_default_padding() {
        let plan = WritePlan::new(1001, 1000, &TagOptions::new());
        assert_eq!(plan.padding, 2048);
        assert!(plan.relocate_audio);
        assert_eq!(plan.section_size().unwrap(), 3049);

        let plan = WritePlan::new(1001, 1000, &TagOptions::new().padding(16));
        assert_eq!(plan.section_size().unwrap(), 1017);
    }

    #[test]
    fn test_oversized_tag_is_rejected_before_io() {
        let header = FileHeader::parse(b"ID3\x04\x00\x00\x00\x00\x00\x00");
        let plan = WritePlan {
            frames_size: 0,
            padding: 1 << 28,
            relocate_audio: true,
        };
        let err = assemble_tag(&header, &FrameCollection::new(), &[], &plan).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagError>(),
            Some(TagError::SizeOverflow(_))
        ));
    }

    #[test]
    fn test_open_missing_file_fails_after_retries() {
        let path = std::env::temp_dir().join("mp3tags_write_missing_dir").join("none.mp3");
        assert!(open_for_write(&path, 2).is_err());
    }
}
