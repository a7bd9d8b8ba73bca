//! Walk a tag section buffer into a frame collection

use crate::collection::FrameCollection;
use crate::frame::Frame;
use crate::frame_type::FrameType;
use crate::header::{is_padding, FrameHeader, HEADER_SIZE};
use crate::synchsafe::SizeCodec;

/// Split `section` (the bytes following the file header) into frames
///
/// Parsing stops at the first byte that looks like padding, at a garbled
/// frame ID, or when a frame would run past the end of the section. None of
/// these are errors; whatever follows is treated as padding.
pub fn parse_frames(section: &[u8], codec: SizeCodec) -> FrameCollection {
    let mut frames = FrameCollection::new();
    let mut offset = 0;

    while section.len() - offset >= HEADER_SIZE {
        let raw = &section[offset..];
        if is_padding(raw) {
            break;
        }

        let Some(header) = FrameHeader::parse(raw, codec) else {
            break;
        };

        let end = offset + header.total_size();
        if end > section.len() {
            log::warn!(
                "Frame {} at offset {} overruns the tag section ({} > {})",
                String::from_utf8_lossy(&header.id),
                offset,
                end,
                section.len()
            );
            break;
        }

        frames.push_original(Frame::original(header.id, offset..end));
        offset = end;
    }

    frames.build_indices();
    log::debug!(
        "Parsed {} frames, {} bytes of padding",
        frames.live_count(),
        section.len() - offset
    );

    warn_duplicates(&frames);
    frames
}

// Text frames may appear at most once; the first one wins on lookup
fn warn_duplicates(frames: &FrameCollection) {
    for frame_type in FrameType::text_types() {
        let count = frames.text_occurrences(frame_type);
        if count > 1 {
            log::warn!("Duplicate {} frames ({}) found", frame_type.id(), count);
        }
    }
}
