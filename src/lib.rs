//! # mp3tags
//!
//! Read and edit ID3v2 tags of MP3 files, and read their APEv2 tags.
//!
//! This library edits ID3v2.3 and ID3v2.4 text and comment frames in place,
//! leaving every other frame and the audio data byte-for-byte untouched.
//!
//! ## Features
//!
//! - **In place**: A tag that still fits its old space is rewritten without
//!   moving the audio data
//! - **Version aware**: Frame sizes follow the plain (v2.3) or sync-safe
//!   (v2.4) encoding of the file
//! - **Tolerant reads**: ANSI, UTF-8 and UTF-16 text, trailing NULs and
//!   duplicate frames are accepted
//!
//! ## Example
//!
//! ```no_run
//! use mp3tags::{FrameType, TagFile};
//!
//! let mut tags = TagFile::load("song.mp3").unwrap();
//! println!("{}", tags.get_text(FrameType::Title).unwrap());
//!
//! tags.set_text(FrameType::Artist, "New Artist").unwrap();
//! tags.set_comment(tags.get_comment_count(), "Added").unwrap();
//! tags.write().unwrap();
//! ```
//!
//! ## Technical Details
//!
//! Writes always use the single-byte text encoding. Extended headers,
//! compression, encryption and ID3v1 are not supported; APEv2 is read only.

pub mod ape;
pub mod collection;
pub mod config;
pub mod error;
pub mod frame;
pub mod frame_type;
pub mod genre;
pub mod header;
pub mod parse;
pub mod synchsafe;
pub mod tag_file;
pub mod text;
pub mod write;

pub use ape::{ApeItem, ApeTag};
pub use config::TagOptions;
pub use error::TagError;
pub use frame_type::FrameType;
pub use genre::{genre_name, MAX_GENRE};
pub use header::{FileHeader, FrameHeader};
pub use synchsafe::SizeCodec;
pub use tag_file::TagFile;
pub use text::Comment;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        assert_eq!(FrameType::Title.id(), "TIT2");
        assert_eq!(genre_name(MAX_GENRE - 1), Some("Euro-House"));
        assert_eq!(TagOptions::default().padding, TagOptions::DEFAULT_PADDING);
    }
}
