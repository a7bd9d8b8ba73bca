//! The catalog of frames this crate reads and edits

use std::fmt;

use serde::Serialize;

/// A recognized ID3v2 frame
///
/// All variants except [`FrameType::Comment`] are text information frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameType {
    Title,
    /// Rare, e.g. "Op. 6"
    Subtitle,
    /// May be numeric, may have parens, e.g. "(21)"
    Genre,
    Artist,
    Album,
    Composer,
    /// Often called "Album Artist"
    Orchestra,
    OrigArtist,
    /// YYYY
    Year,
    OrigYear,
    /// e.g. "5" or "5/12"
    TrackNum,
    BeatsPerMinute,
    /// Milliseconds; often wrong for VBR files
    Duration,
    /// e.g. "C#m"
    Key,
    Conductor,
    /// ISO-639-2 codes
    Language,
    /// v2.4 only
    Mood,
    /// Multiple allowed
    Comment,
}

impl FrameType {
    /// Every catalog entry, text frames first
    pub const ALL: [FrameType; 18] = [
        FrameType::Title,
        FrameType::Subtitle,
        FrameType::Genre,
        FrameType::Artist,
        FrameType::Album,
        FrameType::Composer,
        FrameType::Orchestra,
        FrameType::OrigArtist,
        FrameType::Year,
        FrameType::OrigYear,
        FrameType::TrackNum,
        FrameType::BeatsPerMinute,
        FrameType::Duration,
        FrameType::Key,
        FrameType::Conductor,
        FrameType::Language,
        FrameType::Mood,
        FrameType::Comment,
    ];

    /// The 4-character frame ID
    pub const fn id(self) -> &'static str {
        match self {
            FrameType::Title => "TIT2",
            FrameType::Subtitle => "TIT3",
            FrameType::Genre => "TCON",
            FrameType::Artist => "TPE1",
            FrameType::Album => "TALB",
            FrameType::Composer => "TCOM",
            FrameType::Orchestra => "TPE2",
            FrameType::OrigArtist => "TOPE",
            FrameType::Year => "TYER",
            FrameType::OrigYear => "TORY",
            FrameType::TrackNum => "TRCK",
            FrameType::BeatsPerMinute => "TBPM",
            FrameType::Duration => "TLEN",
            FrameType::Key => "TKEY",
            FrameType::Conductor => "TPE3",
            FrameType::Language => "TLAN",
            FrameType::Mood => "TMOO",
            FrameType::Comment => "COMM",
        }
    }

    pub(crate) fn id_bytes(self) -> [u8; 4] {
        let id = self.id().as_bytes();
        [id[0], id[1], id[2], id[3]]
    }

    /// Look up a catalog entry by frame ID
    pub fn from_id(id: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id().as_bytes() == id)
    }

    /// Look up a catalog entry by its name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// All ID3 text frames start with 'T'
    pub const fn is_text(self) -> bool {
        self.id().as_bytes()[0] == b'T'
    }

    pub const fn name(self) -> &'static str {
        match self {
            FrameType::Title => "Title",
            FrameType::Subtitle => "Subtitle",
            FrameType::Genre => "Genre",
            FrameType::Artist => "Artist",
            FrameType::Album => "Album",
            FrameType::Composer => "Composer",
            FrameType::Orchestra => "Orchestra",
            FrameType::OrigArtist => "OrigArtist",
            FrameType::Year => "Year",
            FrameType::OrigYear => "OrigYear",
            FrameType::TrackNum => "TrackNum",
            FrameType::BeatsPerMinute => "BeatsPerMinute",
            FrameType::Duration => "Duration",
            FrameType::Key => "Key",
            FrameType::Conductor => "Conductor",
            FrameType::Language => "Language",
            FrameType::Mood => "Mood",
            FrameType::Comment => "Comment",
        }
    }

    /// Text frame types, in catalog order
    pub fn text_types() -> impl Iterator<Item = FrameType> {
        Self::ALL.into_iter().filter(|t| t.is_text())
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True if a raw frame ID names a text frame
pub fn is_text_frame_id(id: &[u8]) -> bool {
    id.first() == Some(&b'T')
}

/// True if a raw frame ID names a comment frame
pub fn is_comment_frame_id(id: &[u8]) -> bool {
    id == FrameType::Comment.id().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_mapping_round_trips() {
        for frame_type in FrameType::ALL {
            assert_eq!(FrameType::from_id(frame_type.id().as_bytes()), Some(frame_type));
            assert_eq!(FrameType::from_name(frame_type.name()), Some(frame_type));
        }
        assert_eq!(FrameType::from_id(b"APIC"), None);
        assert_eq!(FrameType::from_name("artist"), Some(FrameType::Artist));
    }

    #[test]
    fn test_text_classification() {
        assert_eq!(FrameType::text_types().count(), 17);
        assert!(!FrameType::Comment.is_text());
        assert!(FrameType::Mood.is_text());
        assert!(is_text_frame_id(b"TXXX"));
        assert!(is_comment_frame_id(b"COMM"));
        assert!(!is_comment_frame_id(b"COMR"));
    }
}
