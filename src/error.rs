//! Typed failures raised by the tag codec
//!
//! Library functions return [`anyhow::Result`]; the errors below are wrapped
//! inside it so callers can tell a malformed file or a misuse of the API
//! apart from plain I/O trouble with `downcast_ref::<TagError>()`.

use thiserror::Error;

/// Format and contract errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The 10-byte ID3v2 file header is missing or unusable
    #[error("invalid ID3v2 header: {0}")]
    InvalidHeader(&'static str),

    /// A non-text frame type was handed to a text accessor
    #[error("{0} is not a text frame")]
    NotATextFrame(&'static str),

    /// Comment index past the end of the comment list
    #[error("comment index {index} out of range (count {count})")]
    CommentIndexOutOfRange { index: usize, count: usize },

    /// Text encoding selector that cannot be decoded
    #[error("unsupported text encoding {0}")]
    UnsupportedEncoding(u8),

    /// Frame payload is shorter than its fixed fields
    #[error("malformed {0} frame")]
    MalformedFrame(String),

    /// Value does not fit in a 28-bit sync-safe integer
    #[error("value {0} does not fit in a sync-safe integer")]
    SizeOverflow(u32),

    /// APEv2 block failed validation
    #[error("invalid APEv2 tag: {0}")]
    InvalidApeTag(&'static str),
}
