//! Errors raised while decoding a save file.
//!
//! Every decode failure aborts the whole load; there is no partial or
//! degraded map. Out-of-range grid queries after a successful load are
//! programming errors and panic instead (see `Tilemap`).

use std::fmt;
use std::io;

use crate::container::ChunkTag;

/// Failure while decoding the tagged-chunk container.
#[derive(Debug)]
pub enum DecodeError {
    /// A magic tag at the start of the stream did not match.
    BadMagic { expected: ChunkTag, found: ChunkTag },
    /// The stream ended before a declared length was satisfied.
    Truncated,
    /// A declared length is outside the sane range, or a required chunk
    /// has the wrong byte count.
    InvalidSize { tag: ChunkTag, size: usize },
    /// An RLE control byte was invalid or a run overran the chunk payload.
    CorruptSegment { tag: ChunkTag, offset: usize },
    /// A chunk required for map construction was absent after full decode.
    MissingSegment(ChunkTag),
    /// Underlying I/O failure other than end-of-stream.
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadMagic { expected, found } => {
                write!(f, "invalid header '{}' (expected '{}')", found, expected)
            }
            DecodeError::Truncated => write!(f, "file ended prematurely"),
            DecodeError::InvalidSize { tag, size } => {
                write!(f, "invalid size {} for segment '{}'", size, tag)
            }
            DecodeError::CorruptSegment { tag, offset } => {
                write!(
                    f,
                    "invalid compression format in segment '{}' at byte {}",
                    tag, offset
                )
            }
            DecodeError::MissingSegment(tag) => write!(f, "segment '{}' not found", tag),
            DecodeError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        // read_exact signals a short read this way; everything else is a
        // real I/O failure.
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::Truncated
        } else {
            DecodeError::Io(e)
        }
    }
}
