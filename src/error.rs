/*!
# Error Types

Typed errors for each pipeline stage, matching the error kinds laid out in
the error-handling design: decompression, container framing, and injection
each get their own enum so callers can match on *kind*, not just display
text. The driver wraps these in [`anyhow::Error`] with file-path context.
*/

use thiserror::Error;

/// Errors from the LZSS codec.
#[derive(Debug, Error)]
pub enum LzssError {
    /// A back-reference token ran past the end of the compressed stream.
    #[error("truncated back-reference at compressed offset {offset}")]
    TruncatedBackReference { offset: usize },

    /// A literal token was declared but no byte remained to read.
    #[error("literal past end of stream at compressed offset {offset}")]
    LiteralPastEof { offset: usize },

    /// The 4-byte declared length prefix was negative when read as signed.
    #[error("declared decompressed length is negative")]
    NegativeDeclaredLength,

    /// Input too short to contain even the 4-byte length prefix.
    #[error("input shorter than the 4-byte length prefix")]
    MissingLengthPrefix,
}

/// Errors from container framing.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Raw container smaller than the 0x18-byte header.
    #[error("container is only {len} bytes, need at least 0x18")]
    FileTooSmall { len: usize },

    /// Decompressed body exceeds the 0xFFFF byte ceiling.
    #[error("decompressed body is {len} bytes, exceeds 0xFFFF limit")]
    BodyTooLarge { len: usize },

    #[error(transparent)]
    Lzss(#[from] LzssError),
}

/// Errors from the injection engine.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Replacement line count does not match the scanned record count.
    #[error("translator file has {got} lines but script has {expected} records")]
    Mismatch { expected: usize, got: usize },

    /// A record's original bytes could not be found at or after the
    /// rewrite cursor; the file is structurally inconsistent.
    #[error("lost anchor for record at original position {position:#06x}")]
    LostAnchor { position: usize },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Errors surfaced by the external FAT image writer.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("path {path} not found in image")]
    NotFound { path: String },

    #[error("insufficient free clusters in image: need {needed}, have {available}")]
    NoSpace { needed: u32, available: u32 },

    #[error("image is corrupt: {reason}")]
    ImageCorrupt { reason: String },

    #[error("I/O error accessing image: {0}")]
    Io(#[from] std::io::Error),
}
