//! Error kinds for chromatogram decoding and file handling. Every decode error is fatal to the call
//! that produced it; we never return a partially-decoded model.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChromatogramError>;

#[derive(Debug, Error)]
pub enum ChromatogramError {
    /// Too few bytes to read the 8-byte format signature.
    #[error("Buffer too small to determine file type: {len} bytes")]
    BufferTooSmall { len: usize },

    /// Caller-side rejection of near-empty files.
    #[error("No chromatogram data: {len} bytes")]
    NoData { len: usize },

    #[error("Unknown file format; not AB1, SCF, or ZTR")]
    UnknownFormat,

    /// Recognized, but we don't decode it. Currently only ZTR.
    #[error("{0} format is not supported; convert to AB1 or SCF")]
    UnsupportedFormat(&'static str),

    #[error("Invalid {format} signature: {found:02x?}")]
    InvalidSignature {
        format: &'static str,
        found: Vec<u8>,
    },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported SCF sample width: {0} bytes")]
    UnsupportedSampleWidth(u32),

    /// A fixed-layout field or record extends past the end of the buffer.
    #[error("Truncated file: needed {needed} bytes at offset {offset}, buffer is {len} bytes")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("No trace data found in {0} file")]
    NoTraceData(&'static str),

    #[error("No base calls found in {0} file")]
    NoBaseCalls(&'static str),

    #[error("Preferences error: {0}")]
    Prefs(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChromatogramError {
    /// The ZTR case gets its own user-facing text; everything else is a generic load failure.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_))
    }
}
