//! This module contains code for loading chromatogram files, and exporting what we decode from them.
//!
//! We pick a decoder from the file's leading bytes, not its extension. Both supported formats are
//! big endian.

use std::{
    fs,
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

use crate::{
    chromatogram::SequenceModel,
    error::{ChromatogramError, Result},
};

pub mod ab1;
pub mod delta_delta;
pub mod save;
pub mod scf;

pub use save::export_fasta;

pub const SCF_MAGIC: [u8; 4] = *b".scf";
pub const ABIF_MAGIC: [u8; 4] = *b"ABIF";
/// "\xaeZTR\r\n\x1a\n"
pub const ZTR_MAGIC: [u8; 8] = [0xae, 0x5a, 0x54, 0x52, 0x0d, 0x0a, 0x1a, 0x0a];

/// Bytes needed to tell the formats apart.
pub const MIN_SNIFF_LEN: usize = 8;
/// Anything smaller than this isn't treated as a chromatogram at all.
pub const MIN_FILE_LEN: usize = 100;

pub const CHROMATOGRAM_EXTENSIONS: [&str; 3] = ["ab1", "abi", "scf"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DetectedFormat {
    Scf,
    Abif,
    /// Recognized, but not decodable here.
    Ztr,
    Unknown,
}

/// Settings that affect decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Seeds the quality values synthesized for AB1 files that have none.
    pub quality_seed: u64,
}

/// Identify the format from the first 8 bytes.
pub fn detect_format(buf: &[u8]) -> Result<DetectedFormat> {
    if buf.len() < MIN_SNIFF_LEN {
        return Err(ChromatogramError::BufferTooSmall { len: buf.len() });
    }

    let format = if buf[..4] == SCF_MAGIC {
        DetectedFormat::Scf
    } else if buf[..4] == ABIF_MAGIC {
        DetectedFormat::Abif
    } else if buf[..8] == ZTR_MAGIC {
        DetectedFormat::Ztr
    } else {
        DetectedFormat::Unknown
    };

    Ok(format)
}

/// Decode a chromatogram of either supported format.
pub fn parse(buf: &[u8], opts: &DecodeOptions) -> Result<SequenceModel> {
    let format = detect_format(buf)?;
    debug!("Detected file type: {format:?}");

    match format {
        DetectedFormat::Scf => scf::parse(buf),
        DetectedFormat::Abif => ab1::parse(buf, opts),
        DetectedFormat::Ztr => Err(ChromatogramError::UnsupportedFormat("ZTR")),
        DetectedFormat::Unknown => Err(ChromatogramError::UnknownFormat),
    }
}

/// As `parse`, but first rejects buffers too small to hold any real chromatogram.
pub fn load_bytes(buf: &[u8], opts: &DecodeOptions) -> Result<SequenceModel> {
    if buf.len() < MIN_FILE_LEN {
        return Err(ChromatogramError::NoData { len: buf.len() });
    }
    parse(buf, opts)
}

/// Read and decode a chromatogram file.
pub fn load(path: &Path, opts: &DecodeOptions) -> Result<SequenceModel> {
    if !has_chromatogram_extension(path) {
        warn!(
            "{} doesn't have an .ab1, .abi, or .scf extension; detecting format from contents",
            path.display()
        );
    }

    let buf = fs::read(path)?;
    debug!("Parsing {}, size: {} bytes", path.display(), buf.len());

    load_bytes(&buf, opts)
}

pub fn has_chromatogram_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CHROMATOGRAM_EXTENSIONS
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// FASTA header for an exported read: the file name, including extension.
pub fn fasta_header_for(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Where to export a read's FASTA: next to the input, with a trailing `.ab1` replaced by `.fasta`.
/// Other extensions are kept, e.g. `read.scf` -> `read.scf.fasta`.
pub fn fasta_path_for(path: &Path) -> PathBuf {
    let name = fasta_header_for(path);
    let stem = name.strip_suffix(".ab1").unwrap_or(&name);

    path.with_file_name(format!("{stem}.fasta"))
}

/// Borrow `len` bytes at `offset`, or report how far short the buffer is.
pub(crate) fn slice_at(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(ChromatogramError::Truncated {
            offset,
            needed: len,
            len: buf.len(),
        })
}

/// The bytes from `offset` up to `len` bytes on, cut short at the end of the buffer.
pub(crate) fn slice_clamped(buf: &[u8], offset: usize, len: usize) -> &[u8] {
    if offset >= buf.len() {
        return &[];
    }
    let end = offset.saturating_add(len).min(buf.len());
    &buf[offset..end]
}

pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(BigEndian::read_u32(slice_at(buf, offset, 4)?))
}

pub(crate) fn read_u16_be(buf: &[u8], offset: usize) -> Result<u16> {
    Ok(BigEndian::read_u16(slice_at(buf, offset, 2)?))
}

/// Big-endian u16s from a byte run. A trailing odd byte is ignored.
pub(crate) fn u16s_be(bytes: &[u8]) -> Vec<u16> {
    let mut result = vec![0; bytes.len() / 2];
    BigEndian::read_u16_into(&bytes[..result.len() * 2], &mut result);
    result
}
