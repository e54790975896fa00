//! Decoding and analysis of DNA sequencer chromatograms.
//!
//! AB1 (ABIF) and SCF files decode into one [`SequenceModel`]: base calls, per-base quality, peak
//! locations, and the four fluorescence trace channels. From there we can reverse-complement a read,
//! search it for restriction sites, and find open reading frames in any of the six frames.

pub mod amino_acids;
pub mod chromatogram;
pub mod error;
pub mod file_io;
pub mod reading_frame;
pub mod restriction_enzyme;
pub mod sequence;
pub mod util;

pub use chromatogram::{Channel, ChromatogramFormat, SequenceModel, Traces};
pub use error::{ChromatogramError, Result};
pub use file_io::{detect_format, load, parse, DecodeOptions, DetectedFormat};
pub use reading_frame::{find_orfs, Orf, ReadingFrame};
pub use restriction_enzyme::{find_restriction_sites, matches_pattern, RestrictionEnzyme, RestrictionSite};
