//! This module includes code for writing what we decode, and for persisting analysis preferences in
//! our own binary format.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{
    chromatogram::{SequenceModel, DEFAULT_QUALITY_THRESHOLD},
    error::{ChromatogramError, Result},
    file_io::DecodeOptions,
    reading_frame::ReadingFrame,
};

pub const DEFAULT_PREFS_FILE: &str = "chromatrace_prefs.ctp";
pub const DEFAULT_MIN_ORF_LEN: usize = 300;

/// Analysis settings that persist between runs.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct AnalysisPrefs {
    /// In nucleotides, including the stop codon.
    pub min_orf_len: usize,
    pub frames: Vec<ReadingFrame>,
    pub quality_threshold: u8,
    pub quality_seed: u64,
    /// Enzyme names to search for. Empty means the whole library.
    pub enzymes: Vec<String>,
}

impl Default for AnalysisPrefs {
    fn default() -> Self {
        Self {
            min_orf_len: DEFAULT_MIN_ORF_LEN,
            frames: ReadingFrame::iter().collect(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            quality_seed: 0,
            enzymes: Vec::new(),
        }
    }
}

impl AnalysisPrefs {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            quality_seed: self.quality_seed,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, config::standard())
            .map_err(|e| ChromatogramError::Prefs(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (decoded, _len) = bincode::decode_from_slice(bytes, config::standard())
            .map_err(|e| ChromatogramError::Prefs(format!("{e}. Did the format change?")))?;
        Ok(decoded)
    }

    /// Save to file, using Bincode.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let encoded = self.to_bytes()?;

        let mut file = File::create(path)?;
        file.write_all(&encoded)?;

        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        Self::from_bytes(&buffer)
    }
}

/// Export a read's base calls in FASTA format: one header line and the unwrapped sequence.
pub fn export_fasta(model: &SequenceModel, header: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(model.to_fasta(header).as_bytes())?;

    debug!("Exported FASTA to {}", path.display());
    Ok(())
}
