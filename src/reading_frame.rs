use std::{fmt::Display, str::FromStr};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use tracing::debug;

use crate::{amino_acids::translate, sequence::revcomp_str};

const START_CODON: &[u8; 3] = b"ATG";
pub const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

/// Of the 6 possible reading frames.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Encode, Decode, Serialize, Deserialize, EnumIter)]
pub enum ReadingFrame {
    /// Forward, starting at the first base (This pattern applies for all variants)
    #[serde(rename = "+1")]
    Fwd1,
    #[serde(rename = "+2")]
    Fwd2,
    #[serde(rename = "+3")]
    Fwd3,
    #[serde(rename = "-1")]
    Rev1,
    #[serde(rename = "-2")]
    Rev2,
    #[serde(rename = "-3")]
    Rev3,
}

impl ReadingFrame {
    pub fn offset(&self) -> usize {
        match self {
            Self::Fwd1 | Self::Rev1 => 0,
            Self::Fwd2 | Self::Rev2 => 1,
            Self::Fwd3 | Self::Rev3 => 2,
        }
    }

    pub fn is_reverse(&self) -> bool {
        !matches!(self, Self::Fwd1 | Self::Fwd2 | Self::Fwd3)
    }

    /// 1 to 3.
    pub fn number(&self) -> usize {
        self.offset() + 1
    }

    pub fn strand(&self) -> Strand {
        if self.is_reverse() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

impl Default for ReadingFrame {
    fn default() -> Self {
        Self::Fwd1
    }
}

impl Display for ReadingFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_reverse() { '-' } else { '+' };
        write!(f, "{sign}{}", self.number())
    }
}

impl FromStr for ReadingFrame {
    type Err = String;

    /// Accepts `+1`..`+3`, `-1`..`-3`, and `1`..`3` for the forward frames.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "+1" | "1" => Self::Fwd1,
            "+2" | "2" => Self::Fwd2,
            "+3" | "3" => Self::Fwd3,
            "-1" => Self::Rev1,
            "-2" => Self::Rev2,
            "-3" => Self::Rev3,
            other => return Err(format!("Invalid reading frame: {other}")),
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Strand {
    Forward,
    Reverse,
}

/// A start codon through the next in-frame stop, inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orf {
    pub frame: ReadingFrame,
    pub strand: Strand,
    /// 0-based, on the forward sequence, for both strands.
    pub start: usize,
    /// Inclusive.
    pub end: usize,
    pub length_nt: usize,
    /// Includes the stop.
    pub length_aa: usize,
    /// In reading direction; for reverse frames this is reverse-complemented.
    pub nucleotides: String,
    pub amino_acids: String,
}

/// Find open reading frames in the requested frames. `min_len` is compared against the ORF's
/// nucleotide length, stop codon included.
pub fn find_orfs(seq: &str, frames: &[ReadingFrame], min_len: usize) -> Vec<Orf> {
    // Anything that isn't ASCII can't be a base; keep one byte per char so indices line up.
    let fwd: String = seq
        .chars()
        .map(|c| if c.is_ascii() { c.to_ascii_uppercase() } else { 'N' })
        .collect();
    let rev = revcomp_str(&fwd);

    let mut result = Vec::new();

    for &frame in frames {
        let strand_seq = if frame.is_reverse() { &rev } else { &fwd };
        let found = find_orfs_in_frame(strand_seq, frame, min_len);
        debug!("Frame {frame}: {} ORFs", found.len());

        result.extend(found);
    }

    result
}

fn find_orfs_in_frame(seq: &str, frame: ReadingFrame, min_len: usize) -> Vec<Orf> {
    let bytes = seq.as_bytes();
    let len = bytes.len();
    let mut result = Vec::new();

    let mut i = frame.offset();
    while i + 3 <= len {
        if &bytes[i..i + 3] != START_CODON {
            i += 3;
            continue;
        }

        let mut j = i + 3;
        let stop = loop {
            if j + 3 > len {
                break None;
            }
            if STOP_CODONS.iter().any(|s| &bytes[j..j + 3] == *s) {
                break Some(j);
            }
            j += 3;
        };

        // No stop downstream; nothing later in this frame can close either.
        let Some(j) = stop else {
            break;
        };

        let length_nt = j + 3 - i;
        if length_nt >= min_len {
            let nucleotides = seq[i..j + 3].to_owned();
            let amino_acids = translate(&nucleotides);

            let (start, end) = if frame.is_reverse() {
                (len - (j + 3), len - i - 1)
            } else {
                (i, j + 2)
            };

            result.push(Orf {
                frame,
                strand: frame.strand(),
                start,
                end,
                length_nt,
                length_aa: amino_acids.len(),
                nucleotides,
                amino_acids,
            });
        }

        i = j + 3;
    }

    result
}
