//! Nucleotide and base-call alphabets, and complement operations over them.

use std::fmt;

use bio::alphabets::dna;
use serde::{Deserialize, Serialize};

use crate::sequence::Nucleotide::{A, C, G, T};

/// A DNA nucleotide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Nucleotide {
    A = b'A',
    T = b'T',
    G = b'G',
    C = b'C',
}

impl Nucleotide {
    pub fn from_u8_letter(val_u8: u8) -> Option<Self> {
        match val_u8 {
            b'A' | b'a' => Some(A),
            b'T' | b't' => Some(T),
            b'G' | b'g' => Some(G),
            b'C' | b'c' => Some(C),
            _ => None,
        }
    }
}

/// A called base, as stored in a chromatogram. Unlike `Nucleotide`, this includes `N`
/// for positions the basecaller couldn't resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BaseCall {
    A = b'A',
    T = b'T',
    G = b'G',
    C = b'C',
    #[default]
    N = b'N',
}

impl BaseCall {
    /// Case-insensitive. Returns `None` for anything outside A, T, G, C, N.
    pub fn from_u8_letter(val_u8: u8) -> Option<Self> {
        match val_u8.to_ascii_uppercase() {
            b'A' => Some(Self::A),
            b'T' => Some(Self::T),
            b'G' => Some(Self::G),
            b'C' => Some(Self::C),
            b'N' => Some(Self::N),
            _ => None,
        }
    }

    pub fn complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::T => Self::A,
            Self::G => Self::C,
            Self::C => Self::G,
            Self::N => Self::N,
        }
    }

    pub fn as_char(self) -> char {
        self as u8 as char
    }
}

impl fmt::Display for BaseCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

pub fn base_calls_to_str(calls: &[BaseCall]) -> String {
    calls.iter().map(|b| b.as_char()).collect()
}

/// Reverse complement of a plain sequence string. Input case is ignored; output is uppercase.
/// Symbols outside the IUPAC alphabet pass through unchanged, in reversed position.
pub fn revcomp_str(seq: &str) -> String {
    let upper = seq.to_ascii_uppercase();
    String::from_utf8_lossy(&dna::revcomp(upper.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_call_complement_pairs() {
        assert_eq!(BaseCall::A.complement(), BaseCall::T);
        assert_eq!(BaseCall::G.complement(), BaseCall::C);
        assert_eq!(BaseCall::N.complement(), BaseCall::N);
    }

    #[test]
    fn base_call_parse_is_case_insensitive() {
        assert_eq!(BaseCall::from_u8_letter(b'g'), Some(BaseCall::G));
        assert_eq!(BaseCall::from_u8_letter(b'n'), Some(BaseCall::N));
        assert_eq!(BaseCall::from_u8_letter(b'R'), None);
        assert_eq!(BaseCall::from_u8_letter(0), None);
    }

    #[test]
    fn revcomp_uppercases() {
        assert_eq!(revcomp_str("aTgN"), "NCAT");
        assert_eq!(revcomp_str(""), "");
    }

    #[test]
    fn nucleotide_letters() {
        assert_eq!(Nucleotide::from_u8_letter(b'c'), Some(C));
        assert_eq!(Nucleotide::from_u8_letter(b'N'), None);
        assert_eq!(base_calls_to_str(&[BaseCall::G, BaseCall::N]), "GN");
    }
}
