//! The standard genetic code.

use crate::sequence::{Nucleotide, Nucleotide::*};

/// Translation of a stop codon.
pub const STOP_CHAR: char = '*';
/// Translation of a codon containing an ambiguous base.
pub const UNKNOWN_CHAR: char = 'X';

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AminoAcid {
    Arg,
    His,
    Lys,
    Asp,
    Glu,
    Ser,
    Thr,
    Asn,
    Gln,
    Cys,
    Gly,
    Pro,
    Ala,
    Val,
    Ile,
    Leu,
    Met,
    Phe,
    Tyr,
    Trp,
}

impl AminoAcid {
    pub fn ident_single_letter(&self) -> char {
        match self {
            Self::Arg => 'R',
            Self::His => 'H',
            Self::Lys => 'K',
            Self::Asp => 'D',
            Self::Glu => 'E',
            Self::Ser => 'S',
            Self::Thr => 'T',
            Self::Asn => 'N',
            Self::Gln => 'Q',
            Self::Cys => 'C',
            Self::Gly => 'G',
            Self::Pro => 'P',
            Self::Ala => 'A',
            Self::Val => 'V',
            Self::Ile => 'I',
            Self::Leu => 'L',
            Self::Met => 'M',
            Self::Phe => 'F',
            Self::Tyr => 'Y',
            Self::Trp => 'W',
        }
    }

    /// https://en.wikipedia.org/wiki/DNA_and_RNA_codon_tables#/media/File:Aminoacids_table.svg
    /// Returns `None` for the stop codons: TAA, TAG, TGA.
    pub fn from_codons(codons: [Nucleotide; 3]) -> Option<Self> {
        // Handle cases that are defined entirely by the first two nucleotides.
        match codons[0..2] {
            [C, G] => return Some(Self::Arg),
            [C, C] => return Some(Self::Pro),
            [C, T] => return Some(Self::Leu),
            [T, C] => return Some(Self::Ser),
            [G, G] => return Some(Self::Gly),
            [G, C] => return Some(Self::Ala),
            [G, T] => return Some(Self::Val),
            [A, C] => return Some(Self::Thr),
            _ => (),
        }

        match codons {
            [A, T, G] => Some(Self::Met),
            [A, T, A] | [A, T, C] | [A, T, T] => Some(Self::Ile),
            [C, A, G] | [C, A, A] => Some(Self::Gln),
            [C, A, C] | [C, A, T] => Some(Self::His),
            [T, G, G] => Some(Self::Trp),
            [T, G, C] | [T, G, T] => Some(Self::Cys),
            [T, A, C] | [T, A, T] => Some(Self::Tyr),
            [T, T, G] | [T, T, A] => Some(Self::Leu),
            [T, T, C] | [T, T, T] => Some(Self::Phe),
            [G, A, G] | [G, A, A] => Some(Self::Glu),
            [G, A, C] | [G, A, T] => Some(Self::Asp),
            [A, G, G] | [A, G, A] => Some(Self::Arg),
            [A, G, C] | [A, G, T] => Some(Self::Ser),
            [A, A, G] | [A, A, A] => Some(Self::Lys),
            [A, A, C] | [A, A, T] => Some(Self::Asn),
            // TAA, TAG, TGA, and the 2-nt patterns we handled above.
            _ => None,
        }
    }
}

/// Translate one codon of ASCII bases to its one-letter code. Stops give `*`; anything with a base
/// outside A, C, G, T gives `X`.
pub fn translate_codon(codon: &[u8]) -> char {
    let nts: Option<Vec<Nucleotide>> = codon.iter().map(|&b| Nucleotide::from_u8_letter(b)).collect();

    match nts.as_deref() {
        Some(&[a, b, c]) => match AminoAcid::from_codons([a, b, c]) {
            Some(aa) => aa.ident_single_letter(),
            None => STOP_CHAR,
        },
        _ => UNKNOWN_CHAR,
    }
}

/// Translate a nucleotide string codon by codon. Trailing bases that don't fill a codon are ignored.
pub fn translate(seq: &str) -> String {
    seq.as_bytes().chunks_exact(3).map(translate_codon).collect()
}
