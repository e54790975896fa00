//! This module contains info related to Restriction Enzyme sites, and finding them in a read.
//!
//! [Wikipedia: List of RE sites](https://en.wikipedia.org/wiki/List_of_restriction_enzyme_cutting_sites:_A)
//! [NEB guide](https://www.neb.com/en-us/tools-and-resources/selection-charts/frequencies-of-restriction-sites)
//!
//! Note: This module only includes a selection of popular REs.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use serde::Serialize;
use tracing::debug;

/// Unlike `Nucleotide`, this includes wildcards
/// [IUPAC codes](https://www.bioinformatics.org/sms/iupac.html)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NucleotideGeneral {
    A,
    T,
    C,
    G,
    /// Any
    N,
    /// A or T
    W,
    /// C or G
    S,
    /// Pyrimidines: C or T
    Y,
    /// Purines: A or G
    R,
    /// A or C
    M,
    /// G or T
    K,
    /// Not A
    B,
    /// Not C
    D,
    /// Not G
    H,
    /// Not T
    V,
}

impl NucleotideGeneral {
    /// Case-insensitive. Returns `None` for anything that isn't an IUPAC code.
    pub fn from_u8_letter(letter: u8) -> Option<Self> {
        use NucleotideGeneral::*;
        Some(match letter.to_ascii_uppercase() {
            b'A' => A,
            b'T' => T,
            b'C' => C,
            b'G' => G,
            b'N' => N,
            b'W' => W,
            b'S' => S,
            b'Y' => Y,
            b'R' => R,
            b'M' => M,
            b'K' => K,
            b'B' => B,
            b'D' => D,
            b'H' => H,
            b'V' => V,
            _ => return None,
        })
    }

    /// The bases this code stands for.
    pub fn allowed(&self) -> &'static [u8] {
        use NucleotideGeneral::*;
        match self {
            A => b"A",
            T => b"T",
            C => b"C",
            G => b"G",
            N => b"ATGC",
            W => b"AT",
            S => b"GC",
            Y => b"CT",
            R => b"AG",
            M => b"AC",
            K => b"GT",
            B => b"CGT",
            D => b"AGT",
            H => b"ACT",
            V => b"ACG",
        }
    }

    /// Whether a concrete base (case-insensitive) is in this code's set. Ambiguous read bases, like
    /// `N`, match nothing.
    pub fn matches(&self, base: u8) -> bool {
        self.allowed().contains(&base.to_ascii_uppercase())
    }
}

#[derive(Clone, Eq, Debug)]
pub struct RestrictionEnzyme {
    pub name: String,
    /// Recognition pattern from the 5' end, in IUPAC codes.
    pub pattern: String,
    /// The cut lands this many bases after the start of a match. For blunt ends, this will be
    /// halfway through the pattern.
    pub cut_offset: isize,
}

impl Hash for RestrictionEnzyme {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialEq for RestrictionEnzyme {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl RestrictionEnzyme {
    pub fn new(name: &str, pattern: &str, cut_offset: isize) -> Self {
        Self {
            name: name.to_owned(),
            pattern: pattern.to_ascii_uppercase(),
            cut_offset,
        }
    }

    pub fn makes_blunt_ends(&self) -> bool {
        self.cut_offset * 2 == self.pattern.len() as isize
    }

    /// A depiction of where to cut, e.g. `G | AATTC`. Cuts outside the pattern aren't marked.
    pub fn cut_depiction(&self) -> String {
        let mut result = String::new();

        for (i, nt_char) in self.pattern.chars().enumerate() {
            if i as isize == self.cut_offset && i != 0 {
                result.push_str(" | ");
            }
            result.push(nt_char);
        }

        if self.cut_offset == self.pattern.len() as isize {
            result.push_str(" | ");
        }

        result
    }
}

/// One place an enzyme's pattern occurs in a read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionSite {
    pub enzyme_name: String,
    /// 0-based index of the first matched base.
    pub position: usize,
    /// `position + cut_offset`.
    pub cut_position: isize,
    pub matched_text: String,
    pub pattern_text: String,
}

/// Whether `window` satisfies `pattern` base for base. Windows of a different length never match, and
/// neither does a pattern containing a non-IUPAC symbol.
pub fn matches_pattern(window: &str, pattern: &str) -> bool {
    if window.len() != pattern.len() {
        return false;
    }

    window.bytes().zip(pattern.bytes()).all(|(base, code)| {
        NucleotideGeneral::from_u8_letter(code)
            .map(|c| c.matches(base))
            .unwrap_or(false)
    })
}

/// Scan a sequence for every enzyme, in every window. Results are ordered by position; sites at the
/// same position keep the order of `lib`. Overlapping sites are all reported.
pub fn find_restriction_sites(seq: &str, lib: &[RestrictionEnzyme]) -> Vec<RestrictionSite> {
    let mut result = Vec::new();

    for re in lib {
        let len = re.pattern.len();
        if len == 0 || len > seq.len() {
            continue;
        }

        for i in 0..=seq.len() - len {
            // `get` is `None` if the window splits a multi-byte char; that can't be a base anyway.
            let Some(window) = seq.get(i..i + len) else {
                continue;
            };

            if matches_pattern(window, &re.pattern) {
                result.push(RestrictionSite {
                    enzyme_name: re.name.clone(),
                    position: i,
                    cut_position: i as isize + re.cut_offset,
                    matched_text: window.to_owned(),
                    pattern_text: re.pattern.clone(),
                });
            }
        }
    }

    // Stable; ties stay in library order.
    result.sort_by_key(|site| site.position);

    debug!("Found {} restriction sites", result.len());
    result
}

/// The number of sites found for each enzyme.
pub fn match_counts(sites: &[RestrictionSite]) -> HashMap<&str, usize> {
    let mut result = HashMap::new();
    for site in sites {
        *result.entry(site.enzyme_name.as_str()).or_insert(0) += 1;
    }
    result
}

/// Enzymes from `lib` whose name is in `names`, compared case-insensitively. An empty `names` selects
/// the whole library.
pub fn select_enzymes(lib: &[RestrictionEnzyme], names: &[String]) -> Vec<RestrictionEnzyme> {
    if names.is_empty() {
        return lib.to_vec();
    }

    lib.iter()
        .filter(|re| names.iter().any(|n| n.eq_ignore_ascii_case(&re.name)))
        .cloned()
        .collect()
}

/// Load a set of common Restriction enzymes.
pub fn load_re_library() -> Vec<RestrictionEnzyme> {
    vec![
        RestrictionEnzyme::new("AanI", "TTATAA", 3),
        RestrictionEnzyme::new("AatI", "AGGCCT", 3),
        RestrictionEnzyme::new("AatII", "GACGTC", 5),
        RestrictionEnzyme::new("AbsI", "CCTCGAGG", 2),
        RestrictionEnzyme::new("AccI", "GTMKAC", 2),
        RestrictionEnzyme::new("Acc65I", "GGTACC", 1),
        RestrictionEnzyme::new("AflII", "CTTAAG", 1),
        RestrictionEnzyme::new("AgeI", "ACCGGT", 1),
        RestrictionEnzyme::new("ApaI", "GGGCCC", 5),
        RestrictionEnzyme::new("AscI", "GGCGCGCC", 2),
        RestrictionEnzyme::new("AseI", "ATTAAT", 2),
        RestrictionEnzyme::new("AsiSI", "GCGATCGC", 5),
        RestrictionEnzyme::new("AvaI", "CYCGRG", 1),
        RestrictionEnzyme::new("BamHI", "GGATCC", 1),
        RestrictionEnzyme::new("BanI", "GGYRCC", 1),
        RestrictionEnzyme::new("BclI", "TGATCA", 1),
        RestrictionEnzyme::new("BglII", "AGATCT", 1),
        RestrictionEnzyme::new("BmtI", "GCTAGC", 5),
        RestrictionEnzyme::new("BspEI", "TCCGGA", 1),
        RestrictionEnzyme::new("BstBI", "TTCGAA", 2),
        RestrictionEnzyme::new("ClaI", "ATCGAT", 2),
        RestrictionEnzyme::new("EcoRI", "GAATTC", 1),
        RestrictionEnzyme::new("EcoRV", "GATATC", 3),
        RestrictionEnzyme::new("FspI", "TGCGCA", 3),
        RestrictionEnzyme::new("HincII", "GTYRAC", 3),
        RestrictionEnzyme::new("HindIII", "AAGCTT", 1),
        RestrictionEnzyme::new("HpaI", "GTTAAC", 3),
        RestrictionEnzyme::new("KpnI", "GGTACC", 5),
        RestrictionEnzyme::new("MauBI", "CGCGCGCG", 2),
        RestrictionEnzyme::new("MscI", "TGGCCA", 3),
        RestrictionEnzyme::new("NdeI", "CATATG", 2),
        RestrictionEnzyme::new("NotI", "GCGGCCGC", 2),
        RestrictionEnzyme::new("NruI", "TCGCGA", 3),
        RestrictionEnzyme::new("NsiI", "ATGCAT", 5),
        RestrictionEnzyme::new("PacI", "TTAATTAA", 5),
        RestrictionEnzyme::new("PciI", "ACATGT", 1),
        RestrictionEnzyme::new("PmeI", "GTTTAAAC", 4),
        RestrictionEnzyme::new("PmlI", "CACGTG", 3),
        RestrictionEnzyme::new("PsiI", "TTATAA", 3),
        RestrictionEnzyme::new("PspOMI", "GGGCCC", 1),
        RestrictionEnzyme::new("PstI", "CTGCAG", 5),
        RestrictionEnzyme::new("SacI", "GAGCTC", 5),
        RestrictionEnzyme::new("SalI", "GTCGAC", 1),
        RestrictionEnzyme::new("ScaI", "AGTACT", 3),
        RestrictionEnzyme::new("SbfI", "CCTGCAGG", 6),
        RestrictionEnzyme::new("SfoI", "GGCGCC", 3),
        RestrictionEnzyme::new("SmaI", "CCCGGG", 3),
        RestrictionEnzyme::new("SpeI", "ACTAGT", 1),
        RestrictionEnzyme::new("SphI", "GCATGC", 5),
        RestrictionEnzyme::new("SrfI", "GCCCGGGC", 4),
        RestrictionEnzyme::new("StuI", "AGGCCT", 3),
        RestrictionEnzyme::new("StyI", "CCWWGG", 1),
        RestrictionEnzyme::new("XbaI", "TCTAGA", 1),
        RestrictionEnzyme::new("XhoI", "CTCGAG", 1),
        RestrictionEnzyme::new("ZraI", "GACGTC", 3),
    ]
}
