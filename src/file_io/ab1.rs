//! For reading AB1 trace files. (Applied Biosystem's sequencing)
//! [BioPython docs](https://biopython.org/wiki/ABI_traces)
//! [BioPython code](https://github.com/biopython/biopython/blob/master/Bio/SeqIO/AbiIO.py)
//!
//! An ABIF file is a header, then a directory of 28-byte entries. Each entry names a tag (4 chars plus a
//! number, e.g. `PBAS1`) and points to its data. All fields are big endian.

use std::{collections::HashMap, fmt};

use num_enum::TryFromPrimitive;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::{
    chromatogram::{Channel, ChromatogramFormat, SequenceModel, Traces},
    error::{ChromatogramError, Result},
    file_io::{read_u16_be, read_u32_be, slice_at, slice_clamped, u16s_be, DecodeOptions, ABIF_MAGIC},
    sequence::BaseCall,
    util::interpolated_peak,
};

const DIR_COUNT_OFFSET: usize = 18;
const DIR_OFFSET_OFFSET: usize = 26;
const DIR_ENTRY_LEN: usize = 28;

/// Channel order for DATA9..DATA12 when the file doesn't give one. Common on 3730 and 3130 instruments.
const DEFAULT_CHANNEL_ORDER: [Channel; 4] = [Channel::G, Channel::A, Channel::T, Channel::C];
/// DATA9..DATA12 hold analyzed trace data; DATA1..DATA4 are raw.
const FIRST_TRACE_TAG: u32 = 9;

/// Synthesized quality values fall in this range, when a file has none.
const FALLBACK_QUALITY_MIN: u8 = 20;
const FALLBACK_QUALITY_MAX: u8 = 60;

const TAG_CHANNEL_ORDER: TagKey = TagKey::new(b"FWO_", 1);
const TAG_BASE_CALLS: TagKey = TagKey::new(b"PBAS", 1);
const TAG_QUALITY: TagKey = TagKey::new(b"PCON", 1);
const TAG_PEAK_LOCATIONS: TagKey = TagKey::new(b"PLOC", 1);

/// Data types a directory entry can hold.
#[derive(Clone, Copy, PartialEq, Eq, Debug, TryFromPrimitive)]
#[repr(u16)]
pub enum ElementType {
    Byte = 1,
    Char = 2,
    Word = 3,
    Short = 4,
    Long = 5,
    Float = 7,
    Double = 8,
    Date = 10,
    Time = 11,
    Thumb = 12,
    Bool = 13,
    PString = 18,
    CString = 19,
    Directory = 1_023,
}

/// Tag name and number, e.g. `DATA` and 9.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TagKey {
    pub name: [u8; 4],
    pub number: u32,
}

impl TagKey {
    pub const fn new(name: &[u8; 4], number: u32) -> Self {
        Self {
            name: *name,
            number,
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", String::from_utf8_lossy(&self.name), self.number)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub key: TagKey,
    pub element_type: u16,
    pub element_size: u16,
    pub num_elements: u32,
    pub data_size: u32,
    /// Entries of 4 bytes or less store their data here directly. None of the tags we read are that
    /// small, so we always treat it as an offset.
    pub data_offset: u32,
}

impl DirEntry {
    fn from_buf(buf: &[u8], offset: usize) -> Result<Self> {
        let name = slice_at(buf, offset, 4)?;

        Ok(Self {
            key: TagKey::new(&[name[0], name[1], name[2], name[3]], read_u32_be(buf, offset + 4)?),
            element_type: read_u16_be(buf, offset + 8)?,
            element_size: read_u16_be(buf, offset + 10)?,
            num_elements: read_u32_be(buf, offset + 12)?,
            data_size: read_u32_be(buf, offset + 16)?,
            data_offset: read_u32_be(buf, offset + 20)?,
        })
    }

    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::try_from_primitive(self.element_type).ok()
    }

    /// This entry's data, cut short if the file ends early.
    pub fn data<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        slice_clamped(buf, self.data_offset as usize, self.data_size as usize)
    }

    /// Up to `max` big-endian u16 elements, stopping at the end of the buffer.
    fn u16_elements(&self, buf: &[u8], max: usize) -> Vec<u16> {
        let count = (self.num_elements as usize).min(max);
        u16s_be(slice_clamped(buf, self.data_offset as usize, count.saturating_mul(2)))
    }

    /// Up to `max` single-byte elements, stopping at the end of the buffer.
    fn u8_elements<'a>(&self, buf: &'a [u8], max: usize) -> &'a [u8] {
        let count = (self.num_elements as usize).min(max);
        slice_clamped(buf, self.data_offset as usize, count)
    }
}

/// The tag directory, keyed by name and number. A later entry with the same key replaces an earlier one.
#[derive(Debug, Default)]
pub struct Directory {
    entries: HashMap<TagKey, DirEntry>,
}

impl Directory {
    pub fn from_buf(buf: &[u8]) -> Result<Self> {
        let signature = slice_at(buf, 0, 4)?;
        if signature != ABIF_MAGIC {
            return Err(ChromatogramError::InvalidSignature {
                format: "ABIF",
                found: signature.to_vec(),
            });
        }

        let num_entries = read_u32_be(buf, DIR_COUNT_OFFSET)? as usize;
        let dir_offset = read_u32_be(buf, DIR_OFFSET_OFFSET)? as usize;

        // Check the whole directory fits before allocating for it.
        let dir_len = num_entries
            .checked_mul(DIR_ENTRY_LEN)
            .ok_or_else(|| {
                ChromatogramError::InvalidHeader(format!("Directory entry count {num_entries}"))
            })?;
        slice_at(buf, dir_offset, dir_len)?;

        debug!("AB1 file has {num_entries} directory entries at offset {dir_offset}");

        let mut entries = HashMap::with_capacity(num_entries);
        for i in 0..num_entries {
            let entry = DirEntry::from_buf(buf, dir_offset + i * DIR_ENTRY_LEN)?;
            entries.insert(entry.key, entry);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &TagKey) -> Option<&DirEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which channel each of DATA9..DATA12 holds. From the `FWO_` tag if it names 4 bases; otherwise
/// the common G, A, T, C order.
fn channel_order(dir: &Directory, buf: &[u8]) -> [Channel; 4] {
    if let Some(entry) = dir.get(&TAG_CHANNEL_ORDER) {
        let order: Vec<Channel> = entry
            .data(buf)
            .iter()
            .filter_map(|&b| Channel::from_u8_letter(b))
            .collect();

        if order.len() >= 4 {
            debug!("Found channel order: {order:?}");
            return [order[0], order[1], order[2], order[3]];
        }
        warn!("Incomplete channel order in FWO_1: {order:?}; using the default");
    }

    DEFAULT_CHANNEL_ORDER
}

/// Decode an AB1 file. Quality values missing from the file are drawn from an RNG seeded by `opts`.
pub fn parse(buf: &[u8], opts: &DecodeOptions) -> Result<SequenceModel> {
    let mut rng = StdRng::seed_from_u64(opts.quality_seed);
    parse_with_rng(buf, &mut rng)
}

/// Decode an AB1 file, drawing any synthesized quality values from `rng`.
pub fn parse_with_rng<R: Rng>(buf: &[u8], rng: &mut R) -> Result<SequenceModel> {
    let dir = Directory::from_buf(buf)?;

    let mut traces = Traces::default();
    for (i, channel) in channel_order(&dir, buf).into_iter().enumerate() {
        let key = TagKey::new(b"DATA", FIRST_TRACE_TAG + i as u32);
        if let Some(entry) = dir.get(&key) {
            if entry.element_type() != Some(ElementType::Short) {
                warn!(
                    "{key} has element type {}; reading it as 16-bit samples anyway",
                    entry.element_type
                );
            }
            let data = entry.u16_elements(buf, usize::MAX);
            debug!("Loaded {} trace points for {key} -> channel {channel}", data.len());
            *traces.get_mut(channel) = data;
        }
    }
    let trace_len = traces.max_len();

    let base_calls: Vec<BaseCall> = match dir.get(&TAG_BASE_CALLS) {
        Some(entry) => entry
            .data(buf)
            .iter()
            .filter_map(|&b| match b {
                b'A' | b'T' | b'G' | b'C' | b'N' => BaseCall::from_u8_letter(b),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };
    let n = base_calls.len();

    let mut quality: Vec<u8> = match dir.get(&TAG_QUALITY) {
        Some(entry) => entry.u8_elements(buf, n).to_vec(),
        None => Vec::new(),
    };
    if quality.len() < n {
        warn!(
            "{} of {n} quality values missing; generating defaults",
            n - quality.len()
        );
        while quality.len() < n {
            quality.push(rng.gen_range(FALLBACK_QUALITY_MIN..FALLBACK_QUALITY_MAX));
        }
    }

    let stored_peaks: Vec<u16> = match dir.get(&TAG_PEAK_LOCATIONS) {
        Some(entry) => entry.u16_elements(buf, n),
        None => Vec::new(),
    };
    if stored_peaks.len() < n {
        warn!(
            "{} of {n} peak locations missing; estimating from trace length",
            n - stored_peaks.len()
        );
    }
    let peak_locations = (0..n)
        .map(|i| match stored_peaks.get(i) {
            Some(&p) if (p as usize) < trace_len => p as u32,
            _ => interpolated_peak(i, n, trace_len),
        })
        .collect();

    let model = SequenceModel::new(
        ChromatogramFormat::Ab1,
        base_calls,
        traces,
        quality,
        peak_locations,
    )?;

    debug!(
        "Parsed AB1: {} bases, {} trace points",
        model.sequence_length(),
        model.trace_len()
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal ABIF buffer: header, then tag data, then the directory.
    fn build(tags: &[(&[u8; 4], u32, u16, u32, Vec<u8>)]) -> Vec<u8> {
        let mut buf = vec![0u8; 128];
        buf[..4].copy_from_slice(b"ABIF");

        let mut dir = Vec::new();
        for (name, number, el_type, num_el, data) in tags {
            let offset = buf.len() as u32;
            buf.extend_from_slice(data);

            dir.extend_from_slice(*name);
            dir.extend_from_slice(&number.to_be_bytes());
            dir.extend_from_slice(&el_type.to_be_bytes());
            dir.extend_from_slice(&1u16.to_be_bytes());
            dir.extend_from_slice(&num_el.to_be_bytes());
            dir.extend_from_slice(&(data.len() as u32).to_be_bytes());
            dir.extend_from_slice(&offset.to_be_bytes());
            dir.extend_from_slice(&0u32.to_be_bytes());
        }

        let dir_offset = buf.len() as u32;
        buf.extend_from_slice(&dir);
        buf[18..22].copy_from_slice(&(tags.len() as u32).to_be_bytes());
        buf[26..30].copy_from_slice(&dir_offset.to_be_bytes());
        buf
    }

    fn words(vals: &[u16]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn decodes_tags_with_default_channel_order() {
        let buf = build(&[
            (b"DATA", 9, 4, 4, words(&[1, 2, 3, 4])),
            (b"DATA", 10, 4, 4, words(&[5, 6, 7, 8])),
            (b"DATA", 11, 4, 4, words(&[9, 9, 9, 9])),
            (b"DATA", 12, 4, 4, words(&[0, 0, 0, 1])),
            (b"PBAS", 1, 2, 4, b"GAxN".to_vec()),
            (b"PCON", 1, 2, 3, vec![40, 61, 12]),
            (b"PLOC", 1, 4, 3, words(&[0, 2, 9])),
        ]);

        let m = parse(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(m.file_format(), ChromatogramFormat::Ab1);
        assert_eq!(m.sequence(), "GAN");
        assert_eq!(m.traces().g, vec![1, 2, 3, 4]);
        assert_eq!(m.traces().a, vec![5, 6, 7, 8]);
        assert_eq!(m.traces().t, vec![9, 9, 9, 9]);
        assert_eq!(m.traces().c, vec![0, 0, 0, 1]);
        assert_eq!(m.quality(), &[40, 60, 12]);
        // 9 is outside the 4-sample trace; round(2 * 4 / 3) = 3.
        assert_eq!(m.peak_locations(), &[0, 2, 3]);
    }

    #[test]
    fn channel_order_from_fwo() {
        let buf = build(&[
            (b"FWO_", 1, 2, 4, b"ACGT".to_vec()),
            (b"DATA", 9, 4, 2, words(&[1, 1])),
            (b"DATA", 10, 4, 2, words(&[2, 2])),
            (b"PBAS", 1, 2, 1, b"A".to_vec()),
        ]);
        let m = parse(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(m.traces().a, vec![1, 1]);
        assert_eq!(m.traces().c, vec![2, 2]);
        // Channels without data are zero-filled to the common length.
        assert_eq!(m.traces().g, vec![0, 0]);
    }

    #[test]
    fn short_fwo_falls_back() {
        let buf = build(&[
            (b"FWO_", 1, 2, 4, b"AC\0\0".to_vec()),
            (b"DATA", 9, 4, 1, words(&[7])),
            (b"PBAS", 1, 2, 1, b"C".to_vec()),
        ]);
        let m = parse(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(m.traces().g, vec![7]);
    }

    #[test]
    fn synthesized_quality_is_seeded() {
        let buf = build(&[
            (b"DATA", 9, 4, 8, words(&[0; 8])),
            (b"PBAS", 1, 2, 4, b"ACGT".to_vec()),
        ]);
        let opts = DecodeOptions { quality_seed: 7 };
        let a = parse(&buf, &opts).unwrap();
        let b = parse(&buf, &opts).unwrap();

        assert_eq!(a.quality(), b.quality());
        assert!(a.quality().iter().all(|&q| (20..60).contains(&q)));
        assert_eq!(a.peak_locations(), &[0, 2, 4, 6]);
    }

    #[test]
    fn rejects_missing_data() {
        let buf = build(&[(b"PBAS", 1, 2, 2, b"AC".to_vec())]);
        assert!(matches!(
            parse(&buf, &DecodeOptions::default()),
            Err(ChromatogramError::NoTraceData("AB1"))
        ));

        let buf = build(&[(b"DATA", 9, 4, 1, words(&[1])), (b"PBAS", 1, 2, 2, b"--".to_vec())]);
        assert!(matches!(
            parse(&buf, &DecodeOptions::default()),
            Err(ChromatogramError::NoBaseCalls("AB1"))
        ));
    }

    #[test]
    fn rejects_bad_signature_and_directory() {
        let mut buf = build(&[(b"PBAS", 1, 2, 1, b"A".to_vec())]);
        buf[0] = b'X';
        assert!(matches!(
            parse(&buf, &DecodeOptions::default()),
            Err(ChromatogramError::InvalidSignature { .. })
        ));

        let mut buf = build(&[(b"PBAS", 1, 2, 1, b"A".to_vec())]);
        buf[18..22].copy_from_slice(&1_000u32.to_be_bytes());
        assert!(matches!(
            parse(&buf, &DecodeOptions::default()),
            Err(ChromatogramError::Truncated { .. })
        ));
    }

    #[test]
    fn directory_lookup() {
        let buf = build(&[(b"PBAS", 1, 2, 3, b"ACG".to_vec()), (b"DATA", 9, 4, 0, vec![])]);
        let dir = Directory::from_buf(&buf).unwrap();
        assert_eq!(dir.len(), 2);

        let entry = dir.get(&TAG_BASE_CALLS).unwrap();
        assert_eq!(entry.element_type(), Some(ElementType::Char));
        assert_eq!(entry.data(&buf), b"ACG");
        assert_eq!(entry.key.to_string(), "PBAS1");
        assert!(dir.get(&TagKey::new(b"DATA", 10)).is_none());
    }
}
