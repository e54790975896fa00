//! For reading SCF (Standard Chromatogram Format) trace files.
//! [SCF format](https://staden.sourceforge.net/manual/formats_unix_3.html)
//!
//! Layout: a fixed 128-byte header, then the four sample channels (A, C, G, T) back to back, each
//! delta-delta encoded, then the base records. Versions below 3.10 store base records as parallel
//! columns; later versions store one 16-byte struct per base. All fields are big endian.

use tracing::debug;

use crate::{
    chromatogram::{Channel, ChromatogramFormat, SequenceModel, Traces, MAX_QUALITY},
    error::{ChromatogramError, Result},
    file_io::{delta_delta, read_u32_be, slice_at, u16s_be, SCF_MAGIC},
    sequence::BaseCall,
    util::interpolated_peak,
};

const VERSION_OFFSET: usize = 36;
const SAMPLE_SIZE_OFFSET: usize = 40;

/// Channel order of the sample data, and of the per-base probabilities.
const CHANNEL_ORDER: [Channel; 4] = [Channel::A, Channel::C, Channel::G, Channel::T];

/// Versions below this store base records in columns.
const STRUCT_LAYOUT_VERSION: f64 = 3.1;
/// Peak index (4), 4 probabilities, base char, then spare bytes.
const BASE_STRUCT_LEN: usize = 16;
/// Bytes per base in the columnar layout that we read: peak index, 4 probabilities, base char.
const BASE_COLUMNS_LEN: usize = 9;

#[derive(Clone, Debug, PartialEq)]
pub struct ScfHeader {
    pub samples: u32,
    pub samples_offset: u32,
    pub bases: u32,
    pub bases_left_clip: u32,
    pub bases_right_clip: u32,
    pub bases_offset: u32,
    /// 4 ASCII chars, e.g. "3.00".
    pub version: [u8; 4],
    /// Bytes per sample: 1 or 2.
    pub sample_size: u32,
}

impl ScfHeader {
    pub fn from_buf(buf: &[u8]) -> Result<Self> {
        let magic = slice_at(buf, 0, 4)?;
        if magic != SCF_MAGIC {
            return Err(ChromatogramError::InvalidSignature {
                format: "SCF",
                found: magic.to_vec(),
            });
        }

        let version = slice_at(buf, VERSION_OFFSET, 4)?;

        Ok(Self {
            samples: read_u32_be(buf, 4)?,
            samples_offset: read_u32_be(buf, 8)?,
            bases: read_u32_be(buf, 12)?,
            bases_left_clip: read_u32_be(buf, 16)?,
            bases_right_clip: read_u32_be(buf, 20)?,
            bases_offset: read_u32_be(buf, 24)?,
            version: [version[0], version[1], version[2], version[3]],
            sample_size: read_u32_be(buf, SAMPLE_SIZE_OFFSET)?,
        })
    }

    /// The leading number in the version string, ignoring NULs and whitespace. "3.00" -> 3.0.
    pub fn version_number(&self) -> Option<f64> {
        let text = String::from_utf8_lossy(&self.version);
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());

        let end = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(text.len());

        text[..end].parse().ok()
    }

    /// Base records are columns for versions below 3.10. An unreadable version is treated as the
    /// struct layout.
    pub fn is_columnar(&self) -> bool {
        matches!(self.version_number(), Some(v) if v < STRUCT_LAYOUT_VERSION)
    }
}

/// One base, as stored. Probabilities are in A, C, G, T order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BaseRecord {
    peak_index: u32,
    prob: [u8; 4],
    base: u8,
}

impl BaseRecord {
    fn max_prob(&self) -> u8 {
        self.prob.into_iter().max().unwrap_or(0)
    }

    /// The stored letter if there is one, otherwise the most probable channel. Ties go to the earlier
    /// channel in A, C, G, T order; all-zero probabilities give N. Letters outside A, C, G, T, N are
    /// recorded as N.
    fn call(&self) -> BaseCall {
        if self.base.is_ascii_alphabetic() {
            return BaseCall::from_u8_letter(self.base).unwrap_or(BaseCall::N);
        }

        let max = self.max_prob();
        if max == 0 {
            return BaseCall::N;
        }

        self.prob
            .iter()
            .position(|&p| p == max)
            .map(|i| match CHANNEL_ORDER[i] {
                Channel::A => BaseCall::A,
                Channel::C => BaseCall::C,
                Channel::G => BaseCall::G,
                Channel::T => BaseCall::T,
            })
            .unwrap_or(BaseCall::N)
    }
}

/// Read one channel's raw samples, and decode them.
fn read_channel(buf: &[u8], header: &ScfHeader, channel_i: usize) -> Result<Vec<u16>> {
    let width = header.sample_size as usize;
    let samples = header.samples as usize;

    let channel_len = samples.checked_mul(width).ok_or_else(|| {
        ChromatogramError::InvalidHeader(format!("Sample count {samples} overflows"))
    })?;
    let offset = channel_len
        .checked_mul(channel_i)
        .and_then(|v| v.checked_add(header.samples_offset as usize))
        .ok_or_else(|| {
            ChromatogramError::InvalidHeader(format!("Sample offset for channel {channel_i} overflows"))
        })?;

    let bytes = slice_at(buf, offset, channel_len)?;
    let raw: Vec<u16> = if width == 1 {
        bytes.iter().map(|&b| b as u16).collect()
    } else {
        u16s_be(bytes)
    };

    Ok(delta_delta::decode(&raw, header.sample_size))
}

fn read_bases(buf: &[u8], header: &ScfHeader) -> Result<Vec<BaseRecord>> {
    let n = header.bases as usize;
    let start = header.bases_offset as usize;

    let overflow =
        || ChromatogramError::InvalidHeader(format!("Base count {n} overflows the base section"));

    if header.is_columnar() {
        // Peak indices, then prob A, C, G, T, then base chars; each column `n` long.
        let bytes = slice_at(buf, start, n.checked_mul(BASE_COLUMNS_LEN).ok_or_else(overflow)?)?;
        let peaks = &bytes[..n * 4];
        let columns = &bytes[n * 4..];

        Ok((0..n)
            .map(|i| BaseRecord {
                peak_index: read_u32_be(peaks, i * 4).unwrap_or(0),
                prob: [columns[i], columns[n + i], columns[2 * n + i], columns[3 * n + i]],
                base: columns[4 * n + i],
            })
            .collect())
    } else {
        // The last record's spare bytes may be missing.
        let len = (n - 1)
            .checked_mul(BASE_STRUCT_LEN)
            .and_then(|v| v.checked_add(BASE_COLUMNS_LEN))
            .ok_or_else(overflow)?;
        let bytes = slice_at(buf, start, len)?;

        Ok((0..n)
            .map(|i| {
                let rec = &bytes[i * BASE_STRUCT_LEN..];
                BaseRecord {
                    peak_index: read_u32_be(rec, 0).unwrap_or(0),
                    prob: [rec[4], rec[5], rec[6], rec[7]],
                    base: rec[8],
                }
            })
            .collect())
    }
}

/// Decode an SCF file.
pub fn parse(buf: &[u8]) -> Result<SequenceModel> {
    let header = ScfHeader::from_buf(buf)?;

    if header.samples == 0 || header.bases == 0 {
        return Err(ChromatogramError::InvalidHeader(format!(
            "No samples or bases found. Samples: {}, bases: {}",
            header.samples, header.bases
        )));
    }
    if !matches!(header.sample_size, 1 | 2) {
        return Err(ChromatogramError::UnsupportedSampleWidth(header.sample_size));
    }

    debug!(
        "SCF version {:?}, {} samples of {} bytes, {} bases, clip {}..{}",
        String::from_utf8_lossy(&header.version),
        header.samples,
        header.sample_size,
        header.bases,
        header.bases_left_clip,
        header.bases_right_clip
    );

    let mut traces = Traces::default();
    for (i, channel) in CHANNEL_ORDER.into_iter().enumerate() {
        *traces.get_mut(channel) = read_channel(buf, &header, i)?;
    }

    let records = read_bases(buf, &header)?;
    let n = records.len();
    let samples = header.samples as usize;

    let mut base_calls = Vec::with_capacity(n);
    let mut quality = Vec::with_capacity(n);
    let mut peak_locations = Vec::with_capacity(n);

    for (i, rec) in records.iter().enumerate() {
        base_calls.push(rec.call());
        quality.push(rec.max_prob().min(MAX_QUALITY));

        if (rec.peak_index as usize) < samples {
            peak_locations.push(rec.peak_index);
        } else {
            peak_locations.push(interpolated_peak(i, n, samples));
        }
    }

    SequenceModel::new(
        ChromatogramFormat::Scf,
        base_calls,
        traces,
        quality,
        peak_locations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(samples: u32, bases: u32, version: &[u8; 4], sample_size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 128];
        buf[..4].copy_from_slice(b".scf");
        buf[4..8].copy_from_slice(&samples.to_be_bytes());
        buf[8..12].copy_from_slice(&128u32.to_be_bytes());
        buf[12..16].copy_from_slice(&bases.to_be_bytes());
        let bases_offset = 128u32.wrapping_add(samples.wrapping_mul(4 * sample_size));
        buf[24..28].copy_from_slice(&bases_offset.to_be_bytes());
        buf[36..40].copy_from_slice(version);
        buf[40..44].copy_from_slice(&sample_size.to_be_bytes());
        buf
    }

    #[test]
    fn version_parsing() {
        let mut h = ScfHeader::from_buf(&header(1, 1, b"3.00", 2)).unwrap();
        assert_eq!(h.version_number(), Some(3.0));
        assert!(h.is_columnar());

        h.version = *b"3.10";
        assert!(!h.is_columnar());

        h.version = *b"2\0\0\0";
        assert!(h.is_columnar());

        h.version = *b"????";
        assert_eq!(h.version_number(), None);
        assert!(!h.is_columnar());
    }

    #[test]
    fn call_from_probabilities() {
        let rec = |prob: [u8; 4], base: u8| BaseRecord {
            peak_index: 0,
            prob,
            base,
        };
        assert_eq!(rec([0, 0, 0, 0], b'g').call(), BaseCall::G);
        assert_eq!(rec([9, 0, 0, 0], b'R').call(), BaseCall::N);
        assert_eq!(rec([1, 5, 5, 2], 0).call(), BaseCall::C);
        assert_eq!(rec([3, 3, 3, 3], b'-').call(), BaseCall::A);
        assert_eq!(rec([0, 0, 0, 7], 0).call(), BaseCall::T);
        assert_eq!(rec([0, 0, 0, 0], 0).call(), BaseCall::N);
    }

    #[test]
    fn decodes_struct_layout() {
        let mut buf = header(3, 2, b"3.10", 1);
        // A: 1, 1, 1 decodes to 1, 3, 6. Other channels stay zero.
        buf.extend_from_slice(&[1, 1, 1]);
        buf.extend_from_slice(&[0; 9]);

        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[70, 0, 0, 0, b'a', 0, 0, 0, 0, 0, 0, 0]);
        buf.extend_from_slice(&99u32.to_be_bytes());
        buf.extend_from_slice(&[0, 0, 8, 0, 0]);

        let m = parse(&buf).unwrap();
        assert_eq!(m.file_format(), ChromatogramFormat::Scf);
        assert_eq!(m.traces().a, vec![1, 3, 6]);
        assert_eq!(m.traces().t, vec![0, 0, 0]);
        assert_eq!(m.sequence(), "AG");
        assert_eq!(m.quality(), &[60, 8]);
        // 99 is past the trace; round(1 * 3 / 2) = 2.
        assert_eq!(m.peak_locations(), &[2, 2]);
    }

    #[test]
    fn decodes_columnar_layout() {
        let mut buf = header(2, 2, b"3.00", 2);
        for ch in 0..4u16 {
            buf.extend_from_slice(&ch.to_be_bytes());
            buf.extend_from_slice(&0u16.to_be_bytes());
        }
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&[10, 0]); // prob A
        buf.extend_from_slice(&[0, 0]); // prob C
        buf.extend_from_slice(&[0, 30]); // prob G
        buf.extend_from_slice(&[0, 0]); // prob T
        buf.extend_from_slice(&[0, b'T']);

        let m = parse(&buf).unwrap();
        assert_eq!(m.traces().c, vec![1, 2]);
        assert_eq!(m.traces().g, vec![2, 4]);
        assert_eq!(m.sequence(), "AT");
        assert_eq!(m.quality(), &[10, 30]);
        assert_eq!(m.peak_locations(), &[0, 1]);
    }

    #[test]
    fn rejects_bad_headers() {
        assert!(matches!(
            parse(&header(0, 4, b"3.00", 2)),
            Err(ChromatogramError::InvalidHeader(_))
        ));
        assert!(matches!(
            parse(&header(4, 4, b"3.00", 3)),
            Err(ChromatogramError::UnsupportedSampleWidth(3))
        ));

        let mut buf = header(4, 4, b"3.00", 2);
        buf[0] = b'S';
        assert!(matches!(
            parse(&buf),
            Err(ChromatogramError::InvalidSignature { format: "SCF", .. })
        ));
    }

    #[test]
    fn huge_counts_are_truncation_not_allocation() {
        let buf = header(u32::MAX, u32::MAX, b"3.10", 2);
        assert!(parse(&buf).is_err());

        // Header declares samples that aren't there.
        let buf = header(1_000, 10, b"3.10", 1);
        assert!(matches!(parse(&buf), Err(ChromatogramError::Truncated { .. })));
    }
}
