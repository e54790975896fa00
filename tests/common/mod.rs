#![allow(dead_code)]

//! Builders for synthetic AB1 and SCF files. Every fixture is assembled from code.

use chromatrace::file_io::delta_delta;

pub const HEADER_LEN: usize = 128;

/// ABIF element type codes we use.
pub const TYPE_CHAR: u16 = 2;
pub const TYPE_SHORT: u16 = 4;

pub struct Tag {
    pub name: [u8; 4],
    pub number: u32,
    pub el_type: u16,
    pub el_size: u16,
    pub data: Vec<u8>,
}

impl Tag {
    pub fn chars(name: &[u8; 4], number: u32, data: &[u8]) -> Self {
        Self {
            name: *name,
            number,
            el_type: TYPE_CHAR,
            el_size: 1,
            data: data.to_vec(),
        }
    }

    pub fn shorts(name: &[u8; 4], number: u32, vals: &[u16]) -> Self {
        Self {
            name: *name,
            number,
            el_type: TYPE_SHORT,
            el_size: 2,
            data: vals.iter().flat_map(|v| v.to_be_bytes()).collect(),
        }
    }

    fn num_elements(&self) -> u32 {
        (self.data.len() / self.el_size.max(1) as usize) as u32
    }
}

/// Header, then each tag's data, then the directory last, so any truncation cuts into it.
pub fn build_abif(tags: &[Tag]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN];
    buf[..4].copy_from_slice(b"ABIF");
    buf[4..6].copy_from_slice(&101u16.to_be_bytes());

    let mut dir = Vec::new();
    for tag in tags {
        let offset = buf.len() as u32;
        buf.extend_from_slice(&tag.data);

        dir.extend_from_slice(&tag.name);
        dir.extend_from_slice(&tag.number.to_be_bytes());
        dir.extend_from_slice(&tag.el_type.to_be_bytes());
        dir.extend_from_slice(&tag.el_size.to_be_bytes());
        dir.extend_from_slice(&tag.num_elements().to_be_bytes());
        dir.extend_from_slice(&(tag.data.len() as u32).to_be_bytes());
        dir.extend_from_slice(&offset.to_be_bytes());
        dir.extend_from_slice(&0u32.to_be_bytes());
    }

    let dir_offset = buf.len() as u32;
    buf.extend_from_slice(&dir);
    buf[18..22].copy_from_slice(&(tags.len() as u32).to_be_bytes());
    buf[26..30].copy_from_slice(&dir_offset.to_be_bytes());
    buf
}

/// A synthetic read with one peak per base, spaced `spacing` samples apart.
#[derive(Clone, Debug)]
pub struct Read {
    pub bases: String,
    pub spacing: usize,
}

impl Read {
    pub fn new(bases: &str, spacing: usize) -> Self {
        Self {
            bases: bases.to_owned(),
            spacing,
        }
    }

    pub fn trace_len(&self) -> usize {
        self.bases.len() * self.spacing + self.spacing
    }

    pub fn peaks(&self) -> Vec<u16> {
        (0..self.bases.len())
            .map(|i| ((i + 1) * self.spacing) as u16)
            .collect()
    }

    pub fn quality(&self) -> Vec<u8> {
        (0..self.bases.len()).map(|i| (10 + i * 7 % 50) as u8).collect()
    }

    /// The signal for one base letter: a bump at each peak of that base.
    pub fn channel(&self, letter: u8) -> Vec<u16> {
        let mut result = vec![0u16; self.trace_len()];
        for (i, b) in self.bases.bytes().enumerate() {
            if b != letter {
                continue;
            }
            let peak = (i + 1) * self.spacing;
            result[peak] = 1000;
            result[peak - 1] = 400;
            result[peak + 1] = 400;
        }
        result
    }

    /// As an AB1 file, with the default G, A, T, C channel order.
    pub fn to_abif(&self) -> Vec<u8> {
        build_abif(&[
            Tag::shorts(b"DATA", 9, &self.channel(b'G')),
            Tag::shorts(b"DATA", 10, &self.channel(b'A')),
            Tag::shorts(b"DATA", 11, &self.channel(b'T')),
            Tag::shorts(b"DATA", 12, &self.channel(b'C')),
            Tag::chars(b"PBAS", 1, self.bases.as_bytes()),
            Tag::chars(b"PCON", 1, &self.quality()),
            Tag::shorts(b"PLOC", 1, &self.peaks()),
        ])
    }

    /// As an SCF file. Versions below 3.10 get columnar base records.
    pub fn to_scf(&self, version: &[u8; 4], sample_size: u32) -> Vec<u8> {
        let channels: Vec<Vec<u16>> = [b'A', b'C', b'G', b'T']
            .iter()
            .map(|&l| {
                let mut ch = self.channel(l);
                if sample_size == 1 {
                    // Keep the bumps within a byte.
                    for v in &mut ch {
                        *v /= 8;
                    }
                }
                ch
            })
            .collect();

        let quality = self.quality();
        let records: Vec<BaseRecord> = self
            .bases
            .bytes()
            .zip(self.peaks())
            .zip(quality)
            .map(|((base, peak), q)| {
                let mut prob = [0u8; 4];
                let i = b"ACGT".iter().position(|&b| b == base).unwrap_or(0);
                prob[i] = q;
                BaseRecord {
                    peak: peak as u32,
                    prob,
                    base,
                }
            })
            .collect();

        build_scf(&channels, &records, version, sample_size)
    }
}

pub struct BaseRecord {
    pub peak: u32,
    /// A, C, G, T.
    pub prob: [u8; 4],
    pub base: u8,
}

/// `channels` are decoded samples in A, C, G, T order. Base records go last, with no trailing bytes.
pub fn build_scf(
    channels: &[Vec<u16>],
    records: &[BaseRecord],
    version: &[u8; 4],
    sample_size: u32,
) -> Vec<u8> {
    let samples = channels.first().map(|c| c.len()).unwrap_or(0);
    let columnar = version < b"3.10";

    let mut buf = vec![0u8; HEADER_LEN];
    buf[..4].copy_from_slice(b".scf");
    buf[4..8].copy_from_slice(&(samples as u32).to_be_bytes());
    buf[8..12].copy_from_slice(&(HEADER_LEN as u32).to_be_bytes());
    buf[12..16].copy_from_slice(&(records.len() as u32).to_be_bytes());
    buf[20..24].copy_from_slice(&(records.len() as u32).to_be_bytes());
    buf[36..40].copy_from_slice(version);
    buf[40..44].copy_from_slice(&sample_size.to_be_bytes());

    for channel in channels {
        for v in delta_delta::encode(channel, sample_size) {
            if sample_size == 1 {
                buf.push(v as u8);
            } else {
                buf.extend_from_slice(&v.to_be_bytes());
            }
        }
    }

    let bases_offset = buf.len() as u32;
    buf[24..28].copy_from_slice(&bases_offset.to_be_bytes());

    if columnar {
        for r in records {
            buf.extend_from_slice(&r.peak.to_be_bytes());
        }
        for ch in 0..4 {
            for r in records {
                buf.push(r.prob[ch]);
            }
        }
        for r in records {
            buf.push(r.base);
        }
    } else {
        for r in records {
            buf.extend_from_slice(&r.peak.to_be_bytes());
            buf.extend_from_slice(&r.prob);
            buf.push(r.base);
            buf.extend_from_slice(&[0; 7]);
        }
    }

    buf
}

/// The length and alignment properties every decoded model must have.
pub fn assert_aligned(model: &chromatrace::SequenceModel) {
    let n = model.sequence_length();
    assert_eq!(model.base_calls().len(), n);
    assert_eq!(model.sequence().len(), n);
    assert_eq!(model.quality().len(), n);
    assert_eq!(model.peak_locations().len(), n);

    let t = model.traces();
    let len = t.a.len();
    assert_eq!(t.t.len(), len);
    assert_eq!(t.g.len(), len);
    assert_eq!(t.c.len(), len);
    assert_eq!(model.trace_len(), len);
}
