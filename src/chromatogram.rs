//! The decoded chromatogram: base calls, per-base quality and peak positions, and the four raw
//! trace channels. Both the AB1 and SCF decoders produce this type; all analysis consumes it.

use std::fmt;

use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use tracing::warn;

use crate::{
    error::{ChromatogramError, Result},
    sequence::{base_calls_to_str, BaseCall},
    util::RangeIncl,
};

/// Quality values are clamped to this.
pub const MAX_QUALITY: u8 = 60;

/// Qualities below this are flagged as low. Matches the viewer's default slider position.
pub const DEFAULT_QUALITY_THRESHOLD: u8 = 20;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum ChromatogramFormat {
    #[serde(rename = "AB1")]
    Ab1,
    #[serde(rename = "SCF")]
    Scf,
}

impl ChromatogramFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ab1 => "AB1",
            Self::Scf => "SCF",
        }
    }
}

impl fmt::Display for ChromatogramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One of the four dye channels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter)]
pub enum Channel {
    A,
    T,
    G,
    C,
}

impl Channel {
    pub fn from_u8_letter(val: u8) -> Option<Self> {
        match val {
            b'A' => Some(Self::A),
            b'T' => Some(Self::T),
            b'G' => Some(Self::G),
            b'C' => Some(Self::C),
            _ => None,
        }
    }

    /// The channel that carries the complementary base's signal.
    pub fn complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::T => Self::A,
            Self::G => Self::C,
            Self::C => Self::G,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            Self::A => "A",
            Self::T => "T",
            Self::G => "G",
            Self::C => "C",
        };
        write!(f, "{v}")
    }
}

/// Raw intensity samples for each channel. These are the full instrument signal, not trimmed
/// to the called bases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Traces {
    pub a: Vec<u16>,
    pub t: Vec<u16>,
    pub g: Vec<u16>,
    pub c: Vec<u16>,
}

impl Traces {
    pub fn get(&self, channel: Channel) -> &[u16] {
        match channel {
            Channel::A => &self.a,
            Channel::T => &self.t,
            Channel::G => &self.g,
            Channel::C => &self.c,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut Vec<u16> {
        match channel {
            Channel::A => &mut self.a,
            Channel::T => &mut self.t,
            Channel::G => &mut self.g,
            Channel::C => &mut self.c,
        }
    }

    pub fn max_len(&self) -> usize {
        Channel::iter().map(|ch| self.get(ch).len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.max_len() == 0
    }

    /// Zero-pad every channel to the longest one, so all four share a length.
    fn pad_to_max(&mut self) {
        let len = self.max_len();
        for ch in Channel::iter() {
            let data = self.get_mut(ch);
            if data.len() < len {
                warn!("Padding trace channel {ch} from {} to {len} samples", data.len());
                data.resize(len, 0);
            }
        }
    }
}

/// A decoded chromatogram. Array lengths and alignment are fixed at construction; base calls may
/// be edited afterwards via `set_base_call`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceModel {
    sequence: String,
    base_calls: Vec<BaseCall>,
    traces: Traces,
    quality: Vec<u8>,
    /// Index into the trace samples of each base's peak.
    peak_locations: Vec<u32>,
    file_format: ChromatogramFormat,
    sequence_length: usize,
}

impl SequenceModel {
    /// Assemble a model from decoded parts. Rejects empty traces, then empty base calls, and pads
    /// the trace channels to a common length. Peaks may not lie past the trace end. Quality is
    /// clamped to `MAX_QUALITY`.
    pub fn new(
        file_format: ChromatogramFormat,
        base_calls: Vec<BaseCall>,
        mut traces: Traces,
        mut quality: Vec<u8>,
        peak_locations: Vec<u32>,
    ) -> Result<Self> {
        if traces.is_empty() {
            return Err(ChromatogramError::NoTraceData(file_format.name()));
        }
        if base_calls.is_empty() {
            return Err(ChromatogramError::NoBaseCalls(file_format.name()));
        }

        let n = base_calls.len();
        if quality.len() != n || peak_locations.len() != n {
            return Err(ChromatogramError::InvalidHeader(format!(
                "Misaligned base data: {n} calls, {} quality values, {} peaks",
                quality.len(),
                peak_locations.len()
            )));
        }

        traces.pad_to_max();
        let trace_len = traces.max_len();
        if let Some(p) = peak_locations.iter().find(|&&p| p as usize > trace_len) {
            return Err(ChromatogramError::InvalidHeader(format!(
                "Peak location {p} is past the trace end ({trace_len} samples)"
            )));
        }

        for q in &mut quality {
            *q = (*q).min(MAX_QUALITY);
        }

        Ok(Self {
            sequence: base_calls_to_str(&base_calls),
            sequence_length: n,
            base_calls,
            traces,
            quality,
            peak_locations,
            file_format,
        })
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn base_calls(&self) -> &[BaseCall] {
        &self.base_calls
    }

    pub fn traces(&self) -> &Traces {
        &self.traces
    }

    pub fn quality(&self) -> &[u8] {
        &self.quality
    }

    pub fn peak_locations(&self) -> &[u32] {
        &self.peak_locations
    }

    pub fn file_format(&self) -> ChromatogramFormat {
        self.file_format
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn trace_len(&self) -> usize {
        self.traces.max_len()
    }

    pub fn mean_quality(&self) -> f32 {
        if self.quality.is_empty() {
            return 0.;
        }
        self.quality.iter().map(|&q| q as f32).sum::<f32>() / self.quality.len() as f32
    }

    /// Overwrite one called base, keeping `sequence` in sync. Returns the previous call, or `None`
    /// if the index is out of range.
    pub fn set_base_call(&mut self, index: usize, base: BaseCall) -> Option<BaseCall> {
        let slot = self.base_calls.get_mut(index)?;
        let prev = *slot;
        *slot = base;

        // Single-byte ASCII symbols; positions in `sequence` match indices in `base_calls`.
        let mut buf = [0u8; 1];
        self.sequence
            .replace_range(index..index + 1, base.as_char().encode_utf8(&mut buf));

        Some(prev)
    }

    /// The called bases within a 1-based inclusive range.
    pub fn region(&self, range: RangeIncl) -> Option<&str> {
        let len = range.len()?;
        if range.start < 1 || range.end > self.sequence_length {
            return None;
        }
        let start = range.start - 1;
        Some(&self.sequence[start..start + len])
    }

    /// Indices of bases whose quality is below `threshold`.
    pub fn low_quality_positions(&self, threshold: u8) -> Vec<usize> {
        self.quality
            .iter()
            .enumerate()
            .filter(|(_, &q)| q < threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// The base whose peak is closest to a trace sample position, if any is within `max_distance`
    /// samples. Ties go to the lower index.
    pub fn nearest_base(&self, sample: u32, max_distance: u32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;

        for (i, &peak) in self.peak_locations.iter().enumerate() {
            let dist = peak.abs_diff(sample);
            if dist > max_distance {
                continue;
            }
            match best {
                Some((_, d)) if d <= dist => (),
                _ => best = Some((i, dist)),
            }
        }

        best.map(|(i, _)| i)
    }

    /// Reverse-complement the whole chromatogram. Base calls are reversed and complemented,
    /// channels swap with their complement and reverse, and peak positions are mirrored about
    /// the trace length. Applying this twice gives back the original.
    pub fn reverse_complement(&self) -> Self {
        let trace_len = self.trace_len() as u32;

        let base_calls: Vec<BaseCall> =
            self.base_calls.iter().rev().map(|b| b.complement()).collect();

        let mut traces = Traces::default();
        for ch in Channel::iter() {
            *traces.get_mut(ch) = self.traces.get(ch.complement()).iter().rev().copied().collect();
        }

        let quality = self.quality.iter().rev().copied().collect();

        let peak_locations = self
            .peak_locations
            .iter()
            .rev()
            .map(|&p| trace_len - p)
            .collect();

        Self {
            sequence: base_calls_to_str(&base_calls),
            sequence_length: self.sequence_length,
            base_calls,
            traces,
            quality,
            peak_locations,
            file_format: self.file_format,
        }
    }

    pub fn to_fasta(&self, header: &str) -> String {
        to_fasta(header, &self.sequence)
    }
}

/// FASTA text with the whole sequence on one line, and no trailing newline.
pub fn to_fasta(header: &str, sequence: &str) -> String {
    format!(">{header}\n{sequence}")
}

/// Gaussian-weighted moving average over `window` samples, used to reduce trace noise for display.
/// The first and last `window / 2` samples are passed through unchanged, as is everything when
/// `window < 2`.
pub fn smooth_trace(data: &[u16], window: usize) -> Vec<f32> {
    let mut result: Vec<f32> = data.iter().map(|&v| v as f32).collect();

    let half = window / 2;
    // Windows below 2 have no neighbours to average.
    if half == 0 || data.len() <= 2 * half {
        return result;
    }

    let sigma = half as f32 / 2.;
    let weights: Vec<f32> = (-(half as isize)..=half as isize)
        .map(|j| (-((j * j) as f32) / (2. * sigma * sigma)).exp())
        .collect();
    let weight_sum: f32 = weights.iter().sum();

    for i in half..data.len() - half {
        let sum: f32 = data[i - half..=i + half]
            .iter()
            .zip(&weights)
            .map(|(&v, w)| v as f32 * w)
            .sum();
        result[i] = sum / weight_sum;
    }

    result
}
