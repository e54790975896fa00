use serde::Serialize;

/// An inclusive range, in 1-based indexing; this is how positions are shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RangeIncl {
    pub start: usize,
    pub end: usize,
}

impl RangeIncl {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns `None` if start is after end.
    pub fn len(&self) -> Option<usize> {
        if self.end < self.start {
            None
        } else {
            Some(self.end - self.start + 1)
        }
    }
}

/// Evenly spaced estimate of where base `i` of `n` peaks, in a trace of `trace_len` samples:
/// `round(i * trace_len / n)`, kept inside the trace.
pub fn interpolated_peak(i: usize, n: usize, trace_len: usize) -> u32 {
    if n == 0 || trace_len == 0 {
        return 0;
    }
    let (i, n, t) = (i as u64, n as u64, trace_len as u64);
    let rounded = (2 * i * t + n) / (2 * n);

    rounded.min(t - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_rounds_and_clamps() {
        assert_eq!(interpolated_peak(0, 4, 100), 0);
        assert_eq!(interpolated_peak(1, 4, 100), 25);
        assert_eq!(interpolated_peak(1, 3, 10), 3);
        assert_eq!(interpolated_peak(2, 3, 10), 7);
        // 9 * 4 / 10 = 3.6 -> 4, but the trace only has samples 0..=3.
        assert_eq!(interpolated_peak(9, 10, 4), 3);
        assert_eq!(interpolated_peak(5, 0, 100), 0);
    }

    #[test]
    fn range_len() {
        assert_eq!(RangeIncl::new(3, 5).len(), Some(3));
        assert_eq!(RangeIncl::new(5, 3).len(), None);
    }
}
