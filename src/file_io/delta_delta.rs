//! SCF trace samples are stored as second differences. Decoding integrates twice, wrapping at the
//! sample width exactly as unsigned arithmetic does.
//!
//! [SCF format, section on sample data](https://staden.sourceforge.net/manual/formats_unix_3.html)

/// Modulus for a sample width in bytes: 256 for 1, 65536 for 2.
pub fn modulus(sample_width: u32) -> u32 {
    if sample_width == 1 {
        1 << 8
    } else {
        1 << 16
    }
}

/// One pass of modular cumulative summation, in place.
fn integrate(samples: &mut [u32], modulus: u32) {
    let mut prev = 0;
    for val in samples.iter_mut() {
        *val = (*val + prev) % modulus;
        prev = *val;
    }
}

/// One pass of modular differencing, in place. The inverse of `integrate`.
fn differentiate(samples: &mut [u32], modulus: u32) {
    let mut prev = 0;
    for val in samples.iter_mut() {
        let current = *val;
        *val = (current + modulus - prev) % modulus;
        prev = current;
    }
}

/// Decode raw delta-delta samples. Inputs must be below `modulus`, which holds for anything read
/// from a 1 or 2-byte field.
pub fn decode(raw: &[u16], sample_width: u32) -> Vec<u16> {
    let modulus = modulus(sample_width);

    let mut result: Vec<u32> = raw.iter().map(|&v| v as u32 % modulus).collect();
    integrate(&mut result, modulus);
    integrate(&mut result, modulus);

    result.into_iter().map(|v| v as u16).collect()
}

/// Encode samples as delta-deltas. Not used for decoding; it lets us build SCF data to check the
/// decoder against.
pub fn encode(samples: &[u16], sample_width: u32) -> Vec<u16> {
    let modulus = modulus(sample_width);

    let mut result: Vec<u32> = samples.iter().map(|&v| v as u32 % modulus).collect();
    differentiate(&mut result, modulus);
    differentiate(&mut result, modulus);

    result.into_iter().map(|v| v as u16).collect()
}
