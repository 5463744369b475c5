//! Linear fade-in / fade-out to suppress clicks at note boundaries.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use crate::waveform::PcmBuffer;

/// Fade length in samples: `min(total / 20, cap_ms worth of samples)`.
pub fn fade_len(total_samples: usize, sample_rate: u32, channels: u8, cap_ms: u32) -> usize {
    let cap_frames = u64::from(sample_rate) * u64::from(cap_ms) / 1000;
    let cap = usize::try_from(cap_frames)
        .unwrap_or(usize::MAX)
        .saturating_mul(usize::from(channels));
    (total_samples / 20).min(cap)
}

/// Ramp the first `fade_in` samples from 0 to 1 and the last `fade_out`
/// samples from 1 to 0. Both lengths are clamped to the slice length.
///
/// Integer gains truncate toward zero, so no sample grows in magnitude.
pub fn apply_fade(samples: &mut [i16], fade_in: usize, fade_out: usize) {
    let n = samples.len();
    let fade_in = fade_in.min(n);
    let fade_out = fade_out.min(n);

    if fade_in > 0 {
        for (i, s) in samples.iter_mut().take(fade_in).enumerate() {
            *s = scale(*s, i, fade_in);
        }
    }
    if fade_out > 0 {
        let start = n - fade_out;
        for (i, s) in samples.iter_mut().enumerate().skip(start) {
            *s = scale(*s, n - i, fade_out);
        }
    }
}

/// Apply the standard envelope to a synthesized buffer.
pub fn shape(buffer: &mut PcmBuffer, cap_ms: u32) {
    let len = fade_len(buffer.len(), buffer.sample_rate(), buffer.channels(), cap_ms);
    apply_fade(buffer.samples_mut(), len, len);
}

fn scale(sample: i16, num: usize, den: usize) -> i16 {
    let v = i64::from(sample) * num as i64 / den as i64;
    v as i16
}
