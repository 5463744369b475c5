//! PCM post-processing: channel conversion, speed adjustment, gain.
//!
//! Used on TTS output (mono → stereo → speed → boost) and on microphone
//! input (32-bit → 16-bit, stereo → mono).

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use alloc::vec::Vec;

use crate::error::AudioError;
use crate::waveform::to_i16;

/// Fixed gain applied to TTS audio.
pub const TTS_BOOST: f32 = 1.5;

/// Slowest accepted playback speed.
pub const MIN_SPEED: f32 = 0.25;
/// Fastest accepted playback speed.
pub const MAX_SPEED: f32 = 4.0;

/// `speed` lies in `MIN_SPEED..=MAX_SPEED`; NaN is rejected.
pub fn speed_in_range(speed: f32) -> bool {
    (MIN_SPEED..=MAX_SPEED).contains(&speed)
}

fn reserve(n: usize) -> Result<Vec<i16>, AudioError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| AudioError::OutOfMemory)?;
    Ok(v)
}

/// Duplicate each mono sample into a left/right pair.
pub fn mono_to_stereo(mono: &[i16]) -> Result<Vec<i16>, AudioError> {
    let mut out = reserve(mono.len() * 2)?;
    for &s in mono {
        out.push(s);
        out.push(s);
    }
    Ok(out)
}

/// Average each left/right pair into one sample.
pub fn stereo_to_mono(stereo: &[i16]) -> Result<Vec<i16>, AudioError> {
    if stereo.len() % 2 != 0 {
        return Err(AudioError::InvalidParameter("stereo buffer has odd length"));
    }
    let mut out = reserve(stereo.len() / 2)?;
    out.extend(stereo.chunks_exact(2).map(|pair| match pair {
        [l, r] => ((i32::from(*l) + i32::from(*r)) / 2) as i16,
        _ => 0,
    }));
    Ok(out)
}

/// Keep the upper 16 bits of a left-justified 32-bit sample.
pub const fn i32_to_i16(sample: i32) -> i16 {
    (sample >> 16) as i16
}

/// Nearest-neighbour resample of interleaved stereo PCM.
///
/// `speed > 1.0` shortens the audio, `speed < 1.0` stretches it. Output
/// frame `i` is input frame `floor(i * speed)`.
pub fn apply_speed_adjustment(stereo: &[i16], speed: f32) -> Result<Vec<i16>, AudioError> {
    if !speed_in_range(speed) {
        return Err(AudioError::InvalidParameter("speed must be within 0.25..=4.0"));
    }
    if stereo.len() % 2 != 0 {
        return Err(AudioError::InvalidParameter("stereo buffer has odd length"));
    }
    let frames_in = stereo.len() / 2;
    if frames_in == 0 {
        return Ok(Vec::new());
    }
    let frames_out = (frames_in as f32 / speed) as usize;
    let mut out = reserve(frames_out.checked_mul(2).ok_or(AudioError::OutOfMemory)?)?;
    for i in 0..frames_out {
        let src = ((i as f32 * speed) as usize).min(frames_in - 1);
        let pair = stereo.get(src * 2..src * 2 + 2).unwrap_or(&[0, 0]);
        out.extend_from_slice(pair);
    }
    Ok(out)
}

/// Multiply every sample by `gain`, clamping to `i16`.
pub fn boost(samples: &mut [i16], gain: f32) {
    for s in samples {
        *s = to_i16(f32::from(*s) * gain);
    }
}

/// Prepare mono TTS output for the speaker: stereo, speed, boost.
pub fn render_tts(mono: &[i16], speed: f32, gain: f32) -> Result<Vec<i16>, AudioError> {
    if mono.is_empty() {
        return Err(AudioError::InvalidParameter("empty tts buffer"));
    }
    let stereo = mono_to_stereo(mono)?;
    let mut out = if (speed - 1.0).abs() < f32::EPSILON {
        stereo
    } else {
        apply_speed_adjustment(&stereo, speed)?
    };
    boost(&mut out, gain);
    Ok(out)
}
