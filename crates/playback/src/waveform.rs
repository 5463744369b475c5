//! Waveform synthesis for the note engine.
//!
//! [`PcmBuffer::for_duration`] is the only place that allocates. The fill
//! routine writes into an existing buffer so it can run on a task with a
//! tight heap budget once the buffer is in hand.

// Sample math is bounded by explicit clamps before every narrowing cast.
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use alloc::vec::Vec;
use core::f32::consts::TAU;

use platform::audio_types::Amplitude;

use crate::error::AudioError;
use crate::tone::Timbre;

/// Owned interleaved 16-bit PCM.
///
/// The sample count is always a multiple of the channel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
    channels: u8,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Zero-filled buffer holding `duration_ms` of audio.
    ///
    /// Length is `duration_ms * sample_rate / 1000 * channels`.
    pub fn for_duration(duration_ms: u32, sample_rate: u32, channels: u8) -> Result<Self, AudioError> {
        if channels == 0 {
            return Err(AudioError::InvalidParameter("channel count must be non-zero"));
        }
        let frames = u64::from(duration_ms) * u64::from(sample_rate) / 1000;
        let total = usize::try_from(frames * u64::from(channels))
            .map_err(|_| AudioError::OutOfMemory)?;
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(total)
            .map_err(|_| AudioError::OutOfMemory)?;
        samples.resize(total, 0);
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Wrap existing interleaved samples.
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32, channels: u8) -> Result<Self, AudioError> {
        if channels == 0 || samples.len() % usize::from(channels) != 0 {
            return Err(AudioError::InvalidParameter(
                "sample count must be a multiple of channels",
            ));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Interleaved samples, mutable.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Total sample count (all channels).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Channel count.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playing time in milliseconds, rounded down.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Give up the samples.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

/// Periodic PCM generator for one timbre at one amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformGenerator {
    timbre: Timbre,
    amplitude: Amplitude,
}

impl WaveformGenerator {
    /// Create a generator.
    pub const fn new(timbre: Timbre, amplitude: Amplitude) -> Self {
        Self { timbre, amplitude }
    }

    /// Timbre in use.
    pub const fn timbre(&self) -> Timbre {
        self.timbre
    }

    /// Amplitude in use.
    pub const fn amplitude(&self) -> Amplitude {
        self.amplitude
    }

    /// Allocate and fill a buffer for one tone.
    pub fn synthesize(
        &self,
        frequency_hz: u16,
        duration_ms: u32,
        sample_rate: u32,
        channels: u8,
    ) -> Result<PcmBuffer, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidParameter("sample rate must be non-zero"));
        }
        let mut buffer = PcmBuffer::for_duration(duration_ms, sample_rate, channels)?;
        self.fill(frequency_hz, &mut buffer);
        Ok(buffer)
    }

    /// Overwrite `buffer` with this timbre at `frequency_hz`.
    ///
    /// Every channel slot of a frame receives the same value. A frequency of
    /// zero produces silence.
    pub fn fill(&self, frequency_hz: u16, buffer: &mut PcmBuffer) {
        let channels = usize::from(buffer.channels.max(1));
        let rate = buffer.sample_rate;
        if frequency_hz == 0 || rate == 0 {
            buffer.samples.fill(0);
            return;
        }

        let freq = f32::from(frequency_hz);
        let rate_f = rate as f32;
        let amp = f32::from(self.amplitude.get());
        let step = TAU * freq / rate_f;
        let samples_per_cycle = (rate / u32::from(frequency_hz)).max(1) as usize;

        let mut osc = Oscillator::default();
        for (i, frame) in buffer.samples.chunks_exact_mut(channels).enumerate() {
            let t = i as f32 / rate_f;
            let value = match self.timbre {
                Timbre::Sine => libm::sinf(osc.phase),
                Timbre::Guitar => {
                    let p = osc.phase;
                    libm::expf(-3.0 * t)
                        * (libm::sinf(p) + 0.3 * libm::sinf(2.0 * p) + 0.1 * libm::sinf(3.0 * p))
                }
                Timbre::Organ => {
                    let p = osc.phase;
                    (libm::sinf(p)
                        + 0.5 * libm::sinf(2.0 * p)
                        + 0.25 * libm::sinf(3.0 * p)
                        + 0.125 * libm::sinf(4.0 * p))
                        * 0.6
                }
                Timbre::Flute => libm::sinf(osc.phase) * 0.8,
                Timbre::Bell => {
                    libm::expf(-1.5 * t)
                        * (libm::sinf(osc.phase)
                            + 0.6 * libm::sinf(osc.partials[0])
                            + 0.4 * libm::sinf(osc.partials[1])
                            + 0.25 * libm::sinf(osc.partials[2]))
                        * 0.7
                }
                Timbre::Square => {
                    if i % samples_per_cycle < samples_per_cycle / 2 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Timbre::Sawtooth => {
                    2.0 * (i % samples_per_cycle) as f32 / samples_per_cycle as f32 - 1.0
                }
                Timbre::Triangle => {
                    let pos = (i % samples_per_cycle) as f32 / samples_per_cycle as f32;
                    if pos < 0.5 {
                        4.0 * pos - 1.0
                    } else {
                        3.0 - 4.0 * pos
                    }
                }
            };
            frame.fill(to_i16(amp * value));

            let this_step = if self.timbre == Timbre::Flute {
                // 2 % vibrato at 5 Hz
                step * (1.0 + 0.02 * libm::sinf(TAU * 5.0 * t))
            } else {
                step
            };
            osc.advance(this_step, self.timbre == Timbre::Bell);
        }
    }
}

/// Bell partial ratios above the fundamental.
const BELL_RATIOS: [f32; 3] = [2.76, 5.40, 8.93];

/// Phase accumulators, each kept in `[0, 2π)`.
#[derive(Default)]
struct Oscillator {
    phase: f32,
    partials: [f32; 3],
}

impl Oscillator {
    fn advance(&mut self, step: f32, with_partials: bool) {
        self.phase = wrap(self.phase + step);
        if with_partials {
            for (p, ratio) in self.partials.iter_mut().zip(BELL_RATIOS) {
                *p = wrap(*p + step * ratio);
            }
        }
    }
}

fn wrap(phase: f32) -> f32 {
    let p = libm::fmodf(phase, TAU);
    if p < 0.0 {
        p + TAU
    } else {
        p
    }
}

/// Round toward zero and clamp to the `i16` range.
pub(crate) fn to_i16(value: f32) -> i16 {
    value.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}
