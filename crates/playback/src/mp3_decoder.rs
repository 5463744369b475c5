//! nanomp3-based MP3 frame decoder.
//!
//! Implements the `FrameDecoder` trait using the `nanomp3` crate, a
//! pure-Rust `no_std` translation of minimp3.
//!
//! # Feature flag
//!
//! The `nanomp3` dependency and the real decode path are both gated behind the
//! `mp3` feature so the crate builds for targets that only play WAV and
//! synthesized notes.

use crate::decoder::{DecodeError, FrameDecoder, PcmFrame};

/// MP3 frame decoder backed by nanomp3.
///
/// `nanomp3::Decoder` has no internal buffering; callers must provide the
/// bytes starting at (or shortly before) a frame on each call.
pub struct NanoMp3Decoder {
    sample_rate: u32,
    channels: u8,
    #[cfg(feature = "mp3")]
    inner: nanomp3::Decoder,
}

impl NanoMp3Decoder {
    /// Create a new MP3 decoder.
    ///
    /// `sample_rate` and `channels` are zero until the first successful frame
    /// decode, at which point they are updated from the frame.
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            channels: 0,
            #[cfg(feature = "mp3")]
            inner: nanomp3::Decoder::new(),
        }
    }
}

impl Default for NanoMp3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for NanoMp3Decoder {
    /// Decode one MP3 frame from `input` into `output`.
    ///
    /// `nanomp3::Decoder::decode(mp3, pcm) -> (bytes_consumed, Option<FrameInfo>)`
    ///
    /// - `(n, Some(info))`: one frame decoded, `info.samples_produced` per
    ///   channel written to `pcm` as interleaved f32 in `[-1.0, 1.0]`.
    /// - `(n > 0, None)`: bytes skipped without producing audio.
    /// - `(0, None)`: not enough input for a frame.
    fn decode_frame(&mut self, input: &[u8], output: &mut PcmFrame) -> Result<usize, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::EndOfStream);
        }

        #[cfg(feature = "mp3")]
        {
            // 2304 f32 = 9 216 bytes of stack
            let mut pcm_buf = [0.0f32; nanomp3::MAX_SAMPLES_PER_FRAME];
            let (consumed, info) = self.inner.decode(input, &mut pcm_buf);

            let Some(info) = info else {
                return Err(if consumed == 0 {
                    DecodeError::Underflow
                } else {
                    DecodeError::InvalidData
                });
            };

            #[allow(clippy::cast_possible_truncation)] // 1 or 2
            let channels = info.channels.num() as u8;
            self.sample_rate = info.sample_rate;
            self.channels = channels;

            let total = info
                .samples_produced
                .saturating_mul(usize::from(channels))
                .min(output.samples.len());
            for (dst, &src) in output.samples.iter_mut().zip(pcm_buf.iter()).take(total) {
                *dst = crate::waveform::to_i16(src.clamp(-1.0, 1.0) * f32::from(i16::MAX));
            }
            output.len = total;
            output.sample_rate = info.sample_rate;
            output.channels = channels;
            Ok(consumed.max(1))
        }

        #[cfg(not(feature = "mp3"))]
        {
            let _ = output;
            Err(DecodeError::UnsupportedFormat)
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u8 {
        self.channels
    }
}
