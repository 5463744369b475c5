//! Engine configuration.
//!
//! One [`EngineConfig`] is built by the assembly root at start-up and handed
//! to the players. All fields are plain values so the struct stays `Copy`.

use platform::audio_types::{Amplitude, SampleRateHz, VolumePercent};

use crate::error::AudioError;
use crate::tone::Timbre;
use crate::transform::speed_in_range;

/// Which speaker hardware is fitted. Chosen once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeakerKind {
    /// I2S amplifier: full PCM playback.
    I2s,
    /// PWM-driven buzzer: tone playback only, PCM is approximated.
    Pwm,
}

impl SpeakerKind {
    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::I2s => "i2s",
            Self::Pwm => "pwm",
        }
    }
}

/// Tunables for synthesis, sequencing and streaming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Synthesis sample rate in Hz (8 000–48 000)
    pub sample_rate_hz: u32,
    /// Synthesis channel count (1 or 2)
    pub channels: u8,
    /// Peak synthesis amplitude at power-on
    pub amplitude: Amplitude,
    /// Instrument used until changed
    pub timbre: Timbre,
    /// Silence between consecutive notes of a melody
    pub note_gap_ms: u32,
    /// Silence between passes of a repeated melody
    pub repeat_gap_ms: u32,
    /// Upper bound on the fade-in/fade-out length
    pub fade_cap_ms: u32,
    /// How long a sink write may block
    pub write_timeout_ms: u32,
    /// Output volume applied by the sink
    pub sink_volume: VolumePercent,
    /// MP3 playback writes decoded PCM in chunks of this many bytes
    pub mp3_chunk_bytes: usize,
    /// WAV playback reads the file in chunks of this many bytes
    pub wav_chunk_bytes: usize,
    /// TTS playback speed factor (1.0 = unchanged)
    pub tts_speed: f32,
    /// Gain applied to TTS output
    pub tts_boost: f32,
    /// Fitted speaker
    pub speaker: SpeakerKind,
}

impl EngineConfig {
    /// Check the fields that have a restricted range.
    pub fn validate(&self) -> Result<(), AudioError> {
        SampleRateHz::new(self.sample_rate_hz)
            .map_err(|_| AudioError::InvalidParameter("sample rate out of range"))?;
        if !matches!(self.channels, 1 | 2) {
            return Err(AudioError::InvalidParameter("channels must be 1 or 2"));
        }
        if self.mp3_chunk_bytes < 2 || self.wav_chunk_bytes < 4 {
            return Err(AudioError::InvalidParameter("chunk size too small"));
        }
        if !speed_in_range(self.tts_speed) {
            return Err(AudioError::InvalidParameter("tts speed must be within 0.25..=4.0"));
        }
        Ok(())
    }

    /// Same configuration with a different speaker.
    #[must_use]
    pub const fn with_speaker(mut self, speaker: SpeakerKind) -> Self {
        self.speaker = speaker;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            channels: 1,
            amplitude: Amplitude::new(15_000),
            timbre: Timbre::Guitar,
            note_gap_ms: 50,
            repeat_gap_ms: 500,
            fade_cap_ms: 5,
            write_timeout_ms: 1_000,
            sink_volume: VolumePercent::FULL,
            mp3_chunk_bytes: 100 * 1024,
            wav_chunk_bytes: 4 * 1024,
            tts_speed: 1.0,
            tts_boost: 1.5,
            speaker: SpeakerKind::I2s,
        }
    }
}
