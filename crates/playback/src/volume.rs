//! Volume scaling and the shared voice settings.
//!
//! Two volume controls exist on the robot:
//! - the synthesis amplitude (0–32767), which sets how loud generated notes
//!   are rendered, and
//! - the sink volume (0–100 %), applied to every sample on its way to the
//!   speaker, including decoded files.
//!
//! [`VoiceSettings`] holds the first one together with the timbre. Other
//! tasks may change either at any time; the most recent write wins and the
//! next note picks it up.

use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use platform::audio_types::{Amplitude, VolumePercent};

use crate::tone::Timbre;

/// Scale one sample by `volume / 100`, clamped to `i16`.
///
/// ```text
/// out = sample * volume / 100
/// ```
///
/// | `volume` | Effect            |
/// |----------|-------------------|
/// | 0%       | silence           |
/// | 50%      | half amplitude    |
/// | 100%     | unchanged         |
pub fn scale_sample(sample: i16, volume: VolumePercent) -> i16 {
    // |sample| * 100 fits comfortably in i32
    #[allow(clippy::arithmetic_side_effects)]
    let scaled = i32::from(sample) * i32::from(volume.get()) / 100;
    #[allow(clippy::cast_possible_truncation)] // clamped to the i16 range
    let out = scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    out
}

/// Scale `src` into `dst` (cleared first).
pub fn scale_into(src: &[i16], volume: VolumePercent, dst: &mut alloc::vec::Vec<i16>) {
    dst.clear();
    if volume == VolumePercent::FULL {
        dst.extend_from_slice(src);
    } else {
        dst.extend(src.iter().map(|&s| scale_sample(s, volume)));
    }
}

/// Timbre and synthesis amplitude, shared between tasks.
#[derive(Debug)]
pub struct VoiceSettings {
    timbre: AtomicU8,
    amplitude: AtomicU16,
}

impl VoiceSettings {
    /// Create with initial values.
    pub const fn new(timbre: Timbre, amplitude: Amplitude) -> Self {
        Self {
            timbre: AtomicU8::new(timbre as u8),
            amplitude: AtomicU16::new(amplitude.get()),
        }
    }

    /// Current timbre.
    pub fn timbre(&self) -> Timbre {
        Timbre::from_u8(self.timbre.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Change the timbre for subsequent notes.
    pub fn set_timbre(&self, timbre: Timbre) {
        self.timbre.store(timbre as u8, Ordering::Relaxed);
        tracing::debug!("timbre set to {}", timbre.name());
    }

    /// Current synthesis amplitude.
    pub fn amplitude(&self) -> Amplitude {
        Amplitude::new(self.amplitude.load(Ordering::Relaxed))
    }

    /// Set the raw amplitude (clamped to 32767).
    pub fn set_amplitude(&self, raw: u16) {
        let amp = Amplitude::new(raw);
        self.amplitude.store(amp.get(), Ordering::Relaxed);
        tracing::debug!("amplitude set to {}", amp.get());
    }

    /// Set the amplitude from a 0–100 % volume (linear).
    pub fn set_volume(&self, volume: VolumePercent) {
        self.set_amplitude(Amplitude::from_volume(volume).get());
    }

    /// Amplitude expressed as 0–100 %.
    pub fn volume(&self) -> VolumePercent {
        self.amplitude().to_volume()
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::new(Timbre::Guitar, Amplitude::new(15_000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_sample_full_is_identity() {
        assert_eq!(scale_sample(i16::MIN, VolumePercent::FULL), i16::MIN);
        assert_eq!(scale_sample(1234, VolumePercent::FULL), 1234);
    }

    #[test]
    fn test_scale_sample_half() {
        assert_eq!(scale_sample(1000, VolumePercent::new(50)), 500);
        assert_eq!(scale_sample(-1001, VolumePercent::new(50)), -500);
    }

    #[test]
    fn test_scale_sample_mute() {
        assert_eq!(scale_sample(i16::MAX, VolumePercent::MUTE), 0);
    }

    #[test]
    fn test_voice_settings_last_writer_wins() {
        let voice = VoiceSettings::default();
        assert_eq!(voice.timbre(), Timbre::Guitar);
        voice.set_timbre(Timbre::Bell);
        voice.set_timbre(Timbre::Flute);
        assert_eq!(voice.timbre(), Timbre::Flute);
    }

    #[test]
    fn test_voice_amplitude_clamped() {
        let voice = VoiceSettings::default();
        voice.set_amplitude(60_000);
        assert_eq!(voice.amplitude().get(), 32_767);
        assert_eq!(voice.volume().get(), 100);
    }

    #[test]
    fn test_voice_volume_linear() {
        let voice = VoiceSettings::default();
        voice.set_volume(VolumePercent::new(0));
        assert_eq!(voice.amplitude().get(), 0);
        voice.set_volume(VolumePercent::new(100));
        assert_eq!(voice.amplitude().get(), 32_767);
    }
}
