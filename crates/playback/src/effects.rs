//! Short sound-effect cues built from plain tones.
//!
//! Cues go through [`SampleSink::play_tone`], so they work on the PWM
//! buzzer as well as on the I2S amplifier.

use embedded_hal_async::delay::DelayNs;

use crate::error::AudioError;
use crate::sink::SampleSink;

/// One beep of a cue: frequency, length, then silence before the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CueStep {
    /// Pitch in Hz
    pub frequency_hz: u32,
    /// Tone length in ms
    pub duration_ms: u32,
    /// Silence after the tone in ms
    pub pause_ms: u32,
}

const fn step(frequency_hz: u32, duration_ms: u32, pause_ms: u32) -> CueStep {
    CueStep {
        frequency_hz,
        duration_ms,
        pause_ms,
    }
}

const BEEP: &[CueStep] = &[step(1000, 200, 0)];
const DOUBLE_BEEP: &[CueStep] = &[step(1000, 150, 100), step(1000, 150, 0)];
const CONFIRMATION: &[CueStep] = &[step(800, 150, 50), step(1200, 200, 0)];
const ERROR: &[CueStep] = &[step(400, 300, 100), step(300, 300, 0)];
const STARTUP: &[CueStep] = &[
    step(523, 200, 50),
    step(659, 200, 50),
    step(784, 200, 50),
    step(1047, 400, 0),
];
const NOTIFICATION: &[CueStep] = &[
    step(1000, 100, 50),
    step(1500, 100, 50),
    step(1000, 100, 0),
];

/// Named sound effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cue {
    /// Single 1 kHz beep
    Beep,
    /// Two short beeps
    DoubleBeep,
    /// Rising two-tone
    Confirmation,
    /// Falling two-tone
    Error,
    /// C-major arpeggio
    Startup,
    /// Up-and-down chirp
    Notification,
}

impl Cue {
    /// Every cue.
    pub const ALL: [Self; 6] = [
        Self::Beep,
        Self::DoubleBeep,
        Self::Confirmation,
        Self::Error,
        Self::Startup,
        Self::Notification,
    ];

    /// Tones making up this cue.
    pub const fn steps(self) -> &'static [CueStep] {
        match self {
            Self::Beep => BEEP,
            Self::DoubleBeep => DOUBLE_BEEP,
            Self::Confirmation => CONFIRMATION,
            Self::Error => ERROR,
            Self::Startup => STARTUP,
            Self::Notification => NOTIFICATION,
        }
    }

    /// Lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Beep => "beep",
            Self::DoubleBeep => "double_beep",
            Self::Confirmation => "confirmation",
            Self::Error => "error",
            Self::Startup => "startup",
            Self::Notification => "notification",
        }
    }

    /// Look a cue up by [`Cue::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Total time including pauses.
    pub fn duration_ms(self) -> u32 {
        self.steps()
            .iter()
            .fold(0u32, |acc, s| acc.saturating_add(s.duration_ms).saturating_add(s.pause_ms))
    }
}

/// Play `cue` on `sink` at the sink's own volume.
pub async fn play_cue<S: SampleSink, D: DelayNs>(
    sink: &mut S,
    delay: &mut D,
    cue: Cue,
) -> Result<(), AudioError> {
    tracing::debug!("cue: {}", cue.name());
    let volume = sink.volume();
    for s in cue.steps() {
        sink.play_tone(s.frequency_hz, s.duration_ms, volume).await?;
        if s.pause_ms > 0 {
            delay.delay_ms(s.pause_ms).await;
        }
    }
    Ok(())
}
