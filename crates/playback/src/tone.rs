//! Tones, pitch constants and timbres.

/// A single note: frequency and length. `frequency_hz == 0` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tone {
    /// Pitch in Hz; 0 is silence
    pub frequency_hz: u16,
    /// Length in milliseconds
    pub duration_ms: u32,
}

impl Tone {
    /// Create a tone.
    pub const fn new(frequency_hz: u16, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    /// Silence of the given length.
    pub const fn rest(duration_ms: u32) -> Self {
        Self::new(pitch::REST, duration_ms)
    }

    /// True for a rest.
    pub const fn is_rest(&self) -> bool {
        self.frequency_hz == pitch::REST
    }
}

/// Equal-tempered pitches, rounded to whole Hz.
pub mod pitch {
    #![allow(missing_docs)]

    pub const C3: u16 = 131;
    pub const D3: u16 = 147;
    pub const E3: u16 = 165;
    pub const F3: u16 = 175;
    pub const G3: u16 = 196;
    pub const A3: u16 = 220;
    pub const B3: u16 = 247;

    pub const C4: u16 = 262;
    pub const D4: u16 = 294;
    pub const E4: u16 = 330;
    pub const F4: u16 = 349;
    pub const G4: u16 = 392;
    pub const A4: u16 = 440;
    pub const B4: u16 = 494;

    pub const C5: u16 = 523;
    pub const D5: u16 = 587;
    pub const E5: u16 = 659;
    pub const F5: u16 = 698;
    pub const G5: u16 = 784;
    pub const A5: u16 = 880;
    pub const B5: u16 = 988;

    /// Silence
    pub const REST: u16 = 0;
}

/// Standard note lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NoteLength {
    /// 1 s
    Whole,
    /// 500 ms
    Half,
    /// 250 ms
    Quarter,
    /// 125 ms
    Eighth,
    /// 62 ms
    Sixteenth,
}

impl NoteLength {
    /// Length in milliseconds.
    pub const fn ms(self) -> u32 {
        match self {
            Self::Whole => 1000,
            Self::Half => 500,
            Self::Quarter => 250,
            Self::Eighth => 125,
            Self::Sixteenth => 62,
        }
    }
}

/// Instrument voice used by the waveform generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timbre {
    /// Pure sine
    Sine = 0,
    /// Plucked string: three harmonics with exponential decay
    Guitar,
    /// Four harmonics, no decay
    Organ,
    /// Sine with 5 Hz vibrato
    Flute,
    /// Inharmonic partials with a long decay
    Bell,
    /// Square wave
    Square,
    /// Rising ramp
    Sawtooth,
    /// Triangle wave
    Triangle,
}

impl Timbre {
    /// Every timbre, in discriminant order.
    pub const ALL: [Self; 8] = [
        Self::Sine,
        Self::Guitar,
        Self::Organ,
        Self::Flute,
        Self::Bell,
        Self::Square,
        Self::Sawtooth,
        Self::Triangle,
    ];

    /// Display name for logs and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sine => "Sine",
            Self::Guitar => "Guitar",
            Self::Organ => "Organ",
            Self::Flute => "Flute",
            Self::Bell => "Bell",
            Self::Square => "Square",
            Self::Sawtooth => "Sawtooth",
            Self::Triangle => "Triangle",
        }
    }

    /// Inverse of `timbre as u8`.
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| *t as u8 == raw)
    }

    /// Case-insensitive lookup by [`Timbre::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

impl Default for Timbre {
    fn default() -> Self {
        Self::Guitar
    }
}
