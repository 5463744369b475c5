//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `VolumePercent`: clamps 0–100, prevents overdriving the sample scaler
//! - `Amplitude`: synthesis peak level, 0–32767, derived from VolumePercent
//! - `SampleRateHz`: validates the 8000–48000 Hz range the I2S peripheral accepts

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "value {} outside [{}, {}]",
            self.value, self.min, self.max
        )
    }
}

// ── VolumePercent ────────────────────────────────────────────────────────────

/// Volume as a percentage, clamped to 0–100.
///
/// Wraps a `u8` with the invariant `0 <= value <= 100`.
/// Construct with [`VolumePercent::new`] (clamping) or
/// [`VolumePercent::try_new`] (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumePercent(u8);

impl VolumePercent {
    /// Full scale: samples pass through unchanged.
    pub const FULL: Self = Self(100);

    /// Silence.
    pub const MUTE: Self = Self(0);

    /// Create a `VolumePercent`, clamping values above 100 to 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    /// Create a `VolumePercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the inner volume value (0–100).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for VolumePercent {
    fn default() -> Self {
        Self(50)
    }
}

// ── Amplitude ────────────────────────────────────────────────────────────────

/// Peak synthesis amplitude, 0–32767 (the positive `i16` range).
///
/// The waveform generator multiplies its unit-range oscillator output by this
/// value, so it doubles as the per-player "note volume".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Amplitude(u16);

impl Amplitude {
    /// Largest representable amplitude.
    pub const MAX: Self = Self(i16::MAX as u16);

    /// Create an `Amplitude`, clamping values above 32767.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        if raw > Self::MAX.0 {
            Self::MAX
        } else {
            Self(raw)
        }
    }

    /// Linear 0–100 % → 0–32767 mapping.
    ///
    /// ```rust
    /// use platform::audio_types::{Amplitude, VolumePercent};
    /// assert_eq!(Amplitude::from_volume(VolumePercent::new(100)).get(), 32767);
    /// assert_eq!(Amplitude::from_volume(VolumePercent::new(0)).get(), 0);
    /// ```
    #[must_use]
    pub fn from_volume(volume: VolumePercent) -> Self {
        // max: 100 * 32767 = 3_276_700 < u32::MAX
        let raw = u32::from(volume.get()) * u32::from(Self::MAX.0) / 100;
        #[allow(clippy::cast_possible_truncation)] // raw <= 32767
        Self(raw as u16)
    }

    /// Inverse of [`Amplitude::from_volume`], rounded down.
    #[must_use]
    pub fn to_volume(self) -> VolumePercent {
        let pct = u32::from(self.0) * 100 / u32::from(Self::MAX.0);
        #[allow(clippy::cast_possible_truncation)] // pct <= 100
        VolumePercent::new(pct as u8)
    }

    /// Return the raw amplitude.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Sample rate in Hz, validated to the range the speaker I2S peripheral accepts.
///
/// Valid range: 8000–48000 Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz (telephony).
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 48000 Hz.
    pub const MAX_HZ: u32 = 48_000;

    /// Create a `SampleRateHz`, returning an error if out of 8000–48000 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 48000`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if !(Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        } else {
            Ok(Self(hz))
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}
