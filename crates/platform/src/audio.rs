//! Audio hardware abstractions: I2S codec, PWM tone output, microphone input.
//!
//! The playback crate never touches a peripheral directly. It drives one of
//! these traits, and the firmware picks the concrete implementation at
//! start-up (I2S amplifier or PWM buzzer, analog or I2S microphone).

/// I2S audio codec trait
pub trait AudioCodec {
    /// Error type
    type Error: core::fmt::Debug;

    /// Initialize (or re-initialize) the codec with a configuration
    fn init(
        &mut self,
        config: AudioConfig,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Start the I2S clocks and DMA
    fn start(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Stop output; pending DMA data is discarded
    fn stop(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Set hardware volume (0-100), if the codec has one
    fn set_volume(
        &mut self,
        volume: u8,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Write interleaved 16-bit samples.
    ///
    /// Resolves once the driver has accepted the samples, returning how many
    /// were accepted.
    fn write_samples(
        &mut self,
        samples: &[i16],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;
}

/// Audio configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u8,
    /// Bit depth (16 or 32)
    pub bit_depth: u8,
}

impl AudioConfig {
    /// 16 kHz mono, 16-bit: the speaker's power-on configuration.
    pub const fn speaker_default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            bit_depth: 16,
        }
    }

    /// Same configuration with a different sample rate.
    #[must_use]
    pub const fn with_sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: self.channels,
            bit_depth: self.bit_depth,
        }
    }

    /// Same configuration with a different channel count.
    #[must_use]
    pub const fn with_channels(self, channels: u8) -> Self {
        Self {
            sample_rate: self.sample_rate,
            channels,
            bit_depth: self.bit_depth,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::speaker_default()
    }
}

/// PWM channel able to emit a square tone (piezo / small speaker on a LEDC pin).
///
/// Duty cycle control comes from [`embedded_hal::pwm::SetDutyCycle`]; this
/// trait adds the carrier frequency, which `embedded-hal` does not model.
pub trait TonePwm: embedded_hal::pwm::SetDutyCycle {
    /// Change the PWM carrier frequency in Hz.
    fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error>;
}

/// Microphone capability: fills a byte buffer with raw samples.
///
/// Analog (ADC) and I2S microphones are both exposed through this trait so
/// the recorder does not care which one is fitted.
pub trait SampleSource {
    /// Error type
    type Error: core::fmt::Debug;

    /// Raw sample format delivered by [`SampleSource::fill`].
    fn format(&self) -> SourceFormat;

    /// Fill `buf` with raw little-endian samples, waiting at most `timeout_ms`.
    ///
    /// Returns the number of bytes written into `buf`.
    fn fill(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;
}

/// Raw sample layout produced by a [`SampleSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per raw sample slot (16 or 32)
    pub bits_per_sample: u8,
    /// Interleaved channel count (1 or 2)
    pub channels: u8,
}

impl SourceFormat {
    /// Bytes occupied by one interleaved frame.
    pub const fn frame_bytes(&self) -> usize {
        (self.bits_per_sample as usize / 8) * self.channels as usize
    }
}
