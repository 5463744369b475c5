//! Sample sinks: where PCM leaves the engine.
//!
//! A [`SampleSink`] accepts interleaved 16-bit PCM, scales it by a volume
//! percentage and blocks (awaits) until the hardware has taken it or the
//! write timeout expires. Two implementations exist, picked at start-up
//! through [`Speaker`]:
//!
//! - [`I2sSink`] streams real PCM through an [`AudioCodec`].
//! - [`PwmSink`] drives a buzzer. It cannot play PCM; each sample is
//!   reinterpreted as a target frequency, which is coarse but keeps every
//!   caller working when no amplifier is fitted.

use alloc::vec::Vec;

use embassy_time::{with_timeout, Duration};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::delay::DelayNs;
use platform::audio::{AudioCodec, AudioConfig, TonePwm};
use platform::audio_types::{Amplitude, SampleRateHz, VolumePercent};

use crate::config::SpeakerKind;
use crate::envelope;
use crate::error::AudioError;
use crate::tone::Timbre;
use crate::volume::scale_into;
use crate::waveform::WaveformGenerator;

/// Hardware output for PCM and simple tones.
pub trait SampleSink {
    /// Which speaker this is.
    fn kind(&self) -> SpeakerKind;

    /// Current output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Current interleaved channel count.
    fn channels(&self) -> u8;

    /// Scale `samples` by `volume` and write them, waiting until accepted.
    ///
    /// Returns the number of samples the hardware accepted; `0` means the
    /// write timed out or the driver stalled.
    fn write(
        &mut self,
        samples: &[i16],
        volume: VolumePercent,
    ) -> impl core::future::Future<Output = Result<usize, AudioError>>;

    /// Play a plain tone for `duration_ms`.
    fn play_tone(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
        volume: VolumePercent,
    ) -> impl core::future::Future<Output = Result<(), AudioError>>;

    /// Change sample rate and channel count (stop → reconfigure → restart).
    fn set_format(
        &mut self,
        sample_rate: SampleRateHz,
        channels: u8,
    ) -> impl core::future::Future<Output = Result<(), AudioError>>;

    /// True between the first write and `stop`.
    fn is_playing(&self) -> bool;

    /// Stop output and discard anything queued.
    fn stop(&mut self) -> impl core::future::Future<Output = Result<(), AudioError>>;

    /// Set the volume used by callers that do not pass their own.
    fn set_volume(&mut self, volume: VolumePercent);

    /// Current sink volume.
    fn volume(&self) -> VolumePercent;
}

// ─── I2S ──────────────────────────────────────────────────────────────────────

/// PCM sink over an I2S codec.
///
/// The codec is initialised and started lazily on the first write.
pub struct I2sSink<C: AudioCodec> {
    codec: C,
    config: AudioConfig,
    volume: VolumePercent,
    timeout: Duration,
    initialized: bool,
    active: bool,
    scratch: Vec<i16>,
}

impl<C: AudioCodec> I2sSink<C> {
    /// Wrap a codec. Nothing is sent to the hardware until the first write.
    pub fn new(codec: C, config: AudioConfig, write_timeout_ms: u32) -> Self {
        Self {
            codec,
            config,
            volume: VolumePercent::FULL,
            timeout: Duration::from_millis(u64::from(write_timeout_ms)),
            initialized: false,
            active: false,
            scratch: Vec::new(),
        }
    }

    /// The wrapped codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The wrapped codec, mutable.
    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    /// Current codec configuration.
    pub fn config(&self) -> AudioConfig {
        self.config
    }

    async fn ensure_running(&mut self) -> Result<(), AudioError> {
        if !self.initialized {
            self.codec
                .init(self.config)
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
            self.initialized = true;
        }
        if !self.active {
            self.codec
                .start()
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
            self.active = true;
        }
        Ok(())
    }
}

impl<C: AudioCodec> SampleSink for I2sSink<C> {
    fn kind(&self) -> SpeakerKind {
        SpeakerKind::I2s
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn channels(&self) -> u8 {
        self.config.channels
    }

    async fn write(&mut self, samples: &[i16], volume: VolumePercent) -> Result<usize, AudioError> {
        if samples.is_empty() {
            return Err(AudioError::InvalidParameter("empty sample buffer"));
        }
        self.ensure_running().await?;

        self.scratch.clear();
        self.scratch
            .try_reserve(samples.len())
            .map_err(|_| AudioError::OutOfMemory)?;
        scale_into(samples, volume, &mut self.scratch);

        let mut written = 0usize;
        while let Some(rest) = self.scratch.get(written..).filter(|r| !r.is_empty()) {
            match with_timeout(self.timeout, self.codec.write_samples(rest)).await {
                Ok(Ok(0)) => {
                    tracing::warn!("i2s driver accepted no samples");
                    break;
                }
                Ok(Ok(n)) => written = written.saturating_add(n),
                Ok(Err(_)) => {
                    tracing::error!("i2s write failed after {} samples", written);
                    return Err(AudioError::SinkWrite);
                }
                Err(_) => {
                    tracing::warn!("i2s write timed out after {} samples", written);
                    break;
                }
            }
        }
        Ok(written)
    }

    async fn play_tone(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
        volume: VolumePercent,
    ) -> Result<(), AudioError> {
        let freq = u16::try_from(frequency_hz.min(20_000)).unwrap_or(u16::MAX);
        let gen = WaveformGenerator::new(Timbre::Sine, Amplitude::from_volume(volume));
        let mut buf = gen.synthesize(freq, duration_ms, self.config.sample_rate, self.config.channels)?;
        if buf.is_empty() {
            return Ok(());
        }
        envelope::shape(&mut buf, 5);
        match self.write(buf.samples(), VolumePercent::FULL).await? {
            0 => Err(AudioError::SinkWrite),
            _ => Ok(()),
        }
    }

    async fn set_format(&mut self, sample_rate: SampleRateHz, channels: u8) -> Result<(), AudioError> {
        if !matches!(channels, 1 | 2) {
            return Err(AudioError::InvalidParameter("channels must be 1 or 2"));
        }
        let next = self
            .config
            .with_sample_rate(sample_rate.get())
            .with_channels(channels);
        if next == self.config {
            return Ok(());
        }
        tracing::info!(
            "i2s reconfigure: {} Hz {} ch -> {} Hz {} ch",
            self.config.sample_rate,
            self.config.channels,
            next.sample_rate,
            next.channels
        );
        let was_active = self.active;
        if was_active {
            self.codec
                .stop()
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
            self.active = false;
        }
        self.config = next;
        if self.initialized {
            self.codec
                .init(next)
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
        }
        if was_active {
            self.ensure_running().await?;
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.active
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        if self.active {
            self.codec
                .stop()
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
            self.active = false;
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: VolumePercent) {
        self.volume = volume;
    }

    fn volume(&self) -> VolumePercent {
        self.volume
    }
}

// ─── PWM ──────────────────────────────────────────────────────────────────────

/// Lowest frequency the buzzer is driven at.
pub const PWM_MIN_HZ: u32 = 20;
/// Highest frequency the buzzer is driven at.
pub const PWM_MAX_HZ: u32 = 20_000;

/// Buzzer sink over a PWM channel.
pub struct PwmSink<P: TonePwm, D: DelayNs> {
    pwm: P,
    delay: D,
    sample_rate: u32,
    volume: VolumePercent,
    playing: bool,
}

impl<P: TonePwm, D: DelayNs> PwmSink<P, D> {
    /// Wrap a PWM channel. `sample_rate` sets how long each written
    /// sample is held.
    pub fn new(pwm: P, delay: D, sample_rate: u32) -> Self {
        Self {
            pwm,
            delay,
            sample_rate: sample_rate.max(1),
            volume: VolumePercent::FULL,
            playing: false,
        }
    }

    /// The wrapped PWM channel.
    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    /// The delay used to hold tones.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Volume maps to at most half duty: 100 % → 50 %.
    fn drive(&mut self, frequency_hz: u32, volume: VolumePercent) -> Result<(), AudioError> {
        if !(PWM_MIN_HZ..=PWM_MAX_HZ).contains(&frequency_hz) || volume == VolumePercent::MUTE {
            return self.silence();
        }
        self.pwm
            .set_frequency(frequency_hz)
            .map_err(|_| AudioError::HardwareUnavailable)?;
        self.pwm
            .set_duty_cycle_fraction(u16::from(volume.get()), 200)
            .map_err(|_| AudioError::HardwareUnavailable)
    }

    fn silence(&mut self) -> Result<(), AudioError> {
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| AudioError::HardwareUnavailable)
    }

    /// Turn the buzzer off after a failed drive and pass the error on.
    fn abort(&mut self, err: AudioError) -> AudioError {
        self.playing = false;
        if self.silence().is_err() {
            tracing::warn!("pwm did not silence after {}", err);
        }
        err
    }

    fn hold_us(&self, frames: usize) -> u32 {
        let us = (frames as u64).saturating_mul(1_000_000) / u64::from(self.sample_rate);
        u32::try_from(us).unwrap_or(u32::MAX)
    }
}

impl<P: TonePwm, D: DelayNs> SampleSink for PwmSink<P, D> {
    fn kind(&self) -> SpeakerKind {
        SpeakerKind::Pwm
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u8 {
        1
    }

    /// Each sample's magnitude is taken as a frequency in Hz and held for
    /// one sample period. Runs of equal samples are held in one step.
    async fn write(&mut self, samples: &[i16], volume: VolumePercent) -> Result<usize, AudioError> {
        if samples.is_empty() {
            return Err(AudioError::InvalidParameter("empty sample buffer"));
        }
        self.playing = true;
        let mut rest = samples;
        while let Some(&first) = rest.first() {
            let run = rest.iter().take_while(|&&s| s == first).count();
            if let Err(e) = self.drive(u32::from(first.unsigned_abs()), volume) {
                return Err(self.abort(e));
            }
            self.delay.delay_us(self.hold_us(run)).await;
            rest = rest.get(run..).unwrap_or(&[]);
        }
        self.silence()?;
        Ok(samples.len())
    }

    async fn play_tone(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
        volume: VolumePercent,
    ) -> Result<(), AudioError> {
        let freq = frequency_hz.clamp(PWM_MIN_HZ, PWM_MAX_HZ);
        self.playing = true;
        let started = if frequency_hz == 0 {
            self.silence()
        } else {
            self.drive(freq, volume)
        };
        if let Err(e) = started {
            return Err(self.abort(e));
        }
        self.delay.delay_ms(duration_ms).await;
        self.silence()
    }

    async fn set_format(&mut self, sample_rate: SampleRateHz, _channels: u8) -> Result<(), AudioError> {
        self.sample_rate = sample_rate.get();
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        self.playing = false;
        self.silence()
    }

    fn set_volume(&mut self, volume: VolumePercent) {
        self.volume = volume;
    }

    fn volume(&self) -> VolumePercent {
        self.volume
    }
}

// ─── Runtime selection ────────────────────────────────────────────────────────

/// The fitted speaker, chosen at start-up from [`SpeakerKind`].
pub enum Speaker<C: AudioCodec, P: TonePwm, D: DelayNs> {
    /// I2S amplifier
    I2s(I2sSink<C>),
    /// PWM buzzer
    Pwm(PwmSink<P, D>),
}

macro_rules! dispatch {
    ($self:expr, $sink:ident => $body:expr) => {
        match $self {
            Speaker::I2s($sink) => $body,
            Speaker::Pwm($sink) => $body,
        }
    };
}

impl<C: AudioCodec, P: TonePwm, D: DelayNs> SampleSink for Speaker<C, P, D> {
    fn kind(&self) -> SpeakerKind {
        dispatch!(self, s => s.kind())
    }

    fn sample_rate(&self) -> u32 {
        dispatch!(self, s => s.sample_rate())
    }

    fn channels(&self) -> u8 {
        dispatch!(self, s => s.channels())
    }

    async fn write(&mut self, samples: &[i16], volume: VolumePercent) -> Result<usize, AudioError> {
        dispatch!(self, s => s.write(samples, volume).await)
    }

    async fn play_tone(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
        volume: VolumePercent,
    ) -> Result<(), AudioError> {
        dispatch!(self, s => s.play_tone(frequency_hz, duration_ms, volume).await)
    }

    async fn set_format(&mut self, sample_rate: SampleRateHz, channels: u8) -> Result<(), AudioError> {
        dispatch!(self, s => s.set_format(sample_rate, channels).await)
    }

    fn is_playing(&self) -> bool {
        dispatch!(self, s => s.is_playing())
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        dispatch!(self, s => s.stop().await)
    }

    fn set_volume(&mut self, volume: VolumePercent) {
        dispatch!(self, s => s.set_volume(volume))
    }

    fn volume(&self) -> VolumePercent {
        dispatch!(self, s => s.volume())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::{MockAudio, MockDelay, MockPwm, PwmEvent};

    fn i2s() -> I2sSink<MockAudio> {
        I2sSink::new(MockAudio::new(), AudioConfig::speaker_default(), 1000)
    }

    #[tokio::test]
    async fn test_i2s_lazy_start_and_scaling() {
        let mut sink = i2s();
        assert!(!sink.is_playing());
        let n = sink.write(&[1000, -1000, 40], VolumePercent::new(50)).await.unwrap();
        assert_eq!(n, 3);
        assert!(sink.is_playing());
        assert_eq!(sink.codec().written(), &[500, -500, 20]);
        assert_eq!(sink.codec().inits().len(), 1);
        assert_eq!(sink.codec().starts(), 1);
    }

    #[tokio::test]
    async fn test_i2s_partial_writes_loop_until_done() {
        let mut sink = I2sSink::new(
            MockAudio::new().with_accept_limit(2),
            AudioConfig::speaker_default(),
            1000,
        );
        let n = sink.write(&[1, 2, 3, 4, 5], VolumePercent::FULL).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(sink.codec().writes(), 3);
    }

    #[tokio::test]
    async fn test_i2s_stalled_driver_reports_zero() {
        let mut sink = I2sSink::new(
            MockAudio::new().with_accept_limit(0),
            AudioConfig::speaker_default(),
            1000,
        );
        assert_eq!(sink.write(&[1, 2], VolumePercent::FULL).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_i2s_empty_write_rejected() {
        let mut sink = i2s();
        assert!(matches!(
            sink.write(&[], VolumePercent::FULL).await,
            Err(AudioError::InvalidParameter(_))
        ));
        assert_eq!(sink.codec().starts(), 0);
    }

    #[tokio::test]
    async fn test_i2s_set_format_restarts_running_codec() {
        let mut sink = i2s();
        sink.write(&[0; 4], VolumePercent::FULL).await.unwrap();
        sink.set_format(SampleRateHz::new(44_100).unwrap(), 2).await.unwrap();
        assert_eq!(sink.sample_rate(), 44_100);
        assert_eq!(sink.channels(), 2);
        assert_eq!(sink.codec().stops(), 1);
        assert_eq!(sink.codec().starts(), 2);
        assert_eq!(sink.codec().inits().last().unwrap().sample_rate, 44_100);
        assert!(sink.is_playing());
    }

    #[tokio::test]
    async fn test_i2s_set_format_same_is_noop() {
        let mut sink = i2s();
        sink.write(&[0; 4], VolumePercent::FULL).await.unwrap();
        sink.set_format(SampleRateHz::new(16_000).unwrap(), 1).await.unwrap();
        assert_eq!(sink.codec().stops(), 0);
    }

    #[tokio::test]
    async fn test_i2s_play_tone_writes_sine() {
        let mut sink = i2s();
        sink.play_tone(1000, 100, VolumePercent::new(50)).await.unwrap();
        assert_eq!(sink.codec().samples_written(), 1600);
        let peak = sink.codec().written().iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak <= 16_383);
    }

    #[tokio::test]
    async fn test_i2s_stop() {
        let mut sink = i2s();
        sink.write(&[0; 4], VolumePercent::FULL).await.unwrap();
        sink.stop().await.unwrap();
        assert!(!sink.is_playing());
        assert!(!sink.codec().is_playing());
    }

    #[tokio::test]
    async fn test_pwm_tone_clamps_and_silences() {
        let mut sink = PwmSink::new(MockPwm::new(), MockDelay::new(), 16_000);
        sink.play_tone(50_000, 200, VolumePercent::FULL).await.unwrap();
        let events = sink.pwm().events();
        assert_eq!(events[0], PwmEvent::Frequency(20_000));
        // 100 % volume → half of 255
        assert_eq!(events[1], PwmEvent::Duty(127));
        assert_eq!(*events.last().unwrap(), PwmEvent::Duty(0));
        assert_eq!(sink.delay_mut().total_ms(), 200);
    }

    #[tokio::test]
    async fn test_pwm_write_holds_runs() {
        let mut sink = PwmSink::new(MockPwm::new(), MockDelay::new(), 1000);
        let n = sink.write(&[440, 440, 440, 5, 880], VolumePercent::FULL).await.unwrap();
        assert_eq!(n, 5);
        // 5 ms of samples at 1 kHz, held in three steps
        assert_eq!(sink.delay_mut().total_ms(), 5);
        assert_eq!(sink.delay_mut().calls(), 3);
        let freqs: alloc::vec::Vec<_> = sink
            .pwm()
            .events()
            .iter()
            .filter_map(|e| match e {
                PwmEvent::Frequency(f) => Some(*f),
                PwmEvent::Duty(_) => None,
            })
            .collect();
        assert_eq!(freqs, [440, 880]);
    }

    /// Buzzer whose carrier cannot go above 10 kHz.
    struct LimitedPwm(MockPwm);

    impl embedded_hal::pwm::ErrorType for LimitedPwm {
        type Error = embedded_hal::pwm::ErrorKind;
    }

    impl SetDutyCycle for LimitedPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.0.max_duty_cycle()
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.0.set_duty_cycle(duty).map_err(|never| match never {})
        }
    }

    impl TonePwm for LimitedPwm {
        fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error> {
            if hz > 10_000 {
                return Err(embedded_hal::pwm::ErrorKind::Other);
            }
            self.0.set_frequency(hz).map_err(|never| match never {})
        }
    }

    #[tokio::test]
    async fn test_pwm_drive_failure_silences_buzzer() {
        let mut sink = PwmSink::new(LimitedPwm(MockPwm::new()), MockDelay::new(), 1000);
        let err = sink
            .write(&[440, 440, 15_000, 880], VolumePercent::FULL)
            .await
            .unwrap_err();
        assert_eq!(err, AudioError::HardwareUnavailable);
        assert!(!sink.is_playing());
        assert_eq!(sink.pwm().0.duty(), 0);
        // only the 440 Hz run was held
        assert_eq!(sink.delay_mut().calls(), 1);

        let err = sink.play_tone(12_000, 100, VolumePercent::FULL).await.unwrap_err();
        assert_eq!(err, AudioError::HardwareUnavailable);
        assert!(!sink.is_playing());
        assert_eq!(sink.pwm().0.duty(), 0);
        // the tone is never held
        assert_eq!(sink.delay_mut().total_ms(), 2);
    }

    #[tokio::test]
    async fn test_speaker_dispatch() {
        let mut speaker: Speaker<MockAudio, MockPwm, MockDelay> =
            Speaker::Pwm(PwmSink::new(MockPwm::new(), MockDelay::new(), 16_000));
        assert_eq!(speaker.kind(), SpeakerKind::Pwm);
        assert_eq!(speaker.channels(), 1);
        speaker.set_volume(VolumePercent::new(30));
        assert_eq!(speaker.volume().get(), 30);

        let mut speaker: Speaker<MockAudio, MockPwm, MockDelay> = Speaker::I2s(i2s());
        assert_eq!(speaker.kind(), SpeakerKind::I2s);
        speaker.write(&[1], VolumePercent::FULL).await.unwrap();
        assert!(speaker.is_playing());
    }
}
