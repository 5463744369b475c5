//! Melody player: turns tone lists into sound.
//!
//! [`MelodyPlayer`] drives a [`PlaybackSession`] and performs each step it
//! yields: synthesize, shape and write a note, or sleep for a gap. The
//! cancellation token is polled before every note, never mid-note.

use alloc::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use platform::audio_types::Amplitude;

use crate::config::{EngineConfig, SpeakerKind};
use crate::effects::{self, Cue};
use crate::engine::{CancelToken, PlaybackSession, RepeatMode, Step};
use crate::envelope;
use crate::error::{AudioError, PlayOutcome};
use crate::melody::{self, Lcg, MelodyId};
use crate::sink::SampleSink;
use crate::tone::{Timbre, Tone};
use crate::volume::VoiceSettings;
use crate::waveform::{to_i16, PcmBuffer, WaveformGenerator};

/// Plays tones, melodies and cues on one sink.
pub struct MelodyPlayer<'a, S: SampleSink, D: DelayNs> {
    sink: S,
    delay: D,
    voice: &'a VoiceSettings,
    config: EngineConfig,
    rng: Lcg,
}

impl<'a, S: SampleSink, D: DelayNs> MelodyPlayer<'a, S, D> {
    /// Create a player. The sink volume is set from `config`, and the random
    /// generator is seeded from the uptime.
    pub fn new(mut sink: S, delay: D, voice: &'a VoiceSettings, config: EngineConfig) -> Self {
        sink.set_volume(config.sink_volume);
        tracing::info!(
            "melody player: {} speaker, {} Hz, {} ch",
            sink.kind().name(),
            config.sample_rate_hz,
            config.channels
        );
        Self {
            sink,
            delay,
            voice,
            config,
            rng: Lcg::from_uptime(),
        }
    }

    /// Replace the random generator seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = Lcg::new(seed);
        self
    }

    /// Play `tones` `repeat` times.
    ///
    /// Returns `Interrupted` if `cancel` was raised; the token is consumed.
    /// A note the sink refuses aborts the whole melody with `SinkWrite`.
    pub async fn play(
        &mut self,
        tones: &[Tone],
        repeat: RepeatMode,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let mut session = PlaybackSession::new(tones.len(), repeat)?;
        match repeat.passes() {
            Some(n) => tracing::info!("melody: {} notes x{}", tones.len(), n),
            None => tracing::info!("melody: {} notes, looping", tones.len()),
        }

        loop {
            match session.advance() {
                Step::Note(i) => {
                    if cancel.take() {
                        session.stop();
                        tracing::info!("melody interrupted before note {}", i);
                        return Ok(PlayOutcome::Interrupted);
                    }
                    let Some(&tone) = tones.get(i) else {
                        return Err(AudioError::InvalidParameter("note index out of range"));
                    };
                    if let Err(e) = self.play_tone(tone).await {
                        session.stop();
                        tracing::error!("melody aborted at note {}: {}", i, e);
                        return Err(e);
                    }
                }
                Step::NoteGap => self.delay.delay_ms(self.config.note_gap_ms).await,
                Step::RepeatGap => {
                    tracing::debug!("pass {} done", session.passes_done());
                    self.delay.delay_ms(self.config.repeat_gap_ms).await;
                }
                Step::Finished => {
                    tracing::info!("melody finished after {} passes", session.passes_done());
                    return Ok(PlayOutcome::Completed);
                }
            }
        }
    }

    /// Play a named melody. `repeat_count`: `0` once, `-1` forever, `N` N times.
    pub async fn play_melody(
        &mut self,
        id: MelodyId,
        repeat_count: i32,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let repeat = RepeatMode::from_count(repeat_count)?;
        tracing::info!("playing {}", id.name());
        self.play(id.tones(), repeat, cancel).await
    }

    /// C4 up to C5, or back down.
    pub async fn play_scale(
        &mut self,
        ascending: bool,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let tones = melody::scale(ascending);
        self.play(&tones, RepeatMode::Once, cancel).await
    }

    /// Generate and play a random C-major melody of `notes` notes.
    pub async fn play_random(
        &mut self,
        notes: usize,
        repeat: RepeatMode,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let tones = melody::generate_random_melody(&mut self.rng, notes, None)?;
        self.play(&tones, repeat, cancel).await
    }

    /// Play a single tone with the current timbre.
    pub async fn play_frequency(&mut self, frequency_hz: u16, duration_ms: u32) -> Result<(), AudioError> {
        if duration_ms == 0 {
            return Err(AudioError::InvalidParameter("duration must be non-zero"));
        }
        self.play_tone(Tone::new(frequency_hz, duration_ms)).await
    }

    /// Mix several pitches into one buffer, each at `1 / count` of the
    /// amplitude. Rests in `frequencies` are skipped.
    pub async fn play_chord(&mut self, frequencies: &[u16], duration_ms: u32) -> Result<(), AudioError> {
        let voices: Vec<u16> = frequencies.iter().copied().filter(|&f| f != 0).collect();
        if voices.is_empty() || duration_ms == 0 {
            return Err(AudioError::InvalidParameter("chord needs notes and a duration"));
        }
        if self.sink.kind() == SpeakerKind::Pwm {
            // a buzzer has one voice; play the root
            let root = voices.first().copied().unwrap_or_default();
            return self.play_tone(Tone::new(root, duration_ms)).await;
        }

        let (rate, channels) = (self.sink.sample_rate(), self.sink.channels());
        let gen = WaveformGenerator::new(self.voice.timbre(), self.voice.amplitude());
        let mut mix: Vec<f32> = Vec::new();
        let mut part = PcmBuffer::for_duration(duration_ms, rate, channels)?;
        mix.try_reserve_exact(part.len())
            .map_err(|_| AudioError::OutOfMemory)?;
        mix.resize(part.len(), 0.0);

        #[allow(clippy::cast_precision_loss)] // a handful of voices
        let weight = 1.0 / voices.len() as f32;
        for &f in &voices {
            gen.fill(f, &mut part);
            for (m, &s) in mix.iter_mut().zip(part.samples()) {
                *m += f32::from(s) * weight;
            }
        }
        for (dst, &m) in part.samples_mut().iter_mut().zip(&mix) {
            *dst = to_i16(m);
        }
        envelope::shape(&mut part, self.config.fade_cap_ms);
        self.write_buffer(&part).await
    }

    /// Play a sound-effect cue.
    pub async fn play_cue(&mut self, cue: Cue) -> Result<(), AudioError> {
        effects::play_cue(&mut self.sink, &mut self.delay, cue).await
    }

    async fn play_tone(&mut self, tone: Tone) -> Result<(), AudioError> {
        if tone.duration_ms == 0 {
            return Ok(());
        }
        if self.sink.kind() == SpeakerKind::Pwm {
            if tone.is_rest() {
                self.delay.delay_ms(tone.duration_ms).await;
                return Ok(());
            }
            let volume = self.sink.volume();
            return self
                .sink
                .play_tone(u32::from(tone.frequency_hz), tone.duration_ms, volume)
                .await;
        }

        let gen = WaveformGenerator::new(self.voice.timbre(), self.voice.amplitude());
        let mut buf = gen.synthesize(
            tone.frequency_hz,
            tone.duration_ms,
            self.sink.sample_rate(),
            self.sink.channels(),
        )?;
        envelope::shape(&mut buf, self.config.fade_cap_ms);
        tracing::debug!(
            "note {} Hz {} ms ({} samples)",
            tone.frequency_hz,
            tone.duration_ms,
            buf.len()
        );
        self.write_buffer(&buf).await
    }

    async fn write_buffer(&mut self, buf: &PcmBuffer) -> Result<(), AudioError> {
        if buf.is_empty() {
            return Ok(());
        }
        let volume = self.sink.volume();
        match self.sink.write(buf.samples(), volume).await? {
            0 => Err(AudioError::SinkWrite),
            _ => Ok(()),
        }
    }

    /// Current timbre.
    pub fn timbre(&self) -> Timbre {
        self.voice.timbre()
    }

    /// Change the timbre used from the next note on.
    pub fn set_timbre(&self, timbre: Timbre) {
        self.voice.set_timbre(timbre);
    }

    /// Current synthesis amplitude.
    pub fn amplitude(&self) -> Amplitude {
        self.voice.amplitude()
    }

    /// Set the raw synthesis amplitude (clamped to 32 767).
    pub fn set_amplitude(&self, raw: u16) {
        self.voice.set_amplitude(raw);
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, mutable.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The gap delay.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
