//! End-to-end melody playback through the I2S sink and the PWM buzzer.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use platform::audio::AudioConfig;
use platform::audio_types::{SampleRateHz, VolumePercent};
use platform::mocks::{MockAudio, MockDelay, MockPwm};
use playback::{
    AudioError, CancelToken, EngineConfig, I2sSink, MelodyId, MelodyPlayer, PlayOutcome, PwmSink,
    RepeatMode, SampleSink, SpeakerKind, Speaker, VoiceSettings,
};

fn i2s_player(voice: &VoiceSettings) -> MelodyPlayer<'_, I2sSink<MockAudio>, MockDelay> {
    let config = EngineConfig::default();
    let sink = I2sSink::new(MockAudio::new(), AudioConfig::speaker_default(), config.write_timeout_ms);
    MelodyPlayer::new(sink, MockDelay::new(), voice, config).with_seed(42)
}

/// Sink that raises a cancel token after a number of writes.
struct StopAfter<'a> {
    inner: I2sSink<MockAudio>,
    writes: usize,
    limit: usize,
    cancel: &'a CancelToken,
}

impl SampleSink for StopAfter<'_> {
    fn kind(&self) -> SpeakerKind {
        self.inner.kind()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn channels(&self) -> u8 {
        self.inner.channels()
    }

    async fn write(&mut self, samples: &[i16], volume: VolumePercent) -> Result<usize, AudioError> {
        self.writes += 1;
        if self.writes == self.limit {
            self.cancel.request();
        }
        self.inner.write(samples, volume).await
    }

    async fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32, volume: VolumePercent) -> Result<(), AudioError> {
        self.inner.play_tone(frequency_hz, duration_ms, volume).await
    }

    async fn set_format(&mut self, sample_rate: SampleRateHz, channels: u8) -> Result<(), AudioError> {
        self.inner.set_format(sample_rate, channels).await
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        self.inner.stop().await
    }

    fn set_volume(&mut self, volume: VolumePercent) {
        self.inner.set_volume(volume);
    }

    fn volume(&self) -> VolumePercent {
        self.inner.volume()
    }
}

#[tokio::test]
async fn happy_birthday_renders_exact_duration() {
    let voice = VoiceSettings::default();
    let mut player = i2s_player(&voice);
    let tones = MelodyId::HappyBirthday.tones();

    let outcome = player
        .play_melody(MelodyId::HappyBirthday, 0, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, PlayOutcome::Completed);

    let note_ms: u64 = tones.iter().map(|t| u64::from(t.duration_ms)).sum();
    let expected_ms = note_ms + 50 * (tones.len() as u64 - 1);
    assert_eq!(expected_ms, 7_450);

    let samples = player.sink().codec().samples_written() as u64;
    let gaps_ms = player.delay_mut().total_ms();
    // 16 kHz mono: 16 samples per millisecond
    assert_eq!(samples, note_ms * 16);
    assert_eq!(samples / 16 + gaps_ms, expected_ms);

    let written = player.sink().codec().written();
    let peak = written.iter().map(|s| s.unsigned_abs()).max().unwrap();
    assert!(peak > 0);
    // guitar harmonics sum to at most 1.4 x amplitude
    assert!(peak <= 21_000, "peak {peak}");
}

#[tokio::test]
async fn repeat_count_zero_is_one_pass() {
    let voice = VoiceSettings::default();
    let mut player = i2s_player(&voice);
    player
        .play_melody(MelodyId::DoReMiScale, 0, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(player.sink().codec().writes(), 8);
}

#[tokio::test]
async fn repeat_count_three_is_three_passes() {
    let voice = VoiceSettings::default();
    let mut player = i2s_player(&voice);
    player
        .play_melody(MelodyId::DoReMiScale, 3, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(player.sink().codec().writes(), 24);
    // 7 note gaps per pass, 2 repeat gaps
    assert_eq!(player.delay_mut().total_ms(), 3 * 7 * 50 + 2 * 500);
}

#[tokio::test]
async fn repeat_forever_runs_until_interrupted() {
    let voice = VoiceSettings::default();
    let cancel = CancelToken::new();
    let config = EngineConfig::default();
    let sink = StopAfter {
        inner: I2sSink::new(MockAudio::new(), AudioConfig::speaker_default(), 1000),
        writes: 0,
        limit: 20,
        cancel: &cancel,
    };
    let mut player = MelodyPlayer::new(sink, MockDelay::new(), &voice, config);

    let outcome = player
        .play_melody(MelodyId::DoReMiScale, -1, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, PlayOutcome::Interrupted);
    // the note in flight completes, nothing after it starts
    assert_eq!(player.sink().writes, 20);
    assert!(!cancel.is_requested());
}

#[tokio::test]
async fn random_melody_plays_every_note() {
    let voice = VoiceSettings::default();
    let mut player = i2s_player(&voice);
    let outcome = player
        .play_random(16, RepeatMode::Once, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, PlayOutcome::Completed);
    assert_eq!(player.sink().codec().writes(), 16);
    assert_eq!(player.delay_mut().total_ms(), 15 * 50);
}

#[tokio::test]
async fn sink_volume_scales_output() {
    let voice = VoiceSettings::default();
    let mut loud = i2s_player(&voice);
    loud.play_frequency(440, 100).await.unwrap();

    let mut quiet = i2s_player(&voice);
    quiet.sink_mut().set_volume(VolumePercent::new(50));
    quiet.play_frequency(440, 100).await.unwrap();

    let loud = loud.sink().codec().written();
    let quiet = quiet.sink().codec().written();
    assert_eq!(loud.len(), quiet.len());
    for (l, q) in loud.iter().zip(quiet) {
        assert_eq!(i32::from(*q), i32::from(*l) * 50 / 100);
    }
}

#[tokio::test]
async fn speaker_selected_at_runtime() {
    let voice = VoiceSettings::default();
    let config = EngineConfig::default().with_speaker(SpeakerKind::Pwm);
    let speaker: Speaker<MockAudio, MockPwm, MockDelay> = match config.speaker {
        SpeakerKind::I2s => Speaker::I2s(I2sSink::new(MockAudio::new(), AudioConfig::speaker_default(), 1000)),
        SpeakerKind::Pwm => Speaker::Pwm(PwmSink::new(MockPwm::new(), MockDelay::new(), config.sample_rate_hz)),
    };
    let mut player = MelodyPlayer::new(speaker, MockDelay::new(), &voice, config);
    player
        .play_melody(MelodyId::DoReMiScale, 0, &CancelToken::new())
        .await
        .unwrap();

    let Speaker::Pwm(pwm) = player.sink_mut() else {
        panic!("expected the buzzer");
    };
    // seven quarters and a half note held on the buzzer
    assert_eq!(pwm.delay_mut().total_ms(), 7 * 250 + 500);
    assert_eq!(pwm.pwm().duty(), 0);
}

#[tokio::test]
async fn cues_play_on_i2s() {
    let voice = VoiceSettings::default();
    let mut player = i2s_player(&voice);
    player.play_cue(playback::Cue::DoubleBeep).await.unwrap();
    // two 150 ms beeps at 16 kHz
    assert_eq!(player.sink().codec().samples_written(), 2 * 2_400);
    assert_eq!(player.delay_mut().total_ms(), 100);
}
