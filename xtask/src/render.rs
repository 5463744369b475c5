//! Offline rendering of melodies and cues to WAV.
//!
//! The engine runs unchanged against a codec that records every sample.
//! Gaps between notes come through the delay, which appends the matching
//! amount of silence so the file sounds like the speaker would.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use embedded_hal_async::delay::DelayNs;
use platform::audio::{AudioCodec, AudioConfig};
use platform::audio_types::VolumePercent;
use playback::wav::WavHeader;
use playback::{
    CancelToken, Cue, EngineConfig, I2sSink, MelodyId, MelodyPlayer, RepeatMode, Timbre,
    VoiceSettings,
};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// What to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Melody(MelodyId),
    Random(usize),
    Cue(Cue),
}

impl Source {
    pub fn from_args(melody: Option<&str>, random: Option<usize>, cue: Option<&str>) -> Result<Self> {
        match (melody, random, cue) {
            (Some(name), None, None) => MelodyId::from_name(name)
                .map(Self::Melody)
                .ok_or_else(|| anyhow!("unknown melody '{name}'")),
            (None, Some(notes), None) => Ok(Self::Random(notes)),
            (None, None, Some(name)) => Cue::from_name(name)
                .map(Self::Cue)
                .ok_or_else(|| anyhow!("unknown cue '{name}'")),
            (None, None, None) => Ok(Self::Melody(MelodyId::DoReMiScale)),
            _ => bail!("choose one of --melody, --random or --cue"),
        }
    }
}

pub struct Options {
    pub timbre: Timbre,
    pub repeat: i32,
    pub seed: u32,
    pub volume: u8,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timbre: Timbre::Guitar,
            repeat: 0,
            seed: 1,
            volume: 100,
        }
    }
}

pub fn parse_timbre(name: &str) -> Result<Timbre> {
    Timbre::from_name(name).ok_or_else(|| {
        let known: Vec<_> = Timbre::ALL.iter().map(|t| t.name()).collect();
        anyhow!("unknown timbre '{name}' (known: {})", known.join(", "))
    })
}

#[derive(Default)]
struct Capture {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u8,
}

type Shared = Rc<RefCell<Capture>>;

/// Codec that keeps everything written to it.
struct CaptureCodec(Shared);

impl AudioCodec for CaptureCodec {
    type Error = core::convert::Infallible;

    async fn init(&mut self, config: AudioConfig) -> Result<(), Self::Error> {
        let mut capture = self.0.borrow_mut();
        capture.sample_rate = config.sample_rate;
        capture.channels = config.channels;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn set_volume(&mut self, _volume: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn write_samples(&mut self, samples: &[i16]) -> Result<usize, Self::Error> {
        self.0.borrow_mut().samples.extend_from_slice(samples);
        Ok(samples.len())
    }
}

/// Delay that turns waiting into silence in the capture.
struct SilenceDelay(Shared);

impl SilenceDelay {
    fn silence_ns(&self, ns: u64) {
        let mut capture = self.0.borrow_mut();
        let frames = ns * u64::from(capture.sample_rate) / 1_000_000_000;
        let samples = usize::try_from(frames).unwrap_or(0) * usize::from(capture.channels.max(1));
        let len = capture.samples.len() + samples;
        capture.samples.resize(len, 0);
    }
}

impl DelayNs for SilenceDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.silence_ns(u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.silence_ns(u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.silence_ns(u64::from(ms) * 1_000_000);
    }
}

/// Render `source` and return the interleaved samples with their format.
pub fn render(source: Source, options: &Options) -> Result<(Vec<i16>, u32, u8)> {
    if options.repeat < 0 {
        bail!("endless repeat cannot be rendered to a file");
    }
    let config = EngineConfig {
        timbre: options.timbre,
        sink_volume: VolumePercent::new(options.volume),
        ..EngineConfig::default()
    };
    config.validate().map_err(|e| anyhow!("{e}"))?;

    let shared: Shared = Rc::new(RefCell::new(Capture {
        sample_rate: config.sample_rate_hz,
        channels: config.channels,
        ..Capture::default()
    }));
    let voice = VoiceSettings::new(config.timbre, config.amplitude);
    let audio = AudioConfig::speaker_default()
        .with_sample_rate(config.sample_rate_hz)
        .with_channels(config.channels);
    let sink = I2sSink::new(CaptureCodec(shared.clone()), audio, config.write_timeout_ms);
    let mut player =
        MelodyPlayer::new(sink, SilenceDelay(shared.clone()), &voice, config).with_seed(options.seed);
    let cancel = CancelToken::new();
    let repeat = RepeatMode::from_count(options.repeat).map_err(|e| anyhow!("{e}"))?;

    embassy_futures::block_on(async {
        match source {
            Source::Melody(id) => player.play_melody(id, options.repeat, &cancel).await.map(drop),
            Source::Random(notes) => player.play_random(notes, repeat, &cancel).await.map(drop),
            Source::Cue(cue) => player.play_cue(cue).await,
        }
    })
    .map_err(|e| anyhow!("render failed: {e}"))?;
    drop(player);

    let capture = shared.take();
    Ok((capture.samples, capture.sample_rate, capture.channels))
}

/// Write interleaved 16-bit samples as a WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u8) -> Result<()> {
    let channels = u16::from(channels.max(1));
    let frames = u32::try_from(samples.len() / usize::from(channels)).context("too many samples")?;
    let mut bytes = WavHeader::pcm16(sample_rate, channels, frames).encode().to_vec();
    bytes.reserve(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn run(source: Source, options: &Options, out: &Path) -> Result<()> {
    println!();
    println!("{}", "🎵 Rendering audio...".cyan().bold());

    let (samples, rate, channels) = render(source, options)?;
    write_wav(out, &samples, rate, channels)?;

    let ms = samples.len() as u64 * 1000 / (u64::from(rate) * u64::from(channels.max(1)));
    tracing::info!("rendered {} samples at {} Hz", samples.len(), rate);
    println!(
        "{}",
        format!("  ✓ Wrote {} ({} ms, {})", out.display(), ms, options.timbre.name()).green()
    );
    println!();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn scale_includes_note_gaps() {
        let (samples, rate, channels) = render(Source::Melody(MelodyId::DoReMiScale), &Options::default()).unwrap();
        assert_eq!((rate, channels), (16_000, 1));
        // seven quarters, a half note and seven 50 ms gaps
        assert_eq!(samples.len(), (7 * 250 + 500 + 7 * 50) * 16);
    }

    #[test]
    fn cue_pause_is_silent() {
        let (samples, _, _) = render(Source::Cue(Cue::DoubleBeep), &Options::default()).unwrap();
        assert_eq!(samples.len(), (150 + 100 + 150) * 16);
        assert!(samples[150 * 16..250 * 16].iter().all(|&s| s == 0));
    }

    #[test]
    fn endless_repeat_is_rejected() {
        let options = Options {
            repeat: -1,
            ..Options::default()
        };
        assert!(render(Source::Melody(MelodyId::Theme), &options).is_err());
    }

    #[test]
    fn writes_parseable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.wav");
        let options = Options {
            timbre: Timbre::Flute,
            ..Options::default()
        };
        let (samples, rate, channels) = render(Source::Cue(Cue::Beep), &options).unwrap();
        write_wav(&path, &samples, rate, channels).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let (header, offset) = WavHeader::parse(&bytes).unwrap();
        assert_eq!(offset, 44);
        assert_eq!(header.sample_rate, 16_000);
        assert_eq!(header.data_size as usize, samples.len() * 2);
    }

    #[test]
    fn source_arguments_are_exclusive() {
        assert_eq!(
            Source::from_args(Some("birthday"), None, None).unwrap(),
            Source::Melody(MelodyId::HappyBirthday)
        );
        assert_eq!(Source::from_args(None, Some(12), None).unwrap(), Source::Random(12));
        assert!(Source::from_args(Some("doremi"), Some(3), None).is_err());
        assert!(Source::from_args(None, None, Some("kazoo")).is_err());
    }
}
