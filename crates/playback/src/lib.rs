//! Audio engine: tone synthesis, melody sequencing, MP3/WAV playback, recording
//!
//! ```text
//! MelodyPlayer ──► WaveformGenerator ──► envelope ──► SampleSink (I2S | PWM)
//! FilePlayer   ──► decode_mp3 / WAV reader ───────────┘
//! AudioRecorder ◄── SampleSource (microphone) ──► Storage (WAV)
//! AudioTask: serves PlaybackCommands from a Channel, one session at a time
//! ```
//!
//! # Features
//!
//! - `mp3`: real MP3 decoding through `nanomp3`
//! - `std`: host builds (xtask, tests)
//! - `defmt`: `defmt::Format` on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![allow(async_fn_in_trait)] // single-threaded executor, Send bounds not needed

extern crate alloc;

pub mod config;
pub mod decoder;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod file_player;
pub mod melody;
pub mod mp3_decoder;
pub mod mp3_stream;
pub mod recorder;
pub mod sequencer;
pub mod sink;
pub mod task;
pub mod tone;
pub mod transform;
pub mod volume;
pub mod wav;
pub mod waveform;

pub use config::{EngineConfig, SpeakerKind};
pub use effects::Cue;
pub use engine::{CancelToken, RepeatMode};
pub use error::{AudioError, PlayOutcome};
pub use file_player::FilePlayer;
pub use melody::MelodyId;
pub use mp3_decoder::NanoMp3Decoder;
pub use recorder::{AudioRecorder, RecordingInfo, RecordingLock};
pub use sequencer::MelodyPlayer;
pub use sink::{I2sSink, PwmSink, SampleSink, Speaker};
pub use task::{AudioControl, AudioTask, CommandChannel, PlaybackCommand};
pub use tone::{Timbre, Tone};
pub use volume::VoiceSettings;
