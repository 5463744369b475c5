//! Application configuration and constants
//!
//! This module defines central configuration values used across the
//! application. Paths, names, and hardware defaults should reference these
//! constants rather than hardcoding values.

/// The application name
pub const APP_NAME: &str = "Cozmo Audio";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory on the flash filesystem where recordings are written.
pub const RECORDING_DIR: &str = "/recordings";

/// Directory holding pre-recorded sound files (MP3/WAV).
pub const SOUNDS_DIR: &str = "/sounds";

/// Default length of a voice recording in milliseconds.
pub const RECORDING_DURATION_MS: u32 = 5_000;

/// Sample rate used for voice recordings.
pub const RECORDING_SAMPLE_RATE: u32 = 16_000;

/// Microphone read chunk, in frames.
pub const MIC_READ_FRAMES: usize = 512;

/// Settle time after pausing subsystems before the microphone is opened.
pub const PAUSE_SETTLE_MS: u32 = 500;

/// Sample rate the TTS engine renders at.
pub const TTS_SAMPLE_RATE: u32 = 16_000;

/// Full application title (name + version)
pub const fn app_title() -> &'static str {
    APP_NAME
}
