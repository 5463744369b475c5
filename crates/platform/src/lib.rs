//! Hardware Abstraction Layer (HAL) for the Cozmo companion robot audio path
//!
//! This crate provides trait-based abstractions for the hardware the audio
//! engine touches, enabling development and testing without a physical robot.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware tasks)
//!         ↓
//! Feature Layer (playback: synthesis, sequencing, decoding, recording)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (ESP32 I2S / LEDC / ADC drivers, flash filesystem)
//! ```
//!
//! # Abstractions
//!
//! - [`AudioCodec`] - I2S amplifier output
//! - [`TonePwm`] - PWM buzzer output
//! - [`SampleSource`] - microphone input (analog or I2S)
//! - [`Storage`] - path-addressed file access
//! - [`NotificationBus`] - pub/sub messages to neighbouring subsystems
//!
//! # Features
//!
//! - `std`: Enable standard library support (local filesystem storage, mocks)
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{AudioCodec, AudioConfig};
//!
//! async fn example<C: AudioCodec>(codec: &mut C) {
//!     codec.init(AudioConfig::speaker_default()).await.ok();
//!     codec.start().await.ok();
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // single-threaded executor, Send bounds not needed

pub mod audio;
pub mod audio_types;
pub mod config;
pub mod notification;
pub mod storage;

#[cfg(feature = "std")]
pub mod storage_local;

// Mocks double as host-side fakes for the xtask renderer.
#[cfg(any(test, feature = "std"))]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    missing_docs
)]
pub mod mocks;

// Re-export main high-level traits
pub use audio::{AudioCodec, AudioConfig, SampleSource, SourceFormat, TonePwm};
pub use audio_types::{Amplitude, OutOfRangeError, SampleRateHz, VolumePercent};
pub use notification::{NotificationBus, SystemEvent, Topic};
pub use storage::{File, FileWriter, Storage};
