//! Error taxonomy for the audio engine.
//!
//! Every fallible engine operation returns [`AudioError`]. Cooperative
//! cancellation is not an error: it surfaces as
//! [`PlayOutcome::Interrupted`].

use crate::decoder::DecodeError;
use crate::wav::WavError;

/// Errors returned by engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError {
    /// The sink or codec is not ready, or refused to start.
    HardwareUnavailable,
    /// A PCM or input buffer could not be allocated.
    OutOfMemory,
    /// The compressed stream could not be decoded.
    Decode(DecodeError),
    /// A WAV container was malformed or unsupported.
    Wav(WavError),
    /// A request was rejected at entry; nothing was played or written.
    InvalidParameter(&'static str),
    /// The filesystem refused an open, read or write.
    Storage,
    /// The sink reported zero samples written, or failed mid-write.
    SinkWrite,
    /// A recording is already in progress.
    RecordingBusy,
}

impl core::fmt::Display for AudioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HardwareUnavailable => write!(f, "audio hardware unavailable"),
            Self::OutOfMemory => write!(f, "out of memory for audio buffer"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::Wav(e) => write!(f, "wav error: {e}"),
            Self::InvalidParameter(what) => write!(f, "invalid parameter: {what}"),
            Self::Storage => write!(f, "storage error"),
            Self::SinkWrite => write!(f, "sink write failed"),
            Self::RecordingBusy => write!(f, "a recording is already in progress"),
        }
    }
}

impl From<DecodeError> for AudioError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<WavError> for AudioError {
    fn from(e: WavError) -> Self {
        Self::Wav(e)
    }
}

/// How a playback session ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayOutcome {
    /// Every requested pass played to the end.
    Completed,
    /// The cancellation token was raised; playback stopped between notes.
    Interrupted,
}
