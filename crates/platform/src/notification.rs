//! Publish/subscribe notification bus seam.
//!
//! Subsystems (speech recognition, automation, TTS, display, audio) talk to
//! each other through fire-and-forget messages keyed by topic. The audio
//! engine only needs to pause/resume its neighbours around playback and
//! recording and to announce completion, so the event vocabulary is small.

/// Notification topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topic {
    /// Speech-recognition (wake word / command) task
    Sr,
    /// Offline automation behaviours
    Automation,
    /// Text-to-speech engine
    Tts,
    /// Audio recording results
    Audio,
    /// Screen / face animation
    Display,
    /// Melody player requests
    Note,
    /// Speaker playback status
    Speaker,
}

impl Topic {
    /// Wire name used by the firmware's string-keyed bus.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sr => "sr",
            Self::Automation => "automation",
            Self::Tts => "tts",
            Self::Audio => "audio",
            Self::Display => "display",
            Self::Note => "note",
            Self::Speaker => "speaker",
        }
    }
}

/// Event payload carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemEvent {
    /// Ask a subsystem to pause (release the microphone / speaker).
    Pause,
    /// Ask a paused subsystem to resume.
    Resume,
    /// A recording session has started.
    RecordingStarted,
    /// A recording session has stopped (display hint).
    RecordingStopped,
    /// The recording file is complete and closed.
    RecordingComplete,
    /// TTS audio is being played.
    TtsActive,
    /// Speaker playback started.
    PlaybackStarted,
    /// Speaker playback ran to completion or was stopped on request.
    PlaybackFinished,
    /// Speaker playback failed; nothing (or only part) was heard.
    PlaybackFailed,
}

/// Fire-and-forget notification bus.
pub trait NotificationBus {
    /// Publish `event` on `topic`. Never blocks; a full queue drops the event.
    fn send(&self, topic: Topic, event: SystemEvent);

    /// Wait up to `timeout_ms` for the next event on `topic`.
    fn consume(
        &self,
        topic: Topic,
        timeout_ms: u32,
    ) -> impl core::future::Future<Output = Option<SystemEvent>>;
}
