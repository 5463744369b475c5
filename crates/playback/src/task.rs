//! The dedicated audio task and its command queue.
//!
//! Playback blocks the task that runs it, so all of it happens on one task
//! fed through a bounded [`Channel`]. Other tasks hold an [`AudioControl`]
//! and enqueue [`PlaybackCommand`]s. A `Stop` also raises the shared
//! [`CancelToken`], so a running session halts at its next note or chunk
//! instead of waiting for the queue to drain.
//!
//! Only one session plays at a time; requests arriving meanwhile wait in
//! the queue.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;
use platform::audio_types::SampleRateHz;
use platform::notification::{NotificationBus, SystemEvent, Topic};
use platform::storage::Storage;

use crate::decoder::FrameDecoder;
use crate::effects::Cue;
use crate::engine::{CancelToken, RepeatMode};
use crate::error::{AudioError, PlayOutcome};
use crate::file_player::FilePlayer;
use crate::melody::MelodyId;
use crate::sequencer::MelodyPlayer;
use crate::sink::SampleSink;

/// Commands the queue holds before senders wait.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

/// Notes per generated melody in random mode.
pub const RANDOM_MELODY_NOTES: usize = 64;

/// Silence between generated melodies in random mode.
pub const RANDOM_PAUSE_MS: u32 = 300;

/// Path of a sound file on storage.
pub type FilePath = heapless::String<64>;

/// Requests for the audio task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Play a named melody; `repeat` is `0` once, `-1` forever, `N` N times.
    PlayMelody {
        /// Which melody
        id: MelodyId,
        /// Repeat count
        repeat: i32,
    },
    /// Loop generated melodies until stopped.
    PlayRandom {
        /// Notes per melody
        notes: usize,
    },
    /// Play an MP3 or WAV file.
    PlayFile(FilePath),
    /// Play a sound-effect cue.
    Cue(Cue),
    /// Stop whatever is playing.
    Stop,
}

impl PlaybackCommand {
    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PlayMelody { .. } => "melody",
            Self::PlayRandom { .. } => "random",
            Self::PlayFile(_) => "file",
            Self::Cue(_) => "cue",
            Self::Stop => "stop",
        }
    }
}

/// Queue between [`AudioControl`] and [`AudioTask`].
pub type CommandChannel<M> = Channel<M, PlaybackCommand, COMMAND_QUEUE_DEPTH>;

/// Sending side of the audio task.
pub struct AudioControl<'a, M: RawMutex> {
    channel: &'a CommandChannel<M>,
    cancel: &'a CancelToken,
}

impl<M: RawMutex> Clone for AudioControl<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex> Copy for AudioControl<'_, M> {}

impl<'a, M: RawMutex> AudioControl<'a, M> {
    /// Create a control handle.
    pub const fn new(channel: &'a CommandChannel<M>, cancel: &'a CancelToken) -> Self {
        Self { channel, cancel }
    }

    /// Enqueue `command`, waiting for room.
    pub async fn send(&self, command: PlaybackCommand) {
        if command == PlaybackCommand::Stop {
            self.cancel.request();
        }
        self.channel.send(command).await;
    }

    /// Enqueue `command` if there is room. A full queue hands it back.
    ///
    /// `Stop` raises the cancellation token even when the queue is full.
    pub fn try_send(&self, command: PlaybackCommand) -> Result<(), PlaybackCommand> {
        if command == PlaybackCommand::Stop {
            self.cancel.request();
        }
        self.channel.try_send(command).map_err(|e| {
            let embassy_sync::channel::TrySendError::Full(command) = e;
            tracing::warn!("audio queue full, dropping {}", command.name());
            command
        })
    }

    /// Ask the task to stop.
    pub fn stop(&self) {
        // the token alone halts the session; the queued Stop also silences the sink
        let _ = self.try_send(PlaybackCommand::Stop);
    }
}

/// Runs playback commands one at a time.
pub struct AudioTask<'a, M, S, D, Dec, St, B>
where
    M: RawMutex,
    S: SampleSink,
    D: DelayNs,
    Dec: FrameDecoder,
    St: Storage,
    B: NotificationBus,
{
    channel: &'a CommandChannel<M>,
    cancel: &'a CancelToken,
    bus: &'a B,
    player: MelodyPlayer<'a, S, D>,
    files: FilePlayer<Dec>,
    storage: St,
    pending: Option<PlaybackCommand>,
}

impl<'a, M, S, D, Dec, St, B> AudioTask<'a, M, S, D, Dec, St, B>
where
    M: RawMutex,
    S: SampleSink,
    D: DelayNs,
    Dec: FrameDecoder,
    St: Storage,
    B: NotificationBus,
{
    /// Assemble the task from its parts.
    pub fn new(
        channel: &'a CommandChannel<M>,
        cancel: &'a CancelToken,
        bus: &'a B,
        player: MelodyPlayer<'a, S, D>,
        files: FilePlayer<Dec>,
        storage: St,
    ) -> Self {
        Self {
            channel,
            cancel,
            bus,
            player,
            files,
            storage,
            pending: None,
        }
    }

    /// Serve commands forever.
    pub async fn run(&mut self) -> ! {
        tracing::info!("audio task started");
        loop {
            let command = match self.pending.take() {
                Some(c) => c,
                None => self.channel.receive().await,
            };
            // failures are logged and reported on the bus
            let _ = self.handle(command).await;
        }
    }

    /// Serve everything already queued, then return how many commands ran.
    pub async fn run_until_idle(&mut self) -> usize {
        let mut served = 0;
        loop {
            let command = match self.pending.take() {
                Some(c) => c,
                None => match self.channel.try_receive() {
                    Ok(c) => c,
                    Err(_) => return served,
                },
            };
            let _ = self.handle(command).await;
            served += 1;
        }
    }

    /// Execute one command.
    pub async fn handle(&mut self, command: PlaybackCommand) -> Result<PlayOutcome, AudioError> {
        tracing::debug!("audio command: {}", command.name());
        if command == PlaybackCommand::Stop {
            self.cancel.take();
            self.player.sink_mut().stop().await?;
            return Ok(PlayOutcome::Interrupted);
        }

        self.bus.send(Topic::Sr, SystemEvent::Pause);
        self.bus.send(Topic::Speaker, SystemEvent::PlaybackStarted);

        let result = match command {
            PlaybackCommand::PlayMelody { id, repeat } => {
                self.player.play_melody(id, repeat, self.cancel).await
            }
            PlaybackCommand::PlayRandom { notes } => self.random_loop(notes).await,
            PlaybackCommand::PlayFile(path) => {
                let outcome = self
                    .files
                    .play(&mut self.storage, self.player.sink_mut(), path.as_str(), self.cancel)
                    .await;
                let restored = self.restore_format().await;
                outcome.and_then(|o| restored.map(|()| o))
            }
            PlaybackCommand::Cue(cue) => self.player.play_cue(cue).await.map(|()| PlayOutcome::Completed),
            PlaybackCommand::Stop => Ok(PlayOutcome::Interrupted),
        };

        self.bus.send(Topic::Sr, SystemEvent::Resume);
        match &result {
            Ok(_) => self.bus.send(Topic::Speaker, SystemEvent::PlaybackFinished),
            Err(e) => {
                tracing::error!("playback failed: {}", e);
                self.bus.send(Topic::Speaker, SystemEvent::PlaybackFailed);
            }
        }
        result
    }

    /// Generated melodies back to back until a stop or another command.
    async fn random_loop(&mut self, notes: usize) -> Result<PlayOutcome, AudioError> {
        tracing::info!("random mode: {} notes per melody", notes);
        loop {
            let outcome = self.player.play_random(notes, RepeatMode::Once, self.cancel).await?;
            if outcome == PlayOutcome::Interrupted {
                return Ok(outcome);
            }
            while let Ok(command) = self.channel.try_receive() {
                match command {
                    PlaybackCommand::PlayRandom { .. } => {
                        tracing::warn!("random melodies already playing");
                    }
                    PlaybackCommand::Stop => {
                        self.cancel.take();
                        self.player.sink_mut().stop().await?;
                        return Ok(PlayOutcome::Interrupted);
                    }
                    other => {
                        self.pending = Some(other);
                        return Ok(PlayOutcome::Completed);
                    }
                }
            }
            self.player.delay_mut().delay_ms(RANDOM_PAUSE_MS).await;
        }
    }

    /// Put the sink back to the synthesis format after a file changed it.
    async fn restore_format(&mut self) -> Result<(), AudioError> {
        let config = *self.player.config();
        let sink = self.player.sink_mut();
        if sink.sample_rate() == config.sample_rate_hz && sink.channels() == config.channels {
            return Ok(());
        }
        let rate = SampleRateHz::new(config.sample_rate_hz)
            .map_err(|_| AudioError::InvalidParameter("sample rate out of range"))?;
        sink.set_format(rate, config.channels).await
    }

    /// The melody player.
    pub fn player(&self) -> &MelodyPlayer<'a, S, D> {
        &self.player
    }

    /// The melody player, mutable.
    pub fn player_mut(&mut self) -> &mut MelodyPlayer<'a, S, D> {
        &mut self.player
    }

    /// The file storage.
    pub fn storage(&self) -> &St {
        &self.storage
    }
}
