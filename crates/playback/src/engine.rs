//! Melody session state machine and cooperative cancellation.
//!
//! `PlaybackSession` is a pure, allocation-free state machine that decides
//! which note plays next and when a gap is due. It has no I/O: the sequencer
//! reads each [`Step`] and performs the synthesis, write or sleep itself.
//! This separation keeps repeat and gap rules testable on the host.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::AudioError;

/// Where the session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// Not started, finished, or stopped.
    Idle,
    /// A note is being rendered and written.
    PlayingNote,
    /// Short silence between two notes of a pass.
    InterNoteGap,
    /// Longer silence between two passes.
    RepeatGap,
}

/// How many times a melody is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RepeatMode {
    /// A single pass.
    Once,
    /// Exactly this many passes.
    Times(u32),
    /// Until cancelled.
    Forever,
}

impl RepeatMode {
    /// Map the firmware's integer convention: `0` once, `-1` forever,
    /// `N > 0` N passes.
    pub fn from_count(count: i32) -> Result<Self, AudioError> {
        match count {
            0 => Ok(Self::Once),
            -1 => Ok(Self::Forever),
            n if n > 0 => Ok(Self::Times(n.unsigned_abs())),
            _ => Err(AudioError::InvalidParameter("repeat count below -1")),
        }
    }

    /// Total passes, `None` for unbounded.
    pub const fn passes(self) -> Option<u32> {
        match self {
            Self::Once => Some(1),
            Self::Times(n) => Some(n),
            Self::Forever => None,
        }
    }
}

/// Next action for the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Render and write the note at this index.
    Note(usize),
    /// Sleep for the inter-note gap.
    NoteGap,
    /// Sleep for the repeat gap.
    RepeatGap,
    /// All passes are done.
    Finished,
}

/// Progress through one melody.
///
/// All fields are private; state is mutated only through [`advance`] and
/// [`stop`].
///
/// [`advance`]: PlaybackSession::advance
/// [`stop`]: PlaybackSession::stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    state: SequencerState,
    note_count: usize,
    index: usize,
    passes_done: u32,
    repeat: RepeatMode,
}

impl PlaybackSession {
    /// Create an idle session over `note_count` notes.
    pub fn new(note_count: usize, repeat: RepeatMode) -> Result<Self, AudioError> {
        if note_count == 0 {
            return Err(AudioError::InvalidParameter("melody has no notes"));
        }
        if repeat == RepeatMode::Times(0) {
            return Err(AudioError::InvalidParameter("zero passes requested"));
        }
        Ok(Self {
            state: SequencerState::Idle,
            note_count,
            index: 0,
            passes_done: 0,
            repeat,
        })
    }

    /// Move to the next step.
    ///
    /// Transitions:
    /// - `Idle → PlayingNote(0)` on the first call
    /// - `PlayingNote(i) → InterNoteGap` when a note follows in this pass
    /// - `InterNoteGap → PlayingNote(i + 1)`
    /// - `PlayingNote(last) → RepeatGap` when another pass is due and the
    ///   melody has more than one note, straight to `PlayingNote(0)` otherwise
    /// - `RepeatGap → PlayingNote(0)`
    /// - `PlayingNote(last) → Idle` after the final pass
    pub fn advance(&mut self) -> Step {
        match self.state {
            SequencerState::Idle => {
                if self.passes_done > 0 {
                    return Step::Finished;
                }
                self.index = 0;
                self.state = SequencerState::PlayingNote;
                Step::Note(0)
            }
            SequencerState::PlayingNote => {
                let next = self.index.saturating_add(1);
                if next < self.note_count {
                    self.state = SequencerState::InterNoteGap;
                    return Step::NoteGap;
                }
                self.passes_done = self.passes_done.saturating_add(1);
                let more = self.repeat.passes().map_or(true, |n| self.passes_done < n);
                if !more {
                    self.state = SequencerState::Idle;
                    return Step::Finished;
                }
                if self.note_count > 1 {
                    self.state = SequencerState::RepeatGap;
                    Step::RepeatGap
                } else {
                    self.index = 0;
                    Step::Note(0)
                }
            }
            SequencerState::InterNoteGap => {
                self.index = self.index.saturating_add(1);
                self.state = SequencerState::PlayingNote;
                Step::Note(self.index)
            }
            SequencerState::RepeatGap => {
                self.index = 0;
                self.state = SequencerState::PlayingNote;
                Step::Note(0)
            }
        }
    }

    /// Abandon the session.
    pub fn stop(&mut self) {
        self.state = SequencerState::Idle;
        self.passes_done = self.passes_done.max(1);
    }

    /// Current state.
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Index of the note most recently started.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Completed passes.
    pub fn passes_done(&self) -> u32 {
        self.passes_done
    }
}

/// Cancellation flag shared between the requester and the playing task.
///
/// Checked between notes and between file chunks only.
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    /// Create a lowered token.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Ask the running session to stop at its next checkpoint.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop is pending, without consuming it.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume a pending stop. Returns `true` if one was pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
