//! Named melodies and the procedural melody generator.

#![allow(clippy::arithmetic_side_effects)]

use alloc::vec::Vec;

use crate::error::AudioError;
use crate::tone::{pitch::*, NoteLength, Tone};

const Q: u32 = NoteLength::Quarter.ms();
const H: u32 = NoteLength::Half.ms();
const E: u32 = NoteLength::Eighth.ms();
const W: u32 = NoteLength::Whole.ms();

const fn t(frequency_hz: u16, duration_ms: u32) -> Tone {
    Tone::new(frequency_hz, duration_ms)
}

static DOREMI_SCALE: [Tone; 8] = [
    t(C4, Q),
    t(D4, Q),
    t(E4, Q),
    t(F4, Q),
    t(G4, Q),
    t(A4, Q),
    t(B4, Q),
    t(C5, H),
];

#[rustfmt::skip]
static HAPPY_BIRTHDAY: [Tone; 25] = [
    t(G4, E), t(G4, E), t(A4, Q), t(G4, Q), t(C5, Q), t(B4, H),
    t(G4, E), t(G4, E), t(A4, Q), t(G4, Q), t(D5, Q), t(C5, H),
    t(G4, E), t(G4, E), t(G5, Q), t(E5, Q), t(C5, Q), t(B4, Q), t(A4, H),
    t(F5, E), t(F5, E), t(E5, Q), t(C5, Q), t(D5, Q), t(C5, H),
];

#[rustfmt::skip]
static THEME: [Tone; 84] = [
    // opening
    t(C4, W), t(E4, W), t(G4, W), t(REST, Q),
    t(C4, H), t(E4, H), t(G3, H), t(B3, H),
    t(C4, H), t(E4, H),
    t(F4, H), t(A4, H), t(C4, Q), t(E4, Q),
    t(G3, Q), t(B3, Q),
    // main phrase
    t(A3, H), t(C4, H), t(C4, Q), t(E4, Q),
    t(F4, Q), t(A4, Q),
    t(G4, H), t(B4, H), t(F4, Q), t(A4, Q),
    t(C4, Q), t(E4, Q),
    t(A3, H), t(C4, H), t(F3, Q), t(A3, Q),
    t(C4, Q), t(E4, Q),
    // development
    t(F4, Q), t(A4, Q), t(G4, Q), t(B4, Q),
    t(A4, H), t(C5, H),
    t(G4, Q), t(B4, Q), t(F4, Q), t(A4, Q),
    t(C4, H), t(E4, H),
    t(F4, Q), t(A4, Q), t(A4, Q), t(C5, Q),
    t(C5, H), t(E5, H),
    // climax
    t(A4, H), t(C5, H), t(G4, Q), t(B4, Q),
    t(F4, Q), t(A4, Q),
    t(C5, W), t(E5, W), t(A4, H), t(C5, H),
    t(F4, Q), t(A4, Q), t(G4, Q), t(B4, Q),
    t(A4, H), t(C5, H),
    // resolution
    t(G4, Q), t(B4, Q), t(F4, Q), t(A4, Q),
    t(C4, H), t(E4, H),
    t(A3, H), t(C4, H), t(F3, Q), t(A3, Q),
    t(C4, Q), t(E4, Q),
    t(C4, W), t(E4, W), t(G4, W), t(REST, H),
];

/// Built-in melodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MelodyId {
    /// C4 to C5, quarters, final half note
    DoReMiScale,
    /// Four lines of the birthday song
    HappyBirthday,
    /// Arpeggiated chord theme ending on a half rest
    Theme,
}

impl MelodyId {
    /// Every built-in melody.
    pub const ALL: [Self; 3] = [Self::DoReMiScale, Self::HappyBirthday, Self::Theme];

    /// The note table.
    pub fn tones(self) -> &'static [Tone] {
        match self {
            Self::DoReMiScale => &DOREMI_SCALE,
            Self::HappyBirthday => &HAPPY_BIRTHDAY,
            Self::Theme => &THEME,
        }
    }

    /// Short name used on the command line and in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DoReMiScale => "doremi",
            Self::HappyBirthday => "birthday",
            Self::Theme => "theme",
        }
    }

    /// Case-insensitive lookup by [`MelodyId::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

/// C4…C5 in quarters, used by `play_scale`.
pub fn scale(ascending: bool) -> [Tone; 8] {
    let mut notes = [C4, D4, E4, F4, G4, A4, B4, C5].map(|f| Tone::new(f, Q));
    if !ascending {
        notes.reverse();
    }
    notes
}

/// The seven degrees of C major used by the generator.
pub const C_MAJOR: [u16; 7] = [C4, D4, E4, F4, G4, A4, B4];

const TOP: usize = C_MAJOR.len() - 1;

/// `seed = seed * 1103515245 + 12345 mod 2^31`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Fixed seed, for reproducible output.
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the milliseconds since boot.
    pub fn from_uptime() -> Self {
        #[allow(clippy::cast_possible_truncation)] // low bits are enough for a seed
        Self::new(embassy_time::Instant::now().as_millis() as u32)
    }

    /// Next 31-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345)
            & 0x7FFF_FFFF;
        self.state
    }

    /// Value in `0..n` (`n` must be non-zero).
    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n.max(1)
    }
}

/// Generate `count` notes on the C-major scale.
///
/// With `start == None` the melody opens on C or G at random and ends on C.
/// With an explicit start index (0–6) it opens there and ends wherever the
/// walk lands. No scale degree appears three times in a row.
pub fn generate_random_melody(
    rng: &mut Lcg,
    count: usize,
    start: Option<usize>,
) -> Result<Vec<Tone>, AudioError> {
    if count == 0 {
        return Err(AudioError::InvalidParameter("note count must be non-zero"));
    }
    if start.is_some_and(|s| s > TOP) {
        return Err(AudioError::InvalidParameter("start index outside the scale"));
    }

    let mut melody = Vec::new();
    melody
        .try_reserve_exact(count)
        .map_err(|_| AudioError::OutOfMemory)?;

    let force_end_on_c = start.is_none();
    let mut current = start.unwrap_or(if rng.below(2) == 0 { 0 } else { 4 });
    let mut repeats = 0u8;
    let last = count - 1;

    for pos in 0..count {
        let index = if force_end_on_c && pos == last {
            0
        } else if pos == 0 {
            current
        } else {
            let mut next = step(rng, current);
            if next == current {
                repeats += 1;
                if repeats >= 2 {
                    next = adjacent(current);
                    repeats = 0;
                }
            } else {
                repeats = 0;
            }
            // the forced C that follows must not make a third C
            if force_end_on_c && count >= 3 && pos == last - 1 && next == 0 && current == 0 {
                next = 1;
                repeats = 0;
            }
            next
        };

        let boundary = pos == last || (pos + 1) % 4 == 0;
        let duration = note_length(rng, boundary);
        let frequency = C_MAJOR.get(index).copied().unwrap_or(C4);
        melody.push(Tone::new(frequency, duration));
        current = index;
    }

    Ok(melody)
}

fn step(rng: &mut Lcg, current: usize) -> usize {
    let size = match rng.below(100) {
        0..=59 => 1,
        60..=84 => 2,
        _ => 3,
    };
    if rng.below(2) == 0 {
        (current + size).min(TOP)
    } else {
        current.saturating_sub(size)
    }
}

fn adjacent(index: usize) -> usize {
    if index >= TOP {
        index - 1
    } else {
        index + 1
    }
}

fn note_length(rng: &mut Lcg, phrase_boundary: bool) -> u32 {
    let r = rng.below(100);
    let (quarter, eighth) = if phrase_boundary { (40, 60) } else { (60, 90) };
    if r < quarter {
        Q
    } else if r < eighth {
        E
    } else {
        H
    }
}
