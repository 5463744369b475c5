//! Microphone recording to a 16-bit mono WAV file.
//!
//! While a recording runs, speech recognition, automation and TTS are asked
//! to pause so they release the microphone and the speaker. They are told
//! to resume on every exit path, including errors, through [`PauseGuard`].

#![allow(clippy::arithmetic_side_effects)]

use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, Ordering};

use alloc::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use platform::audio::{SampleSource, SourceFormat};
use platform::config::{MIC_READ_FRAMES, PAUSE_SETTLE_MS, RECORDING_DIR};
use platform::notification::{NotificationBus, SystemEvent, Topic};
use platform::storage::{FileWriter, Storage};

use crate::error::AudioError;
use crate::transform::i32_to_i16;
use crate::wav::WavHeader;

/// Longest recording path: `/recordings/recording_<u64>.wav`.
pub type RecordingPath = heapless::String<48>;

/// Subsystems paused while the microphone is in use.
const PAUSED_TOPICS: [Topic; 3] = [Topic::Sr, Topic::Automation, Topic::Tts];

/// Microphone read timeout.
const MIC_TIMEOUT_MS: u32 = 1_000;

/// Consecutive empty reads tolerated before giving up.
const MAX_EMPTY_READS: u32 = 3;

/// Allows one recording at a time.
#[derive(Debug, Default)]
pub struct RecordingLock(AtomicBool);

impl RecordingLock {
    /// Create an unlocked lock.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Take the lock, or `None` if a recording is running.
    pub fn try_acquire(&self) -> Option<RecordingGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RecordingGuard(&self.0))
    }

    /// Whether a recording is running.
    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the [`RecordingLock`] on drop.
#[derive(Debug)]
pub struct RecordingGuard<'a>(&'a AtomicBool);

impl Drop for RecordingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends `Pause` to the neighbouring subsystems, and `Resume` on drop.
pub struct PauseGuard<'b, B: NotificationBus> {
    bus: &'b B,
}

impl<'b, B: NotificationBus> PauseGuard<'b, B> {
    /// Pause speech recognition, automation and TTS.
    pub fn new(bus: &'b B) -> Self {
        for topic in PAUSED_TOPICS {
            bus.send(topic, SystemEvent::Pause);
        }
        Self { bus }
    }
}

impl<B: NotificationBus> Drop for PauseGuard<'_, B> {
    fn drop(&mut self) {
        for topic in PAUSED_TOPICS {
            self.bus.send(topic, SystemEvent::Resume);
        }
    }
}

/// Result of a finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingInfo {
    /// Where the file was written
    pub path: RecordingPath,
    /// Sample rate of the file
    pub sample_rate: u32,
    /// Mono frames written
    pub frames: u32,
    /// PCM bytes after the header
    pub data_bytes: u32,
}

impl RecordingInfo {
    /// Recorded length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match self.sample_rate {
            0 => 0,
            rate => u64::from(self.frames) * 1000 / u64::from(rate),
        }
    }
}

/// Build `/recordings/recording_<stamp_ms>.wav`.
pub fn recording_path(stamp_ms: u64) -> Result<RecordingPath, AudioError> {
    let mut path = RecordingPath::new();
    write!(path, "{RECORDING_DIR}/recording_{stamp_ms}.wav")
        .map_err(|_| AudioError::InvalidParameter("recording path too long"))?;
    Ok(path)
}

/// Records from a [`SampleSource`] into storage.
pub struct AudioRecorder<'a, M: SampleSource, B: NotificationBus, D: DelayNs> {
    mic: M,
    bus: &'a B,
    delay: D,
    lock: &'a RecordingLock,
}

impl<'a, M: SampleSource, B: NotificationBus, D: DelayNs> AudioRecorder<'a, M, B, D> {
    /// Create a recorder. `lock` is shared by everything that may record.
    pub fn new(mic: M, bus: &'a B, delay: D, lock: &'a RecordingLock) -> Self {
        Self {
            mic,
            bus,
            delay,
            lock,
        }
    }

    /// The microphone.
    pub fn mic(&self) -> &M {
        &self.mic
    }

    /// The settle delay.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Record `duration_ms` of audio to `/recordings/recording_<stamp_ms>.wav`.
    ///
    /// The file is 16-bit mono at the microphone's sample rate. 32-bit
    /// samples keep their upper 16 bits; stereo frames are averaged.
    pub async fn record<St: Storage>(
        &mut self,
        storage: &mut St,
        duration_ms: u32,
        stamp_ms: u64,
    ) -> Result<RecordingInfo, AudioError> {
        if duration_ms == 0 {
            return Err(AudioError::InvalidParameter("recording duration must be non-zero"));
        }
        let format = self.mic.format();
        check_format(format)?;
        let Some(_lock) = self.lock.try_acquire() else {
            tracing::warn!("recording already in progress");
            return Err(AudioError::RecordingBusy);
        };

        let _paused = PauseGuard::new(self.bus);
        self.bus.send(Topic::Display, SystemEvent::RecordingStarted);
        let result = self.capture(storage, format, duration_ms, stamp_ms).await;
        self.bus.send(Topic::Display, SystemEvent::RecordingStopped);

        match &result {
            Ok(info) => {
                tracing::info!(
                    "recorded {} ({} frames, {} ms)",
                    info.path.as_str(),
                    info.frames,
                    info.duration_ms()
                );
                self.bus.send(Topic::Audio, SystemEvent::RecordingComplete);
            }
            Err(e) => tracing::error!("recording failed: {}", e),
        }
        result
    }

    async fn capture<St: Storage>(
        &mut self,
        storage: &mut St,
        format: SourceFormat,
        duration_ms: u32,
        stamp_ms: u64,
    ) -> Result<RecordingInfo, AudioError> {
        self.delay.delay_ms(PAUSE_SETTLE_MS).await;

        let path = recording_path(stamp_ms)?;
        let total_frames = u32::try_from(u64::from(format.sample_rate) * u64::from(duration_ms) / 1000)
            .map_err(|_| AudioError::InvalidParameter("recording too long"))?;
        let header = WavHeader::pcm16(format.sample_rate, 1, total_frames);

        let mut file = storage
            .create_file(path.as_str())
            .await
            .map_err(|_| AudioError::Storage)?;
        write_all(&mut file, &header.encode()).await?;

        let frame_bytes = format.frame_bytes();
        let mut raw: Vec<u8> = Vec::new();
        raw.try_reserve_exact(MIC_READ_FRAMES * frame_bytes)
            .map_err(|_| AudioError::OutOfMemory)?;
        raw.resize(MIC_READ_FRAMES * frame_bytes, 0);
        let mut out: Vec<u8> = Vec::new();
        out.try_reserve_exact(MIC_READ_FRAMES * 2)
            .map_err(|_| AudioError::OutOfMemory)?;

        let mut written = 0u32;
        let mut empty_reads = 0u32;
        while written < total_frames {
            let n = self
                .mic
                .fill(&mut raw, MIC_TIMEOUT_MS)
                .await
                .map_err(|_| AudioError::HardwareUnavailable)?;
            if n < frame_bytes {
                empty_reads += 1;
                tracing::warn!("microphone returned {} bytes", n);
                if empty_reads >= MAX_EMPTY_READS {
                    return Err(AudioError::HardwareUnavailable);
                }
                continue;
            }
            empty_reads = 0;

            // the last read may overshoot the requested duration
            let frames_left = (total_frames - written) as usize;
            let take = (n / frame_bytes).min(frames_left) * frame_bytes;
            out.clear();
            let frames = to_mono16(raw.get(..take).unwrap_or(&[]), format, &mut out);
            write_all(&mut file, &out).await?;
            written += frames;
        }

        file.flush().await.map_err(|_| AudioError::Storage)?;
        Ok(RecordingInfo {
            path,
            sample_rate: format.sample_rate,
            frames: written,
            data_bytes: written * 2,
        })
    }
}

fn check_format(format: SourceFormat) -> Result<(), AudioError> {
    if !matches!(format.bits_per_sample, 16 | 32) {
        return Err(AudioError::InvalidParameter("microphone must deliver 16 or 32 bit samples"));
    }
    if !matches!(format.channels, 1 | 2) {
        return Err(AudioError::InvalidParameter("microphone must be mono or stereo"));
    }
    if format.sample_rate == 0 {
        return Err(AudioError::InvalidParameter("microphone sample rate is zero"));
    }
    Ok(())
}

/// Convert whole frames of `raw` to 16-bit mono little-endian bytes.
/// Returns the number of frames converted; a trailing partial frame is
/// dropped.
fn to_mono16(raw: &[u8], format: SourceFormat, out: &mut Vec<u8>) -> u32 {
    let slot = usize::from(format.bits_per_sample / 8);
    let mut frames = 0u32;
    for frame in raw.chunks_exact(format.frame_bytes()) {
        let mut sum = 0i32;
        for s in frame.chunks_exact(slot) {
            sum += i32::from(read_sample(s));
        }
        let mono = sum / i32::from(format.channels);
        #[allow(clippy::cast_possible_truncation)] // average of i16 values
        out.extend_from_slice(&(mono as i16).to_le_bytes());
        frames += 1;
    }
    frames
}

fn read_sample(slot: &[u8]) -> i16 {
    match *slot {
        [lo, hi] => i16::from_le_bytes([lo, hi]),
        [a, b, c, d] => i32_to_i16(i32::from_le_bytes([a, b, c, d])),
        _ => 0,
    }
}

async fn write_all<W: FileWriter>(file: &mut W, mut data: &[u8]) -> Result<(), AudioError> {
    while !data.is_empty() {
        match file.write(data).await.map_err(|_| AudioError::Storage)? {
            0 => return Err(AudioError::Storage),
            n => data = data.get(n..).unwrap_or(&[]),
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_path() {
        assert_eq!(
            recording_path(123_456).unwrap().as_str(),
            "/recordings/recording_123456.wav"
        );
        assert!(recording_path(u64::MAX).is_ok());
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let lock = RecordingLock::new();
        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());
        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn test_stereo_32_bit_to_mono_16() {
        let format = SourceFormat {
            sample_rate: 16_000,
            bits_per_sample: 32,
            channels: 2,
        };
        let mut raw = Vec::new();
        for (l, r) in [(100i32, 300i32), (-1000, -2000)] {
            raw.extend_from_slice(&(l << 16).to_le_bytes());
            raw.extend_from_slice(&(r << 16).to_le_bytes());
        }
        raw.push(0xAA); // partial frame
        let mut out = Vec::new();
        assert_eq!(to_mono16(&raw, format, &mut out), 2);
        assert_eq!(out, [200i16.to_le_bytes(), (-1500i16).to_le_bytes()].concat());
    }

    #[test]
    fn test_format_checks() {
        let bad_bits = SourceFormat {
            sample_rate: 16_000,
            bits_per_sample: 24,
            channels: 1,
        };
        assert!(check_format(bad_bits).is_err());
        let bad_channels = SourceFormat {
            sample_rate: 16_000,
            bits_per_sample: 16,
            channels: 4,
        };
        assert!(check_format(bad_channels).is_err());
    }
}
