//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests and by host tools.

#![cfg(any(test, feature = "std"))]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use crate::audio::{AudioCodec, AudioConfig, SampleSource, SourceFormat, TonePwm};
use crate::notification::{NotificationBus, SystemEvent, Topic};
use crate::storage::{File, FileWriter, Storage};

/// Mock I2S codec
///
/// Records every sample written so tests can inspect exactly what would
/// have reached the amplifier.
pub struct MockAudio {
    config: AudioConfig,
    inits: Vec<AudioConfig>,
    volume: u8,
    playing: bool,
    starts: usize,
    stops: usize,
    written: Vec<i16>,
    writes: usize,
    accept_limit: Option<usize>,
}

impl MockAudio {
    /// Create new mock audio codec
    pub fn new() -> Self {
        Self {
            config: AudioConfig::default(),
            inits: Vec::new(),
            volume: 50,
            playing: false,
            starts: 0,
            stops: 0,
            written: Vec::new(),
            writes: 0,
            accept_limit: None,
        }
    }

    /// Accept at most `limit` samples per write (0 simulates a stalled driver).
    pub fn with_accept_limit(mut self, limit: usize) -> Self {
        self.accept_limit = Some(limit);
        self
    }

    /// Get current hardware volume
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current configuration
    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Every configuration passed to `init`, in order
    pub fn inits(&self) -> &[AudioConfig] {
        &self.inits
    }

    /// Number of `start` calls
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Number of `stop` calls
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Number of `write_samples` calls
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// All samples accepted so far
    pub fn written(&self) -> &[i16] {
        &self.written
    }

    /// Get total samples written
    pub fn samples_written(&self) -> usize {
        self.written.len()
    }
}

impl Default for MockAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCodec for MockAudio {
    type Error = core::convert::Infallible;

    async fn init(&mut self, config: AudioConfig) -> Result<(), Self::Error> {
        self.config = config;
        self.inits.push(config);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.playing = true;
        self.starts += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), Self::Error> {
        self.playing = false;
        self.stops += 1;
        Ok(())
    }

    async fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error> {
        self.volume = volume.min(100);
        Ok(())
    }

    async fn write_samples(&mut self, samples: &[i16]) -> Result<usize, Self::Error> {
        self.writes += 1;
        let n = self
            .accept_limit
            .map_or(samples.len(), |limit| limit.min(samples.len()));
        self.written.extend_from_slice(&samples[..n]);
        Ok(n)
    }
}

/// One carrier/duty change seen by [`MockPwm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmEvent {
    /// `set_frequency(hz)`
    Frequency(u32),
    /// `set_duty_cycle(duty)`
    Duty(u16),
}

/// Mock PWM tone channel with an 8-bit duty resolution.
pub struct MockPwm {
    events: Vec<PwmEvent>,
    frequency: u32,
    duty: u16,
}

impl MockPwm {
    /// Create new mock PWM channel
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            frequency: 1000,
            duty: 0,
        }
    }

    /// Recorded changes, in order
    pub fn events(&self) -> &[PwmEvent] {
        &self.events
    }

    /// Current carrier frequency
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Current duty value
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl Default for MockPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl embedded_hal::pwm::ErrorType for MockPwm {
    type Error = core::convert::Infallible;
}

impl embedded_hal::pwm::SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        self.events.push(PwmEvent::Duty(duty));
        Ok(())
    }
}

impl TonePwm for MockPwm {
    fn set_frequency(&mut self, hz: u32) -> Result<(), Self::Error> {
        self.frequency = hz;
        self.events.push(PwmEvent::Frequency(hz));
        Ok(())
    }
}

/// Delay that returns immediately and adds up the requested time.
///
/// Lets tests assert on gap lengths without sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
    calls: usize,
}

impl MockDelay {
    /// Create new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay, in milliseconds (rounded down)
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }

    /// Total requested delay, in nanoseconds
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }

    /// Number of delay calls
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
    }

    async fn delay_us(&mut self, us: u32) {
        self.calls += 1;
        self.total_ns += u64::from(us) * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

/// Errors produced by [`MockStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStorageError {
    /// No file at the requested path
    NotFound(String),
    /// Writes were disabled with [`MockStorage::fail_writes`]
    WriteRejected,
}

type FileMap = Rc<RefCell<HashMap<String, Vec<u8>>>>;

/// In-memory storage shared between handles.
#[derive(Clone, Default)]
pub struct MockStorage {
    files: FileMap,
    reject_writes: Rc<Cell<bool>>,
}

impl MockStorage {
    /// Create an empty in-memory filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file
    pub fn insert(&self, path: &str, data: &[u8]) {
        self.files.borrow_mut().insert(path.into(), data.to_vec());
    }

    /// Contents of a file, if present
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Make every subsequent `create_file` / `write` fail
    pub fn fail_writes(&self) {
        self.reject_writes.set(true);
    }
}

/// Readable handle into [`MockStorage`].
pub struct MockFile {
    data: Vec<u8>,
    pos: usize,
}

impl File for MockFile {
    type Error = MockStorageError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.data.get(self.pos..).unwrap_or(&[]);
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    async fn seek(&mut self, pos: u64) -> Result<u64, Self::Error> {
        self.pos = usize::try_from(pos).unwrap_or(usize::MAX).min(self.data.len());
        Ok(self.pos as u64)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Writable handle into [`MockStorage`].
pub struct MockWriter {
    files: FileMap,
    path: String,
    reject: Rc<Cell<bool>>,
}

impl FileWriter for MockWriter {
    type Error = MockStorageError;

    async fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if self.reject.get() {
            return Err(MockStorageError::WriteRejected);
        }
        self.files
            .borrow_mut()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(data);
        Ok(data.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Storage for MockStorage {
    type Error = MockStorageError;
    type File = MockFile;
    type Writer = MockWriter;

    async fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let data = self
            .contents(path)
            .ok_or_else(|| MockStorageError::NotFound(path.into()))?;
        Ok(MockFile { data, pos: 0 })
    }

    async fn create_file(&mut self, path: &str) -> Result<Self::Writer, Self::Error> {
        if self.reject_writes.get() {
            return Err(MockStorageError::WriteRejected);
        }
        self.files.borrow_mut().insert(path.into(), Vec::new());
        Ok(MockWriter {
            files: Rc::clone(&self.files),
            path: path.into(),
            reject: Rc::clone(&self.reject_writes),
        })
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.files.borrow().contains_key(path))
    }
}

/// Mock notification bus: records everything sent, serves queued events.
#[derive(Default)]
pub struct MockBus {
    sent: RefCell<Vec<(Topic, SystemEvent)>>,
    inbox: RefCell<VecDeque<(Topic, SystemEvent)>>,
}

impl MockBus {
    /// Create new mock bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for a later `consume`
    pub fn push(&self, topic: Topic, event: SystemEvent) {
        self.inbox.borrow_mut().push_back((topic, event));
    }

    /// Everything sent so far, in order
    pub fn sent(&self) -> Vec<(Topic, SystemEvent)> {
        self.sent.borrow().clone()
    }

    /// Events sent on one topic, in order
    pub fn sent_on(&self, topic: Topic) -> Vec<SystemEvent> {
        self.sent
            .borrow()
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, e)| *e)
            .collect()
    }
}

impl NotificationBus for MockBus {
    fn send(&self, topic: Topic, event: SystemEvent) {
        self.sent.borrow_mut().push((topic, event));
    }

    async fn consume(&self, topic: Topic, _timeout_ms: u32) -> Option<SystemEvent> {
        let mut inbox = self.inbox.borrow_mut();
        let pos = inbox.iter().position(|(t, _)| *t == topic)?;
        inbox.remove(pos).map(|(_, e)| e)
    }
}

/// Microphone that produces a repeating 16-bit ramp in the configured format.
pub struct MockMicrophone {
    format: SourceFormat,
    next: u16,
    fills: usize,
    short_reads: bool,
}

impl MockMicrophone {
    /// Create a microphone delivering `format`
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            next: 0,
            fills: 0,
            short_reads: false,
        }
    }

    /// Deliver only half of each requested buffer
    pub fn with_short_reads(mut self) -> Self {
        self.short_reads = true;
        self
    }

    /// Number of `fill` calls
    pub fn fills(&self) -> usize {
        self.fills
    }
}

impl SampleSource for MockMicrophone {
    type Error = core::convert::Infallible;

    fn format(&self) -> SourceFormat {
        self.format
    }

    async fn fill(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, Self::Error> {
        self.fills += 1;
        let frame = self.format.frame_bytes().max(1);
        let mut len = buf.len() - buf.len() % frame;
        if self.short_reads {
            len = (len / 2) - (len / 2) % frame;
        }
        let slot = usize::from(self.format.bits_per_sample / 8).max(1);
        for chunk in buf[..len].chunks_exact_mut(slot) {
            let value = self.next;
            self.next = self.next.wrapping_add(1);
            // 16-bit value placed in the most significant bytes of the slot
            let bytes = value.to_le_bytes();
            chunk.fill(0);
            chunk[slot - 2..].copy_from_slice(&bytes);
        }
        Ok(len)
    }
}
