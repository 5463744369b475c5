//! Audio decoder abstractions: format detection, MPEG frame headers, PCM
//! frame types, codec traits.
//!
//! The MPEG header parser here is independent of the codec so stream
//! metadata can be probed from the first few kilobytes of a file without
//! decoding anything.
//!
//! # Decoder crate selection
//!
//! * **MP3**: `nanomp3` (pure-Rust, `no_std`, translation of minimp3), gated
//!   behind the `mp3` feature.
//! * **WAV**: PCM chunks are parsed directly in [`crate::wav`]; no
//!   third-party crate needed.

#![allow(clippy::arithmetic_side_effects)]

/// Largest interleaved sample count one MPEG audio frame can produce
/// (1152 samples × 2 channels).
pub const MAX_FRAME_SAMPLES: usize = 2304;

/// A decoded PCM frame, interleaved 16-bit.
///
/// The array is always fully allocated; `len` is the number of valid
/// interleaved samples at the front.
#[derive(Clone)]
pub struct PcmFrame {
    /// Raw interleaved sample storage.
    pub samples: [i16; MAX_FRAME_SAMPLES],
    /// Number of valid samples in `samples` (all channels).
    pub len: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo).
    pub channels: u8,
}

impl PcmFrame {
    /// Create a zeroed `PcmFrame` suitable for use as an output buffer.
    pub const fn zeroed() -> Self {
        Self {
            samples: [0i16; MAX_FRAME_SAMPLES],
            len: 0,
            sample_rate: 0,
            channels: 0,
        }
    }

    /// The valid samples.
    pub fn as_slice(&self) -> &[i16] {
        self.samples.get(..self.len).unwrap_or(&self.samples)
    }
}

impl Default for PcmFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Errors that a [`FrameDecoder`] or the stream loop may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The bitstream contains invalid or corrupt data at this position.
    InvalidData,
    /// The input buffer is exhausted; no more frames can be decoded.
    EndOfStream,
    /// The codec does not support this stream, or was compiled out.
    UnsupportedFormat,
    /// The provided output buffer is too small for one decoded frame.
    BufferTooSmall,
    /// No MPEG sync word anywhere in the input.
    NoSyncWord,
    /// A frame header was found but its body is truncated.
    Underflow,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::InvalidData => "invalid data",
            Self::EndOfStream => "end of stream",
            Self::UnsupportedFormat => "unsupported format",
            Self::BufferTooSmall => "output buffer too small",
            Self::NoSyncWord => "no sync word found",
            Self::Underflow => "input underflow",
        };
        f.write_str(msg)
    }
}

/// Audio container / codec format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioFormat {
    /// MPEG Layer 3
    Mp3,
    /// Waveform Audio File Format (PCM payload)
    Wav,
}

impl AudioFormat {
    /// Detect the audio format from a file extension (case-insensitive).
    ///
    /// Returns `None` when the extension is not recognised.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("mp3") {
            Some(Self::Mp3)
        } else if ext.eq_ignore_ascii_case("wav") {
            Some(Self::Wav)
        } else {
            None
        }
    }

    /// Detect the format from the extension of a path.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// MPEG audio version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MpegVersion {
    /// MPEG-1 (32/44.1/48 kHz)
    Mpeg1,
    /// MPEG-2 LSF (16/22.05/24 kHz)
    Mpeg2,
    /// MPEG-2.5 (8/11.025/12 kHz)
    Mpeg25,
}

const BITRATES_V1_L3: [u16; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L3: [u16; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];
const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];

/// Parsed 4-byte Layer III frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// MPEG version
    pub version: MpegVersion,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit rate in kbit/s
    pub bitrate_kbps: u16,
    /// 1 for mono, 2 otherwise
    pub channels: u8,
    /// Samples per channel in this frame
    pub samples_per_frame: u16,
    /// Whole frame length in bytes, header included
    pub frame_len: usize,
}

impl FrameHeader {
    /// Parse a Layer III header from the first four bytes of `bytes`.
    ///
    /// Free-format and reserved values are rejected.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let [b0, b1, b2, b3] = *bytes.first_chunk::<4>()?;
        if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }
        let version = match (b1 >> 3) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };
        // layer bits 01 = Layer III
        if (b1 >> 1) & 0b11 != 0b01 {
            return None;
        }
        let bitrate_idx = usize::from(b2 >> 4);
        let rate_idx = usize::from((b2 >> 2) & 0b11);
        let padding = usize::from((b2 >> 1) & 1);
        let table = match version {
            MpegVersion::Mpeg1 => &BITRATES_V1_L3,
            _ => &BITRATES_V2_L3,
        };
        let bitrate_kbps = *table.get(bitrate_idx).filter(|&&b| b != 0)?;
        let base_rate = *SAMPLE_RATES_V1.get(rate_idx)?;
        let sample_rate = match version {
            MpegVersion::Mpeg1 => base_rate,
            MpegVersion::Mpeg2 => base_rate / 2,
            MpegVersion::Mpeg25 => base_rate / 4,
        };
        let (samples_per_frame, coeff) = match version {
            MpegVersion::Mpeg1 => (1152u16, 144usize),
            _ => (576, 72),
        };
        let frame_len =
            coeff * usize::from(bitrate_kbps) * 1000 / sample_rate as usize + padding;
        let channels = if b3 >> 6 == 0b11 { 1 } else { 2 };
        Some(Self {
            version,
            sample_rate,
            bitrate_kbps,
            channels,
            samples_per_frame,
            frame_len,
        })
    }

    /// Interleaved samples this frame decodes to.
    pub fn output_samples(&self) -> usize {
        usize::from(self.samples_per_frame) * usize::from(self.channels)
    }
}

/// Offset of the first byte pair that looks like an MPEG sync word.
pub fn find_sync_word(data: &[u8]) -> Option<usize> {
    data.windows(2)
        .position(|w| matches!(w, [0xFF, b] if b & 0xE0 == 0xE0))
}

/// Offset and header of the first sync word that carries a valid header.
pub fn find_frame(data: &[u8]) -> Option<(usize, FrameHeader)> {
    let mut offset = 0;
    loop {
        let rest = data.get(offset..)?;
        let pos = find_sync_word(rest)?;
        let at = offset + pos;
        if let Some(header) = data.get(at..).and_then(FrameHeader::parse) {
            return Some((at, header));
        }
        offset = at + 1;
    }
}

/// Stream metadata taken from the first valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamInfo {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Channel count
    pub channels: u8,
    /// Bit rate in kbit/s
    pub bit_rate_kbps: u32,
    /// Estimated duration in whole seconds (0 when unknown)
    pub duration_sec: u32,
    /// True once filled from a real header
    pub valid: bool,
}

impl StreamInfo {
    /// Metadata from one frame header; duration unknown.
    pub fn from_header(header: &FrameHeader) -> Self {
        Self {
            sample_rate_hz: header.sample_rate,
            channels: header.channels,
            bit_rate_kbps: u32::from(header.bitrate_kbps),
            duration_sec: 0,
            valid: true,
        }
    }

    /// Fill in the duration estimate `file_size * 8 / bitrate`.
    #[must_use]
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        let bps = u64::from(self.bit_rate_kbps) * 1000;
        self.duration_sec = if bps == 0 {
            0
        } else {
            u32::try_from(file_size * 8 / bps).unwrap_or(u32::MAX)
        };
        self
    }
}

/// Trait for stateful, frame-by-frame audio decoders.
///
/// Each call to [`decode_frame`] consumes some bytes from `input` and writes
/// one decoded PCM frame to `output`, returning the number of input bytes
/// consumed. Implementations must not allocate.
///
/// [`decode_frame`]: FrameDecoder::decode_frame
pub trait FrameDecoder {
    /// Decode one frame from the start of `input` into `output`.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Underflow`] / [`DecodeError::EndOfStream`]: not
    ///   enough input for a frame; the stream is over.
    /// - [`DecodeError::UnsupportedFormat`]: the decoder cannot handle this
    ///   stream at all.
    /// - anything else: this position is bad, the caller may skip a byte.
    fn decode_frame(&mut self, input: &[u8], output: &mut PcmFrame) -> Result<usize, DecodeError>;

    /// Sample rate of the stream being decoded, in Hz.
    fn sample_rate(&self) -> u32;

    /// Number of audio channels in the stream.
    fn channels(&self) -> u8;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    // MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, stereo, no CRC
    const HDR_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    #[test]
    fn test_parse_mpeg1_header() {
        let h = FrameHeader::parse(&HDR_128K).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg1);
        assert_eq!(h.sample_rate, 44_100);
        assert_eq!(h.bitrate_kbps, 128);
        assert_eq!(h.channels, 2);
        assert_eq!(h.samples_per_frame, 1152);
        assert_eq!(h.frame_len, 417);
        assert_eq!(h.output_samples(), 2304);
    }

    #[test]
    fn test_parse_mpeg2_mono_header() {
        // MPEG-2, Layer III, 32 kbit/s, 16 kHz, padding, mono
        let h = FrameHeader::parse(&[0xFF, 0xF3, 0x4A, 0xC0]).unwrap();
        assert_eq!(h.version, MpegVersion::Mpeg2);
        assert_eq!(h.sample_rate, 16_000);
        assert_eq!(h.bitrate_kbps, 32);
        assert_eq!(h.channels, 1);
        assert_eq!(h.samples_per_frame, 576);
        assert_eq!(h.frame_len, 72 * 32_000 / 16_000 + 1);
    }

    #[test]
    fn test_reject_free_format_and_bad_layer() {
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0x00]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFD, 0x90, 0x00]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFB]).is_none());
    }

    #[test]
    fn test_find_frame_skips_false_sync() {
        let mut data = [0u8; 16];
        data[2] = 0xFF;
        data[3] = 0xE0; // sync bits but reserved layer
        data[8..12].copy_from_slice(&HDR_128K);
        assert_eq!(find_sync_word(&data), Some(2));
        let (off, h) = find_frame(&data).unwrap();
        assert_eq!(off, 8);
        assert_eq!(h.bitrate_kbps, 128);
    }

    #[test]
    fn test_find_frame_none() {
        assert!(find_frame(&[0u8; 64]).is_none());
        assert!(find_frame(&[]).is_none());
    }

    #[test]
    fn test_stream_info_duration() {
        let h = FrameHeader::parse(&HDR_128K).unwrap();
        let info = StreamInfo::from_header(&h).with_file_size(160_000);
        assert!(info.valid);
        assert_eq!(info.duration_sec, 10);
    }

    #[test]
    fn test_audio_format_detection() {
        assert_eq!(AudioFormat::from_extension("mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_extension("flac"), None);
        assert_eq!(AudioFormat::from_path("/sounds/hi.Mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_path("/sounds.d/readme"), None);
    }

    #[test]
    fn test_pcm_frame_default_is_empty() {
        let frame = PcmFrame::default();
        assert!(frame.as_slice().is_empty());
    }
}
