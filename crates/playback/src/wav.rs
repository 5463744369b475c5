//! Canonical 44-byte WAV header encoding and PCM chunk parsing.
//!
//! ```text
//! 0  "RIFF"  4  file_size (data_size + 36)  8  "WAVE"
//! 12 "fmt "  16 16  20 format=1  22 channels  24 sample_rate
//! 28 byte_rate  32 block_align  34 bits_per_sample
//! 36 "data"  40 data_size  44 samples…
//! ```

#![allow(clippy::arithmetic_side_effects)]

use alloc::vec::Vec;

use platform::audio_types::SampleRateHz;

/// Size of the canonical header written by [`WavHeader::encode`].
pub const WAV_HEADER_LEN: usize = 44;

/// Errors from parsing a WAV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WavError {
    /// Fewer bytes than a RIFF header.
    TooShort,
    /// Missing `RIFF` magic.
    NotRiff,
    /// Missing `WAVE` form type.
    NotWave,
    /// No `fmt ` chunk before the data.
    MissingFormat,
    /// No `data` chunk.
    MissingData,
    /// Format tag other than 1 (integer PCM).
    UnsupportedEncoding(u16),
    /// Bit depth other than 8 or 16.
    UnsupportedBitDepth(u16),
    /// Channel count other than 1 or 2.
    UnsupportedChannels(u16),
    /// Sample rate outside 8–48 kHz.
    UnsupportedSampleRate(u32),
}

impl core::fmt::Display for WavError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooShort => write!(f, "file too short for a WAV header"),
            Self::NotRiff => write!(f, "missing RIFF magic"),
            Self::NotWave => write!(f, "missing WAVE form type"),
            Self::MissingFormat => write!(f, "missing fmt chunk"),
            Self::MissingData => write!(f, "missing data chunk"),
            Self::UnsupportedEncoding(tag) => write!(f, "unsupported encoding {tag}"),
            Self::UnsupportedBitDepth(bits) => write!(f, "unsupported bit depth {bits}"),
            Self::UnsupportedChannels(ch) => write!(f, "unsupported channel count {ch}"),
            Self::UnsupportedSampleRate(hz) => write!(f, "unsupported sample rate {hz} Hz"),
        }
    }
}

/// PCM WAV parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavHeader {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// 8 or 16
    pub bits_per_sample: u16,
    /// Payload size in bytes
    pub data_size: u32,
}

impl WavHeader {
    /// 16-bit PCM header for `frames` samples per channel.
    pub fn pcm16(sample_rate: u32, channels: u16, frames: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            data_size: frames.saturating_mul(2).saturating_mul(u32::from(channels)),
        }
    }

    /// `channels * bits / 8`
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// `sample_rate * block_align`
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// RIFF size field: `data_size + 36`
    pub fn file_size(&self) -> u32 {
        self.data_size.saturating_add(36)
    }

    /// Frames (samples per channel) in the payload.
    pub fn frames(&self) -> u32 {
        match self.block_align() {
            0 => 0,
            align => self.data_size / u32::from(align),
        }
    }

    /// Playing time in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match self.byte_rate() {
            0 => 0,
            rate => u64::from(self.data_size) * 1000 / u64::from(rate),
        }
    }

    /// Serialize the canonical 44-byte header.
    pub fn encode(&self) -> [u8; WAV_HEADER_LEN] {
        let fields: [&[u8]; 13] = [
            b"RIFF",
            &self.file_size().to_le_bytes(),
            b"WAVE",
            b"fmt ",
            &16u32.to_le_bytes(),
            &1u16.to_le_bytes(),
            &self.channels.to_le_bytes(),
            &self.sample_rate.to_le_bytes(),
            &self.byte_rate().to_le_bytes(),
            &self.block_align().to_le_bytes(),
            &self.bits_per_sample.to_le_bytes(),
            b"data",
            &self.data_size.to_le_bytes(),
        ];
        let mut out = [0u8; WAV_HEADER_LEN];
        let mut pos = 0;
        for field in fields {
            if let Some(dst) = out.get_mut(pos..pos + field.len()) {
                dst.copy_from_slice(field);
            }
            pos += field.len();
        }
        out
    }

    /// Parse a RIFF/WAVE header, walking chunks until `data`.
    ///
    /// Returns the header and the byte offset of the first sample.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), WavError> {
        if bytes.len() < 12 {
            return Err(WavError::TooShort);
        }
        if bytes.get(0..4) != Some(b"RIFF".as_slice()) {
            return Err(WavError::NotRiff);
        }
        if bytes.get(8..12) != Some(b"WAVE".as_slice()) {
            return Err(WavError::NotWave);
        }

        let mut format: Option<(u16, u32, u16)> = None;
        let mut pos: usize = 12;
        while let (Some(id), Some(size)) = (
            bytes.get(pos..pos.saturating_add(4)),
            read_u32(bytes, pos.saturating_add(4)),
        ) {
            let body = pos.saturating_add(8);
            match id {
                b"fmt " => {
                    let tag = read_u16(bytes, body).ok_or(WavError::TooShort)?;
                    if tag != 1 {
                        return Err(WavError::UnsupportedEncoding(tag));
                    }
                    let channels = read_u16(bytes, body.saturating_add(2)).ok_or(WavError::TooShort)?;
                    let rate = read_u32(bytes, body.saturating_add(4)).ok_or(WavError::TooShort)?;
                    let bits = read_u16(bytes, body.saturating_add(14)).ok_or(WavError::TooShort)?;
                    if !matches!(channels, 1 | 2) {
                        return Err(WavError::UnsupportedChannels(channels));
                    }
                    if !matches!(bits, 8 | 16) {
                        return Err(WavError::UnsupportedBitDepth(bits));
                    }
                    if SampleRateHz::new(rate).is_err() {
                        return Err(WavError::UnsupportedSampleRate(rate));
                    }
                    format = Some((channels, rate, bits));
                }
                b"data" => {
                    let (channels, sample_rate, bits_per_sample) =
                        format.ok_or(WavError::MissingFormat)?;
                    let header = Self {
                        sample_rate,
                        channels,
                        bits_per_sample,
                        data_size: size,
                    };
                    return Ok((header, body));
                }
                _ => {}
            }
            // chunks are word aligned
            let size = usize::try_from(size).unwrap_or(usize::MAX);
            let padded = size.saturating_add(size & 1);
            pos = body.saturating_add(padded);
        }
        if format.is_some() {
            Err(WavError::MissingData)
        } else {
            Err(WavError::MissingFormat)
        }
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([*raw.first()?, *raw.get(1)?]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

/// Append little-endian PCM bytes to `out` as signed 16-bit samples.
///
/// 8-bit WAV data is unsigned; it is re-centred and widened with
/// `(x - 128) * 256`. A trailing partial sample is ignored.
pub fn pcm_to_i16(bytes: &[u8], bits_per_sample: u16, out: &mut Vec<i16>) {
    match bits_per_sample {
        8 => out.extend(bytes.iter().map(|&b| (i16::from(b) - 128) * 256)),
        _ => out.extend(bytes.chunks_exact(2).map(|c| match c {
            [lo, hi] => i16::from_le_bytes([*lo, *hi]),
            _ => 0,
        })),
    }
}

/// Append samples as little-endian bytes.
pub fn i16_to_le_bytes(samples: &[i16], out: &mut Vec<u8>) {
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_header_sizes() {
        let h = WavHeader::pcm16(16_000, 1, 80_000);
        assert_eq!(h.data_size, 160_000);
        assert_eq!(h.file_size(), 160_036);
        assert_eq!(h.block_align(), 2);
        assert_eq!(h.byte_rate(), 32_000);
        assert_eq!(h.duration_ms(), 5_000);
    }

    #[test]
    fn test_encode_layout() {
        let bytes = WavHeader::pcm16(44_100, 2, 10).encode();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &76u32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[20..22], &1u16.to_le_bytes());
        assert_eq!(&bytes[22..24], &2u16.to_le_bytes());
        assert_eq!(&bytes[24..28], &44_100u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &176_400u32.to_le_bytes());
        assert_eq!(&bytes[32..34], &4u16.to_le_bytes());
        assert_eq!(&bytes[34..36], &16u16.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &40u32.to_le_bytes());
    }

    #[test]
    fn test_parse_skips_unknown_chunks() {
        let h = WavHeader::pcm16(8_000, 1, 4);
        let canonical = h.encode();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&canonical[..36]);
        // odd-sized LIST chunk with a pad byte
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 0]);
        bytes.extend_from_slice(&canonical[36..]);
        let (parsed, offset) = WavHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(offset, 44 + 12);
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = WavHeader::pcm16(8_000, 1, 4).encode();
        bytes[0] = b'X';
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::NotRiff));
        let mut bytes = WavHeader::pcm16(8_000, 1, 4).encode();
        bytes[8] = b'X';
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::NotWave));
        assert_eq!(WavHeader::parse(b"RIFF"), Err(WavError::TooShort));
    }

    #[test]
    fn test_parse_rejects_float_and_24_bit() {
        let mut bytes = WavHeader::pcm16(8_000, 1, 4).encode();
        bytes[20] = 3;
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::UnsupportedEncoding(3)));
        let mut bytes = WavHeader::pcm16(8_000, 1, 4).encode();
        bytes[34] = 24;
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::UnsupportedBitDepth(24)));
    }

    #[test]
    fn test_parse_missing_data() {
        let bytes = WavHeader::pcm16(8_000, 1, 4).encode();
        assert_eq!(WavHeader::parse(&bytes[..36]), Err(WavError::MissingData));
    }

    #[test]
    fn test_parse_rejects_out_of_range_rate() {
        let header = WavHeader {
            sample_rate: 0xFFFF_FFF0,
            channels: 2,
            bits_per_sample: 16,
            data_size: 0,
        };
        assert_eq!(header.byte_rate(), u32::MAX);
        let bytes = header.encode();
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::UnsupportedSampleRate(0xFFFF_FFF0)));
        let bytes = WavHeader::pcm16(4_000, 1, 0).encode();
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::UnsupportedSampleRate(4_000)));
    }

    #[test]
    fn test_parse_huge_chunk_size_ends_walk() {
        let canonical = WavHeader::pcm16(8_000, 1, 4).encode();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&canonical[..36]);
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&canonical[36..]);
        assert_eq!(WavHeader::parse(&bytes), Err(WavError::MissingData));
    }

    #[test]
    fn test_eight_bit_conversion() {
        let mut out = Vec::new();
        pcm_to_i16(&[0, 128, 255], 8, &mut out);
        assert_eq!(out, vec![-32_768, 0, 32_512]);
    }

    #[test]
    fn test_sixteen_bit_conversion_ignores_odd_byte() {
        let mut out = Vec::new();
        pcm_to_i16(&[0x34, 0x12, 0xFF, 0xFF, 0x01], 16, &mut out);
        assert_eq!(out, vec![0x1234, -1]);
    }
}
