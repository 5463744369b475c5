//! Whole-buffer MP3 decoding with a growing PCM buffer.
//!
//! The PCM buffer starts at ten times the compressed size (in bytes) and
//! doubles whenever the next frame would not fit. Any allocation failure
//! drops everything decoded so far and returns [`AudioError::OutOfMemory`].
//! The returned buffer is shrunk to exactly the decoded sample count.

#![allow(clippy::arithmetic_side_effects)]

use alloc::vec::Vec;

use crate::decoder::{find_frame, DecodeError, FrameDecoder, PcmFrame, StreamInfo};
use crate::error::AudioError;

/// Compressed-to-PCM size heuristic (bytes to bytes).
pub const PCM_GROWTH_ESTIMATE: usize = 10;

/// How many bytes of a file `probe_stream_info` looks at.
pub const PROBE_BYTES: usize = 4096;

/// Result of [`decode_mp3`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    /// Interleaved PCM, exactly the decoded length
    pub pcm: Vec<i16>,
    /// Metadata from the first frame
    pub info: StreamInfo,
    /// Frames that produced audio
    pub frames: usize,
    /// Times the PCM buffer had to be enlarged
    pub buffer_growths: usize,
}

/// Decode an in-memory MP3 stream.
///
/// Stops normally at the end of the input, when no further sync word is
/// found, or when the decoder reports underflow. Bytes the decoder rejects
/// are skipped one at a time.
pub fn decode_mp3<D: FrameDecoder>(decoder: &mut D, input: &[u8]) -> Result<DecodedAudio, AudioError> {
    if input.is_empty() {
        return Err(AudioError::InvalidParameter("empty mp3 input"));
    }

    // samples, not bytes
    let mut capacity = (input.len() * PCM_GROWTH_ESTIMATE / 2).max(1);
    let mut pcm: Vec<i16> = Vec::new();
    pcm.try_reserve_exact(capacity)
        .map_err(|_| AudioError::OutOfMemory)?;

    let mut frame = PcmFrame::zeroed();
    let mut info: Option<StreamInfo> = None;
    let mut cursor = 0usize;
    let mut frames = 0usize;
    let mut growths = 0usize;
    let mut skipped = 0usize;

    while let Some(rest) = input.get(cursor..).filter(|r| !r.is_empty()) {
        let Some((offset, header)) = find_frame(rest) else {
            break;
        };
        cursor += offset;
        if info.is_none() {
            tracing::debug!(
                "mp3 stream: {} Hz, {} ch, {} kbps",
                header.sample_rate,
                header.channels,
                header.bitrate_kbps
            );
            info = Some(StreamInfo::from_header(&header));
        }

        let needed = pcm.len() + header.output_samples();
        if needed > capacity {
            while needed > capacity {
                capacity = capacity.saturating_mul(2);
            }
            pcm.try_reserve_exact(capacity - pcm.len())
                .map_err(|_| AudioError::OutOfMemory)?;
            growths += 1;
            tracing::debug!("mp3 pcm buffer grown to {} samples", capacity);
        }

        let at = input.get(cursor..).unwrap_or(&[]);
        match decoder.decode_frame(at, &mut frame) {
            Ok(consumed) => {
                pcm.try_reserve(frame.len)
                    .map_err(|_| AudioError::OutOfMemory)?;
                pcm.extend_from_slice(frame.as_slice());
                frames += 1;
                cursor += consumed.max(1);
            }
            Err(DecodeError::Underflow | DecodeError::EndOfStream) => break,
            Err(DecodeError::UnsupportedFormat) => {
                return Err(AudioError::Decode(DecodeError::UnsupportedFormat));
            }
            Err(_) => {
                skipped += 1;
                cursor += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!("mp3 decode skipped {} bad positions", skipped);
    }

    let Some(info) = info else {
        return Err(AudioError::Decode(DecodeError::NoSyncWord));
    };
    if pcm.is_empty() {
        return Err(AudioError::Decode(DecodeError::InvalidData));
    }
    pcm.shrink_to_fit();

    tracing::info!(
        "mp3 decoded: {} frames, {} samples, {} growths",
        frames,
        pcm.len(),
        growths
    );
    Ok(DecodedAudio {
        pcm,
        info,
        frames,
        buffer_growths: growths,
    })
}

/// Stream metadata from the start of a file, without decoding.
///
/// `head` is the first bytes of the file (at most [`PROBE_BYTES`] are
/// examined), `file_size` the full length used for the duration estimate.
pub fn probe_stream_info(head: &[u8], file_size: u64) -> Result<StreamInfo, AudioError> {
    let window = head.get(..PROBE_BYTES).unwrap_or(head);
    let (_, header) = find_frame(window).ok_or(AudioError::Decode(DecodeError::NoSyncWord))?;
    Ok(StreamInfo::from_header(&header).with_file_size(file_size))
}
