//! File and PCM-stream playback.
//!
//! MP3 files are read whole, decoded with [`decode_mp3`] and written to the
//! sink in large chunks. WAV files are streamed from storage in small
//! chunks. Either way the sink is switched to the stream's sample rate and
//! channel count first, and the cancellation token is checked between
//! chunks.

#![allow(clippy::arithmetic_side_effects)]

use alloc::vec::Vec;

use platform::audio_types::SampleRateHz;
use platform::config::TTS_SAMPLE_RATE;
use platform::storage::{File, Storage};

use crate::config::EngineConfig;
use crate::decoder::{AudioFormat, FrameDecoder, StreamInfo};
use crate::engine::CancelToken;
use crate::error::{AudioError, PlayOutcome};
use crate::mp3_stream::{decode_mp3, probe_stream_info, PROBE_BYTES};
use crate::sink::SampleSink;
use crate::transform::render_tts;
use crate::wav::{pcm_to_i16, WavHeader};

/// Bytes read to find the WAV `data` chunk.
const WAV_HEADER_PROBE: usize = 512;

/// Plays MP3 and WAV files from storage, and raw PCM such as TTS output.
pub struct FilePlayer<Dec: FrameDecoder> {
    decoder: Dec,
    mp3_chunk_samples: usize,
    wav_chunk_bytes: usize,
    tts_speed: f32,
    tts_boost: f32,
}

impl<Dec: FrameDecoder> FilePlayer<Dec> {
    /// Create a player using `decoder` for compressed streams.
    pub fn new(decoder: Dec, config: &EngineConfig) -> Self {
        Self {
            decoder,
            mp3_chunk_samples: (config.mp3_chunk_bytes / 2).max(1),
            // whole 16-bit stereo frames
            wav_chunk_bytes: (config.wav_chunk_bytes & !3).max(4),
            tts_speed: config.tts_speed,
            tts_boost: config.tts_boost,
        }
    }

    /// Play the file at `path`. The format comes from the extension.
    pub async fn play<St: Storage, S: SampleSink>(
        &mut self,
        storage: &mut St,
        sink: &mut S,
        path: &str,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let format = AudioFormat::from_path(path)
            .ok_or(AudioError::InvalidParameter("unknown file extension"))?;
        let mut file = storage.open_file(path).await.map_err(|_| {
            tracing::warn!("cannot open {}", path);
            AudioError::Storage
        })?;
        tracing::info!("playing {} ({} bytes)", path, file.size());

        match format {
            AudioFormat::Mp3 => self.play_mp3(&mut file, sink, cancel).await,
            AudioFormat::Wav => self.play_wav(&mut file, sink, cancel).await,
        }
    }

    /// Stream metadata for the file at `path`, without decoding it.
    pub async fn probe<St: Storage>(&self, storage: &mut St, path: &str) -> Result<StreamInfo, AudioError> {
        let format = AudioFormat::from_path(path)
            .ok_or(AudioError::InvalidParameter("unknown file extension"))?;
        let mut file = storage.open_file(path).await.map_err(|_| AudioError::Storage)?;
        let size = file.size();

        match format {
            AudioFormat::Mp3 => {
                let mut head: Vec<u8> = Vec::new();
                head.try_reserve_exact(PROBE_BYTES)
                    .map_err(|_| AudioError::OutOfMemory)?;
                head.resize(PROBE_BYTES, 0);
                let n = read_full(&mut file, &mut head).await?;
                probe_stream_info(head.get(..n).unwrap_or(&[]), size)
            }
            AudioFormat::Wav => {
                let mut head = [0u8; WAV_HEADER_PROBE];
                let n = read_full(&mut file, &mut head).await?;
                let (header, _) = WavHeader::parse(head.get(..n).unwrap_or(&[]))?;
                Ok(StreamInfo {
                    sample_rate_hz: header.sample_rate,
                    channels: u8::try_from(header.channels).unwrap_or(2),
                    bit_rate_kbps: header.byte_rate().saturating_mul(8) / 1000,
                    duration_sec: u32::try_from(header.duration_ms() / 1000).unwrap_or(u32::MAX),
                    valid: true,
                })
            }
        }
    }

    /// Play mono TTS output: duplicated to stereo, speed-adjusted, boosted.
    pub async fn play_tts<S: SampleSink>(
        &self,
        sink: &mut S,
        mono: &[i16],
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let pcm = render_tts(mono, self.tts_speed, self.tts_boost)?;
        tracing::info!("tts: {} samples at speed {}", pcm.len(), self.tts_speed);
        switch_format(sink, TTS_SAMPLE_RATE, 2).await?;
        stream_pcm(sink, &pcm, self.mp3_chunk_samples, cancel).await
    }

    async fn play_mp3<F: File, S: SampleSink>(
        &mut self,
        file: &mut F,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let bytes = read_all(file).await?;
        let decoded = decode_mp3(&mut self.decoder, &bytes)?;
        drop(bytes);
        switch_format(sink, decoded.info.sample_rate_hz, decoded.info.channels).await?;
        stream_pcm(sink, &decoded.pcm, self.mp3_chunk_samples, cancel).await
    }

    async fn play_wav<F: File, S: SampleSink>(
        &mut self,
        file: &mut F,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<PlayOutcome, AudioError> {
        let mut head = [0u8; WAV_HEADER_PROBE];
        let n = read_full(file, &mut head).await?;
        let (header, offset) = WavHeader::parse(head.get(..n).unwrap_or(&[]))?;
        tracing::info!(
            "wav: {} Hz, {} ch, {} bit, {} bytes",
            header.sample_rate,
            header.channels,
            header.bits_per_sample,
            header.data_size
        );
        let channels = u8::try_from(header.channels).unwrap_or(2);
        switch_format(sink, header.sample_rate, channels).await?;
        file.seek(offset as u64).await.map_err(|_| AudioError::Storage)?;

        let sample_bytes = usize::from(header.bits_per_sample / 8).max(1);
        let volume = sink.volume();
        let mut remaining = header.data_size as usize;
        let mut raw: Vec<u8> = Vec::new();
        raw.try_reserve_exact(self.wav_chunk_bytes + 1)
            .map_err(|_| AudioError::OutOfMemory)?;
        let mut pcm: Vec<i16> = Vec::new();
        pcm.try_reserve_exact(self.wav_chunk_bytes)
            .map_err(|_| AudioError::OutOfMemory)?;
        let mut chunk = [0u8; 512];

        while remaining > 0 {
            if cancel.take() {
                tracing::info!("wav playback interrupted");
                return Ok(PlayOutcome::Interrupted);
            }
            // fill one chunk, keeping any odd byte from the last one
            while raw.len() < self.wav_chunk_bytes && remaining > 0 {
                let want = chunk.len().min(remaining);
                let buf = chunk.get_mut(..want).unwrap_or(&mut []);
                let got = file.read(buf).await.map_err(|_| AudioError::Storage)?;
                if got == 0 {
                    tracing::warn!("wav data ends {} bytes early", remaining);
                    remaining = 0;
                    break;
                }
                raw.extend_from_slice(buf.get(..got).unwrap_or(&[]));
                remaining -= got;
            }

            let usable = raw.len() - raw.len() % sample_bytes;
            pcm.clear();
            pcm_to_i16(raw.get(..usable).unwrap_or(&[]), header.bits_per_sample, &mut pcm);
            raw.drain(..usable);
            if pcm.is_empty() {
                continue;
            }
            if sink.write(&pcm, volume).await? == 0 {
                tracing::error!("sink refused wav chunk");
                return Err(AudioError::SinkWrite);
            }
        }
        Ok(PlayOutcome::Completed)
    }
}

/// Write `pcm` in `chunk` sized pieces, checking `cancel` before each.
pub async fn stream_pcm<S: SampleSink>(
    sink: &mut S,
    pcm: &[i16],
    chunk: usize,
    cancel: &CancelToken,
) -> Result<PlayOutcome, AudioError> {
    if pcm.is_empty() {
        return Err(AudioError::InvalidParameter("empty pcm stream"));
    }
    let volume = sink.volume();
    for (i, piece) in pcm.chunks(chunk.max(1)).enumerate() {
        if cancel.take() {
            tracing::info!("stream interrupted before chunk {}", i);
            return Ok(PlayOutcome::Interrupted);
        }
        if sink.write(piece, volume).await? == 0 {
            tracing::error!("sink refused chunk {}", i);
            return Err(AudioError::SinkWrite);
        }
    }
    Ok(PlayOutcome::Completed)
}

async fn switch_format<S: SampleSink>(sink: &mut S, sample_rate: u32, channels: u8) -> Result<(), AudioError> {
    if sink.sample_rate() == sample_rate && sink.channels() == channels {
        return Ok(());
    }
    let rate = SampleRateHz::new(sample_rate)
        .map_err(|_| AudioError::InvalidParameter("stream sample rate unsupported"))?;
    sink.set_format(rate, channels).await
}

async fn read_full<F: File>(file: &mut F, buf: &mut [u8]) -> Result<usize, AudioError> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..).filter(|r| !r.is_empty()) {
        match file.read(rest).await.map_err(|_| AudioError::Storage)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

async fn read_all<F: File>(file: &mut F) -> Result<Vec<u8>, AudioError> {
    let size = usize::try_from(file.size()).map_err(|_| AudioError::OutOfMemory)?;
    if size == 0 {
        return Err(AudioError::InvalidParameter("empty file"));
    }
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(size)
        .map_err(|_| AudioError::OutOfMemory)?;
    bytes.resize(size, 0);
    let n = read_full(file, &mut bytes).await?;
    bytes.truncate(n);
    Ok(bytes)
}
