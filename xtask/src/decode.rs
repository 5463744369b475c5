//! MP3/WAV inspection and MP3-to-WAV conversion on the host.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use platform::storage_local::LocalFileStorage;
use playback::mp3_stream::decode_mp3;
use playback::{EngineConfig, FilePlayer, NanoMp3Decoder};
use std::path::Path;

use crate::render::write_wav;

/// Print sample rate, channels, bit rate and duration of `file`.
pub fn probe(file: &Path) -> Result<()> {
    let dir = file
        .parent()
        .and_then(Path::to_str)
        .filter(|d| !d.is_empty())
        .unwrap_or(".");
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file name: {}", file.display()))?;

    let mut storage = LocalFileStorage::new(dir);
    let player = FilePlayer::new(NanoMp3Decoder::new(), &EngineConfig::default());
    let info = embassy_futures::block_on(player.probe(&mut storage, &format!("/{name}")))
        .map_err(|e| anyhow!("probe failed: {e}"))?;

    println!();
    println!("{}", format!("🔎 {}", file.display()).cyan().bold());
    println!("  sample rate: {} Hz", info.sample_rate_hz);
    println!("  channels:    {}", info.channels);
    println!("  bit rate:    {} kbps", info.bit_rate_kbps);
    println!("  duration:    {} s", info.duration_sec);
    println!();
    Ok(())
}

/// Decode `input` (MP3) to a 16-bit WAV at `out`.
pub fn run(input: &Path, out: &Path) -> Result<()> {
    println!();
    println!("{}", "🎧 Decoding MP3...".cyan().bold());

    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let mut decoder = NanoMp3Decoder::new();
    let decoded = decode_mp3(&mut decoder, &bytes).map_err(|e| anyhow!("decode failed: {e}"))?;
    tracing::info!(
        "{} frames, {} buffer growths",
        decoded.frames,
        decoded.buffer_growths
    );
    write_wav(out, &decoded.pcm, decoded.info.sample_rate_hz, decoded.info.channels)?;

    println!(
        "{}",
        format!(
            "  ✓ {} Hz, {} ch, {} samples -> {}",
            decoded.info.sample_rate_hz,
            decoded.info.channels,
            decoded.pcm.len(),
            out.display()
        )
        .green()
    );
    println!();
    Ok(())
}
