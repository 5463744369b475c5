// Host tooling: unwrap/expect/panic are fine outside the firmware crates.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
// Host-side sample arithmetic.
#![allow(clippy::arithmetic_side_effects)]
#![allow(missing_docs)]

mod check;
mod decode;
mod render;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Robot audio engine development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a melody, random melody or cue to a WAV file
    Render {
        /// Built-in melody: doremi, birthday, theme
        #[arg(long, conflicts_with_all = ["random", "cue"])]
        melody: Option<String>,
        /// Generate a random melody with this many notes
        #[arg(long, conflicts_with = "cue")]
        random: Option<usize>,
        /// Sound-effect cue: beep, double_beep, confirmation, error, startup, notification
        #[arg(long)]
        cue: Option<String>,
        /// Instrument timbre (piano, guitar, organ, ...)
        #[arg(long, default_value = "guitar")]
        timbre: String,
        /// Repeat count: 0 plays once
        #[arg(long, default_value_t = 0)]
        repeat: i32,
        /// Seed for random melodies
        #[arg(long, default_value_t = 1)]
        seed: u32,
        /// Output volume 0-100
        #[arg(long, default_value_t = 100)]
        volume: u8,
        /// Output WAV path
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Print stream information for an MP3 or WAV file
    Probe {
        /// Audio file
        file: PathBuf,
    },
    /// Decode an MP3 file to 16-bit WAV
    Decode {
        /// MP3 input
        #[arg(long)]
        input: PathBuf,
        /// WAV output
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Check the no_std build, clippy and formatting
    Check,
    /// Run all tests (unit, integration, and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            melody,
            random,
            cue,
            timbre,
            repeat,
            seed,
            volume,
            out,
        } => {
            let source = render::Source::from_args(melody.as_deref(), random, cue.as_deref())?;
            let options = render::Options {
                timbre: render::parse_timbre(&timbre)?,
                repeat,
                seed,
                volume,
            };
            render::run(source, &options, &out)
        }
        Commands::Probe { file } => decode::probe(&file),
        Commands::Decode { input, out } => decode::run(&input, &out),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
