use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::music::RoundingPolicy;

#[derive(Parser)]
#[command(name = "pitchscope")]
#[command(about = "Convert between notes and frequencies, and find the pitches you are playing")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Frequency of a note, e.g. `frequency C#4` or `frequency C# --octave 4`
    Frequency {
        /// Note name, with or without the octave (C#4, A-1, F)
        note: String,

        /// Octave, when NOTE is a bare letter-class
        #[arg(long, allow_hyphen_values = true)]
        octave: Option<i32>,

        /// Frequency of the reference note in Hz (default from config, 440)
        #[arg(long)]
        reference: Option<f64>,
    },

    /// Nearest note for a frequency in Hz
    Note {
        /// Frequency, e.g. 440 or "261.63 Hz"
        frequency: String,

        /// Frequency of the reference note in Hz (default from config, 440)
        #[arg(long)]
        reference: Option<f64>,

        /// How to round between semitones (default from config, nearest)
        #[arg(long, value_enum)]
        rounding: Option<RoundingPolicy>,
    },

    /// Listen to the microphone and report the dominant pitches
    Listen {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Start immediately instead of waiting for Enter
        #[arg(short, long)]
        yes: bool,
    },

    /// Run the same analysis over a WAV file
    Analyze {
        /// WAV file to analyze
        file: PathBuf,

        #[command(flatten)]
        capture: CaptureArgs,
    },

    /// List available audio input devices
    Devices,

    /// Show where the config file is read from
    Paths,
}

/// Options shared by `listen` and `analyze`.
#[derive(Args, Debug, Clone, Default)]
pub struct CaptureArgs {
    /// Report only the single strongest frequency
    #[arg(long, conflicts_with = "peaks")]
    pub single: bool,

    /// Number of peaks to keep (default from config, 7)
    #[arg(long)]
    pub peaks: Option<usize>,

    /// Listening time in seconds (default from config, 5)
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Frequency of the reference note in Hz
    #[arg(long)]
    pub reference: Option<f64>,

    /// How to round between semitones
    #[arg(long, value_enum)]
    pub rounding: Option<RoundingPolicy>,

    /// Also write a bar chart PNG of the peaks
    #[arg(long, conflicts_with = "single")]
    pub chart: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long)]
    pub json: bool,
}
