use clap::{Args, Subcommand};
use std::path::PathBuf;

use lumipack_frame::{LightLevel, ProtocolConfig};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod info;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload into a pulse stream.
    Encode(EncodeArgs),
    /// Decode a pulse stream and print recovered payloads.
    Decode(DecodeArgs),
    /// Show effective protocol parameters and derived timing.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Protocol overrides shared by every codec-facing subcommand.
#[derive(Args, Debug, Default)]
pub struct ProtocolArgs {
    /// Base timing quantum in microseconds.
    #[arg(long, value_name = "MICROS")]
    pub unit_duration: Option<u32>,
    /// Accepted per-pulse drift fraction (e.g. 0.2).
    #[arg(long, value_name = "FRACTION")]
    pub drift: Option<f64>,
    /// Per-frame payload cap in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
    /// Preamble mark color.
    #[arg(long, value_name = "COLOR")]
    pub preamble_color: Option<String>,
}

impl ProtocolArgs {
    /// Apply overrides to the default configuration.
    pub fn resolve(&self) -> CliResult<ProtocolConfig> {
        let mut config = ProtocolConfig::default();
        if let Some(unit) = self.unit_duration {
            config.unit_duration_micros = unit;
        }
        if let Some(drift) = self.drift {
            config.allowed_drift_fraction = drift;
        }
        if let Some(cap) = self.max_payload {
            config.max_payload_bytes = cap;
        }
        if let Some(color) = &self.preamble_color {
            config.preamble_color = parse_color(color)?;
        }
        Ok(config)
    }
}

fn parse_color(name: &str) -> CliResult<LightLevel> {
    match name.to_ascii_lowercase().as_str() {
        "white" => Ok(LightLevel::White),
        "red" => Ok(LightLevel::Red),
        "green" => Ok(LightLevel::Green),
        "blue" => Ok(LightLevel::Blue),
        other => Err(CliError::new(
            USAGE,
            format!("unknown preamble color '{other}' (expected white|red|green|blue)"),
        )),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file (stdin when neither --data nor --file given).
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Write the pulse stream to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Read the pulse stream from a file (stdin when omitted).
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Print the decoder counter snapshot after the stream ends.
    #[arg(long)]
    pub stats: bool,
    /// Exit nonzero unless at least this many frames decoded.
    #[arg(long, value_name = "N")]
    pub expect_frames: Option<u64>,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Payload length used for the derived timing figures.
    #[arg(long, value_name = "BYTES", default_value = "0")]
    pub payload_len: usize,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
