use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lumipack_frame::{DecoderStats, SignalChange};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print an encoded pulse sequence.
///
/// Json emits one pulse per line so streams can be piped and concatenated;
/// Raw is an alias for Json here since pulses have no raw byte form.
pub fn print_pulses(pulses: &[SignalChange], format: OutputFormat, out: &mut dyn Write) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            for pulse in pulses {
                let line = serde_json::to_string(pulse).unwrap_or_else(|_| "{}".to_string());
                let _ = writeln!(out, "{line}");
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "LEVEL", "DURATION (µs)"]);
            for (index, pulse) in pulses.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    pulse.level.to_string(),
                    pulse.duration_micros.to_string(),
                ]);
            }
            let _ = writeln!(out, "{table}");
        }
        OutputFormat::Pretty => {
            for (index, pulse) in pulses.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "[{index}] level={} duration={}µs",
                    pulse.level, pulse.duration_micros
                );
            }
        }
    }
}

#[derive(Serialize)]
struct PayloadOutput {
    frame: usize,
    size: usize,
    payload: String,
    payload_hex: String,
}

/// Print one decoded payload.
pub fn print_payload(frame: usize, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PayloadOutput {
                frame,
                size: payload.len(),
                payload: render_payload(payload),
                payload_hex: hex_string(payload),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    frame.to_string(),
                    payload.len().to_string(),
                    render_payload(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} size={} payload={}",
                frame,
                payload.len(),
                render_payload(payload)
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(payload);
            let _ = out.flush();
        }
    }
}

/// Print a decoder counter snapshot.
pub fn print_stats(stats: &DecoderStats, format: OutputFormat) {
    let rows = [
        ("frames_decoded", stats.frames_decoded),
        ("magic_mismatches", stats.magic_mismatches),
        ("header_rejects", stats.header_rejects),
        ("length_violations", stats.length_violations),
        ("crc_failures", stats.crc_failures),
        ("ender_mismatches", stats.ender_mismatches),
        ("duration_rejections", stats.duration_rejections),
        ("mark_rejections", stats.mark_rejections),
        ("truncated_frames", stats.truncated_frames),
    ];
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (name, value) in rows {
                println!("{name}={value}");
            }
        }
    }
}

/// How much of a binary payload the human-facing formats show before
/// deferring to the full `payload_hex` field.
const PREVIEW_BYTES: usize = 8;

fn render_payload(payload: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(payload) {
        return text.to_string();
    }
    let shown: Vec<String> = payload
        .iter()
        .take(PREVIEW_BYTES)
        .map(|b| format!("{b:02x}"))
        .collect();
    let trailer = if payload.len() > PREVIEW_BYTES {
        " .."
    } else {
        ""
    };
    format!("[{}{trailer}] {} bytes", shown.join(" "), payload.len())
}

fn hex_string(payload: &[u8]) -> String {
    payload.iter().map(|b| format!("{b:02x}")).collect()
}
