use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lumipack_frame::{ProtocolConfig, FRAME_OVERHEAD, SYMBOLS_PER_BYTE};
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct InfoOutput {
    config: ProtocolConfig,
    payload_len: usize,
    frame_bytes: usize,
    pulse_count: usize,
    air_time_micros: u64,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.protocol.resolve()?;
    config
        .validate()
        .map_err(|err| protocol_error("invalid configuration", err))?;

    let out = derive(config, args.payload_len);
    print_info(&out, format);
    Ok(SUCCESS)
}

fn derive(config: ProtocolConfig, payload_len: usize) -> InfoOutput {
    let frame_bytes = FRAME_OVERHEAD + payload_len;
    let symbols = frame_bytes * SYMBOLS_PER_BYTE;
    // Preamble pair + mark/separator per symbol + trailing gap.
    let pulse_count = 2 + symbols * 2 + 1;

    let unit = u64::from(config.unit_duration_micros);
    let air_time_micros = unit
        * (u64::from(config.preamble_mark_units)
            + u64::from(config.preamble_space_units)
            + symbols as u64
                * (u64::from(config.symbol_mark_units) + u64::from(config.separator_units))
            + u64::from(config.frame_gap_units));

    InfoOutput {
        config,
        payload_len,
        frame_bytes,
        pulse_count,
        air_time_micros,
    }
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let config = &out.config;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PARAMETER", "VALUE"]);
            table.add_row(vec![
                "unit_duration_micros".to_string(),
                config.unit_duration_micros.to_string(),
            ]);
            table.add_row(vec![
                "preamble".to_string(),
                format!(
                    "{} x{} / off x{}",
                    config.preamble_color, config.preamble_mark_units, config.preamble_space_units
                ),
            ]);
            table.add_row(vec![
                "symbol / separator units".to_string(),
                format!("{} / {}", config.symbol_mark_units, config.separator_units),
            ]);
            table.add_row(vec![
                "frame_gap_units".to_string(),
                config.frame_gap_units.to_string(),
            ]);
            table.add_row(vec![
                "drift fraction".to_string(),
                config.allowed_drift_fraction.to_string(),
            ]);
            table.add_row(vec![
                "magic / ender / version".to_string(),
                format!(
                    "0x{:04X} / 0x{:04X} / {}",
                    config.magic, config.ender, config.version
                ),
            ]);
            table.add_row(vec![
                "max_payload_bytes".to_string(),
                config.max_payload_bytes.to_string(),
            ]);
            table.add_row(vec![
                format!("frame bytes (payload {})", out.payload_len),
                out.frame_bytes.to_string(),
            ]);
            table.add_row(vec!["pulse count".to_string(), out.pulse_count.to_string()]);
            table.add_row(vec![
                "air time (µs)".to_string(),
                out.air_time_micros.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame of {} payload bytes: {} bytes on the wire, {} pulses, {}µs air time",
                out.payload_len, out.frame_bytes, out.pulse_count, out.air_time_micros
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_figures_for_empty_payload() {
        let out = derive(ProtocolConfig::default(), 0);
        assert_eq!(out.frame_bytes, 9);
        assert_eq!(out.pulse_count, 75);
        // 16 + 8 + 36 * (1 + 1) + 12 units at 600µs each.
        assert_eq!(out.air_time_micros, 108 * 600);
    }

    #[test]
    fn derived_figures_scale_with_payload() {
        let out = derive(ProtocolConfig::default(), 2);
        assert_eq!(out.frame_bytes, 11);
        assert_eq!(out.pulse_count, 2 + 11 * 8 + 1);
    }
}
