use std::fs;
use std::io::Read;

use lumipack_frame::Encoder;
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, protocol_error, CliResult, SUCCESS};
use crate::output::{print_pulses, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.protocol.resolve()?;
    let encoder =
        Encoder::new(config).map_err(|err| protocol_error("invalid configuration", err))?;

    let payload = resolve_payload(&args)?;
    let pulses = encoder
        .encode(&payload)
        .map_err(|err| protocol_error("encode failed", err))?;

    let air_time: u64 = pulses.iter().map(|p| u64::from(p.duration_micros)).sum();
    info!(
        payload_bytes = payload.len(),
        pulses = pulses.len(),
        air_time_micros = air_time,
        "encoded frame"
    );

    match &args.out {
        Some(path) => {
            let mut buf = Vec::new();
            print_pulses(&pulses, OutputFormat::Json, &mut buf);
            fs::write(path, buf)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        }
        None => {
            let mut stdout = std::io::stdout();
            print_pulses(&pulses, format, &mut stdout);
        }
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut payload = Vec::new();
    std::io::stdin()
        .read_to_end(&mut payload)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(payload)
}
