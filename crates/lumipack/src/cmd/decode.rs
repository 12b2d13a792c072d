use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::rc::Rc;

use lumipack_frame::{Decoder, SignalChange};
use tracing::info;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, protocol_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::{print_payload, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.protocol.resolve()?;

    let received: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    let mut decoder = Decoder::with_callback(config, move |payload| {
        sink.borrow_mut().push(payload.to_vec());
    })
    .map_err(|err| protocol_error("invalid configuration", err))?;

    let reader = open_input(&args)?;
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| io_error("failed reading pulse stream", err))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let change: SignalChange = serde_json::from_str(trimmed).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("pulse stream line {}: {err}", number + 1),
            )
        })?;
        decoder.feed(change);
    }

    for (index, payload) in received.borrow().iter().enumerate() {
        print_payload(index, payload, format);
    }

    let stats = decoder.stats();
    info!(
        frames = stats.frames_decoded,
        truncated = stats.truncated_frames,
        "pulse stream drained"
    );
    if args.stats {
        print_stats(&stats, format);
    }

    if let Some(expected) = args.expect_frames {
        if stats.frames_decoded < expected {
            return Ok(FAILURE);
        }
    }
    Ok(SUCCESS)
}

fn open_input(args: &DecodeArgs) -> CliResult<BufReader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdin()),
    };
    Ok(BufReader::new(reader))
}
