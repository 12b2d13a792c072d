mod cmd;
mod exit;
mod logging;
mod output;

use clap::{Args, Parser};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lumipack", version, about = "Light-pulse codec CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
struct GlobalArgs {
    /// Output format (table on a terminal, json otherwise).
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,
}

impl GlobalArgs {
    /// Pulse streams are meant to be piped, so a non-terminal stdout picks
    /// the machine-readable format unless the user says otherwise.
    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(OutputFormat::default_for_stdout)
    }
}

fn run(cli: Cli) -> i32 {
    init_logging(cli.global.log_format, cli.global.log_level);

    match cmd::run(cli.command, cli.global.output_format()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.code
        }
    }
}

fn main() {
    std::process::exit(run(Cli::parse()));
}
