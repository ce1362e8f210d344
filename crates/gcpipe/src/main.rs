mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, LinkArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "gcpipe", version, about = "Gas chromatograph pipe-control harness")]
struct Cli {
    /// Directory the instrument publishes its pipe endpoints under.
    #[arg(long, value_name = "DIR", env = "GCPIPE_PIPE_DIR", global = true)]
    pipe_dir: Option<PathBuf>,

    /// Instrument name the endpoint pair is derived from.
    #[arg(long, value_name = "NAME", global = true)]
    instrument: Option<String>,

    /// Deadline for connecting and for each command response (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", global = true)]
    timeout: Option<String>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", env = "GCPIPE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let link = LinkArgs {
        pipe_dir: cli.pipe_dir,
        instrument: cli.instrument,
        timeout: cli.timeout,
    };
    let result = cmd::run(cli.command, &link, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
