use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use gcpipe_client::{InstrumentChannel, Session, SessionConfig};
use gcpipe_transport::{default_pipe_dir, EndpointPair, PipeName, DEFAULT_INSTRUMENT_NAME};

use crate::exit::{client_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod data;
pub mod doctor;
pub mod emulate;
pub mod load;
pub mod probe;
pub mod send;
pub mod start;
pub mod status;
pub mod stop;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and run a self-test round trip.
    Probe(ProbeArgs),
    /// Send one raw command frame and print the response.
    Send(SendArgs),
    /// Start a run on a channel.
    Start(StartArgs),
    /// Stop a run on a channel.
    Stop(StopArgs),
    /// Show whether a channel is running.
    Status(StatusArgs),
    /// Read buffered chromatogram points from a channel.
    Data(DataArgs),
    /// Load a control file on the instrument.
    Load(LoadArgs),
    /// Run the instrument emulator until interrupted.
    Emulate(EmulateArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, link, format),
        Command::Send(args) => send::run(args, link, format),
        Command::Start(args) => start::run(args, link, format),
        Command::Stop(args) => stop::run(args, link, format),
        Command::Status(args) => status::run(args, link, format),
        Command::Data(args) => data::run(args, link, format),
        Command::Load(args) => load::run(args, link, format),
        Command::Emulate(args) => emulate::run(args, link),
        Command::Doctor(args) => doctor::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// Link options lifted from the global flags, shared by every subcommand.
#[derive(Debug)]
pub struct LinkArgs {
    pub pipe_dir: Option<PathBuf>,
    pub instrument: Option<String>,
    pub timeout: Option<String>,
}

impl LinkArgs {
    pub fn endpoints(&self) -> CliResult<EndpointPair> {
        let dir = self.pipe_dir.clone().unwrap_or_else(default_pipe_dir);
        let name = self.instrument.as_deref().unwrap_or(DEFAULT_INSTRUMENT_NAME);
        let name =
            PipeName::new(name).map_err(|err| transport_error("invalid --instrument", err))?;
        Ok(EndpointPair::for_instrument(dir, &name))
    }

    /// One --timeout flag covers both phases so a probe against a missing
    /// instrument fails as fast as a slow response does.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = SessionConfig::for_endpoints(self.endpoints()?);
        if let Some(text) = &self.timeout {
            let timeout = parse_duration(text)?;
            config = config
                .with_connect_timeout(timeout)
                .with_response_timeout(timeout);
        }
        Ok(config)
    }

    pub fn connect(&self) -> CliResult<Session> {
        Session::connect(self.session_config()?).map_err(|err| client_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Self-test parameter bytes to echo (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = [29u8, 30u8])]
    pub params: Vec<u8>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Command id byte.
    #[arg(long)]
    pub id: u8,
    /// Parameter bytes (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub params: Option<Vec<u8>>,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Instrument channel (1-6).
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Instrument channel (1-6).
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Instrument channel (1-6).
    pub channel: u8,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Instrument channel (1-6).
    pub channel: u8,
    /// Print only the buffered point count.
    #[arg(long, conflicts_with = "watch")]
    pub available: bool,
    /// Poll for data until interrupted.
    #[arg(long)]
    pub watch: bool,
    /// Polling interval while watching (e.g. 500ms, 2s).
    #[arg(long, value_name = "DURATION", default_value = "500ms")]
    pub interval: String,
    /// Stop after N non-empty reads while watching.
    #[arg(long, value_name = "N", requires = "watch")]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Control file path, as the instrument should see it.
    pub file: PathBuf,
    /// Retry attempts while the instrument reports busy.
    #[arg(long, default_value = "3")]
    pub retries: u32,
    /// Rewrite the control file's data directory before loading.
    #[arg(long, value_name = "DIR", requires = "samples")]
    pub data_path: Option<String>,
    /// Rewrite the control file's ending-sample count before loading.
    #[arg(long, value_name = "N", requires = "data_path")]
    pub samples: Option<u32>,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Points served per read while a channel runs.
    #[arg(long, value_name = "N", default_value = "24")]
    pub data_batch: u16,
    /// Delay before each response (e.g. 50ms), for timeout rehearsal.
    #[arg(long, value_name = "DURATION")]
    pub response_delay: Option<String>,
    /// Command ids to ignore (comma-separated), for timeout rehearsal.
    #[arg(long, value_delimiter = ',')]
    pub mute: Option<Vec<u8>>,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_channel(channel: u8) -> CliResult<InstrumentChannel> {
    InstrumentChannel::new(channel).map_err(|err| CliError::new(USAGE, err.to_string()))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
