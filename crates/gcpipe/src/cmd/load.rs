use std::path::Path;
use std::thread;
use std::time::Duration;

use gcpipe_client::{ClientError, FaultCode, Session};
use gcpipe_ctlfile::{AcquisitionPlan, ControlFile};
use serde::Serialize;
use tracing::warn;

use crate::cmd::{LinkArgs, LoadArgs};
use crate::exit::{client_error, ctlfile_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{now_unix_seconds, OutputFormat};

const RETRY_PAUSE: Duration = Duration::from_millis(200);

pub fn run(args: LoadArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let path = args
        .file
        .to_str()
        .ok_or_else(|| CliError::new(USAGE, "control file path must be valid UTF-8"))?
        .to_string();

    if let (Some(data_path), Some(samples)) = (&args.data_path, args.samples) {
        apply_plan(&args.file, data_path, samples)?;
    }

    let mut session = link.connect()?;
    let attempts = load_with_retries(&mut session, &path, args.retries)?;
    print_loaded(&path, attempts, format);

    session.disconnect();
    Ok(SUCCESS)
}

fn apply_plan(file: &Path, data_path: &str, samples: u32) -> CliResult<()> {
    let mut control =
        ControlFile::load(file).map_err(|err| ctlfile_error("control file load failed", err))?;
    AcquisitionPlan::new(data_path, samples)
        .apply(&mut control)
        .map_err(|err| ctlfile_error("acquisition plan rejected", err))?;
    control
        .save(file)
        .map_err(|err| ctlfile_error("control file save failed", err))
}

trait ControlFileLoader {
    fn load_control_file(&mut self, path: &str) -> gcpipe_client::Result<()>;
}

impl ControlFileLoader for Session {
    fn load_control_file(&mut self, path: &str) -> gcpipe_client::Result<()> {
        Session::load_control_file(self, path)
    }
}

/// One initial attempt plus up to `retries` more while the instrument
/// reports busy. Any other fault fails immediately.
fn load_with_retries<L: ControlFileLoader>(
    loader: &mut L,
    path: &str,
    retries: u32,
) -> CliResult<u32> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match loader.load_control_file(path) {
            Ok(()) => return Ok(attempt),
            Err(ClientError::Fault {
                code: FaultCode::Busy,
                ..
            }) if attempt <= retries => {
                warn!(attempt, retries, "instrument busy, retrying");
                thread::sleep(RETRY_PAUSE);
            }
            Err(err) => return Err(client_error("load failed", err)),
        }
    }
}

#[derive(Serialize)]
struct LoadOutput<'a> {
    schema_id: &'a str,
    control_file: &'a str,
    attempts: u32,
    timestamp: String,
}

fn print_loaded(path: &str, attempts: u32, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = LoadOutput {
                schema_id: "https://schemas.gcpipe.dev/cli/v1/control-file-loaded.schema.json",
                control_file: path,
                attempts,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("loaded {path} after {attempts} attempt(s)");
        }
        OutputFormat::Raw => {
            println!("ok");
        }
    }
}
