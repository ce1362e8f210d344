use std::time::Instant;

use serde::Serialize;

use crate::cmd::{LinkArgs, ProbeArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{now_unix_seconds, params_preview, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    schema_id: &'static str,
    command_endpoint: String,
    respond_endpoint: String,
    round_trip_ms: u128,
    echoed: Vec<u8>,
    peer_uid: Option<u32>,
    peer_gid: Option<u32>,
    peer_pid: Option<u32>,
    timestamp: String,
}

pub fn run(args: ProbeArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = link.connect()?;

    let started = Instant::now();
    let echoed = session
        .test_call(&args.params)
        .map_err(|err| client_error("self-test failed", err))?;
    let round_trip = started.elapsed();

    let creds = session.peer_credentials();
    let output = ProbeOutput {
        schema_id: "https://schemas.gcpipe.dev/cli/v1/probe-report.schema.json",
        command_endpoint: session.endpoints().command().display().to_string(),
        respond_endpoint: session.endpoints().respond().display().to_string(),
        round_trip_ms: round_trip.as_millis(),
        echoed,
        peer_uid: creds.map(|(uid, _, _)| uid),
        peer_gid: creds.map(|(_, gid, _)| gid),
        peer_pid: creds.map(|(_, _, pid)| pid),
        timestamp: now_unix_seconds(),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("command endpoint: {}", output.command_endpoint);
            println!("respond endpoint: {}", output.respond_endpoint);
            println!("round trip:       {}ms", output.round_trip_ms);
            println!("echoed params:    [{}]", params_preview(&output.echoed));
            match creds {
                Some((uid, gid, pid)) => {
                    println!("instrument:       uid={uid} gid={gid} pid={pid}")
                }
                None => println!("instrument:       credentials unavailable"),
            }
        }
        OutputFormat::Raw => {
            println!("ok");
        }
    }

    session.disconnect();
    Ok(SUCCESS)
}
