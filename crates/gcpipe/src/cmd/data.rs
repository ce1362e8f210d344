use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gcpipe_client::{ClientError, SessionCanceller};
use serde::Serialize;

use crate::cmd::{parse_channel, parse_duration, DataArgs, LinkArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS};
use crate::output::{now_unix_seconds, print_points, OutputFormat};

pub fn run(args: DataArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = parse_channel(args.channel)?;
    let mut session = link.connect()?;

    if args.available {
        let available = session
            .is_data_available(channel)
            .map_err(|err| client_error("availability query failed", err))?;
        print_available(channel.get(), available, format);
        session.disconnect();
        return Ok(SUCCESS);
    }

    if !args.watch {
        let points = session
            .read_data(channel)
            .map_err(|err| client_error("read failed", err))?;
        print_points(channel.get(), &points, format);
        session.disconnect();
        return Ok(SUCCESS);
    }

    let interval = parse_duration(&args.interval)?;
    let running = Arc::new(AtomicBool::new(true));
    let canceller = session
        .canceller()
        .map_err(|err| client_error("cancel handle setup failed", err))?;
    install_ctrlc_handler(running.clone(), canceller)?;

    let mut delivered = 0usize;
    while running.load(Ordering::SeqCst) {
        let points = match session.read_data(channel) {
            Ok(points) => points,
            // Ctrl-C tears the link down under the in-flight request.
            Err(ClientError::Disconnected) if !running.load(Ordering::SeqCst) => break,
            Err(err) => return Err(client_error("read failed", err)),
        };

        if !points.is_empty() {
            print_points(channel.get(), &points, format);
            delivered = delivered.saturating_add(1);
            if let Some(count) = args.count {
                if delivered >= count {
                    break;
                }
            }
        }

        if running.load(Ordering::SeqCst) {
            std::thread::sleep(interval);
        }
    }

    session.disconnect();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, canceller: SessionCanceller) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        canceller.cancel();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[derive(Serialize)]
struct AvailableOutput {
    schema_id: &'static str,
    channel: u8,
    available: u16,
    timestamp: String,
}

fn print_available(channel: u8, available: u16, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = AvailableOutput {
                schema_id: "https://schemas.gcpipe.dev/cli/v1/data-available.schema.json",
                channel,
                available,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("channel={channel} available={available}");
        }
        OutputFormat::Raw => {
            println!("{available}");
        }
    }
}
