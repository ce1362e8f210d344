use crate::cmd::{EmulateArgs, LinkArgs};
use crate::exit::CliResult;

#[cfg(unix)]
pub fn run(args: EmulateArgs, link: &LinkArgs) -> CliResult<i32> {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use gcpipe_client::{EmulatorConfig, InstrumentEmulator};
    use tracing::info;

    use crate::cmd::parse_duration;
    use crate::exit::{client_error, SUCCESS};

    let endpoints = link.endpoints()?;
    let mut config =
        EmulatorConfig::for_endpoints(endpoints.clone()).with_data_batch(args.data_batch);
    if let Some(delay) = &args.response_delay {
        config = config.with_response_delay(parse_duration(delay)?);
    }
    if let Some(mute) = args.mute {
        config = config.with_mute(mute);
    }

    let mut emulator =
        InstrumentEmulator::bind(config).map_err(|err| client_error("bind failed", err))?;

    let stop = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&stop), endpoints)?;
    info!("emulator running, stop with Ctrl-C");

    emulator
        .serve_until(&stop)
        .map_err(|err| client_error("serve failed", err))?;
    Ok(SUCCESS)
}

#[cfg(unix)]
fn install_ctrlc_handler(
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
    endpoints: gcpipe_transport::EndpointPair,
) -> CliResult<()> {
    use gcpipe_transport::UnixDomainSocket;

    ctrlc::set_handler(move || {
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
        // The serve loop blocks in accept between clients; throwaway
        // connections make both accepts return so it can see the flag.
        let _ = UnixDomainSocket::connect(endpoints.command());
        let _ = UnixDomainSocket::connect(endpoints.respond());
    })
    .map_err(|err| {
        crate::exit::CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(not(unix))]
pub fn run(_args: EmulateArgs, _link: &LinkArgs) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::FAILURE,
        "the emulator requires Unix domain sockets on this platform",
    ))
}
