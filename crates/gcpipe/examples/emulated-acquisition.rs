//! Emulated acquisition example — runs the instrument emulator in-process and
//! drives a short collection run over the pipe link.
//!
//! Run with:
//!   cargo run --example emulated-acquisition

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::thread;

    use gcpipe::client::{
        EmulatorConfig, InstrumentChannel, InstrumentEmulator, Session, SessionConfig,
    };
    use gcpipe::transport::{EndpointPair, PipeName};

    let pipe_dir = std::env::temp_dir().join(format!("gcpipe-acq-{}", std::process::id()));
    fs::create_dir_all(&pipe_dir)?;
    let name = PipeName::new("gc-demo")?;
    let endpoints = EndpointPair::for_instrument(&pipe_dir, &name);

    let emulator_endpoints = endpoints.clone();
    let instrument = thread::spawn(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let config = EmulatorConfig::for_endpoints(emulator_endpoints).with_data_batch(12);
            let mut emulator = InstrumentEmulator::bind(config)?;
            // One client link, then done.
            emulator.serve_one()?;
            Ok(())
        },
    );

    // connect waits for the emulator's endpoints to appear.
    let mut session = Session::connect(SessionConfig::for_endpoints(endpoints))?;
    let channel = InstrumentChannel::new(1)?;

    session.set_running(channel, true)?;
    eprintln!("[client] run started on channel {channel}");

    let available = session.is_data_available(channel)?;
    eprintln!("[client] {available} points buffered");

    let points = session.read_data(channel)?;
    eprintln!("[client] read {} points: {points:?}", points.len());

    session.set_running(channel, false)?;
    eprintln!("[client] run stopped");
    session.disconnect();

    instrument
        .join()
        .expect("emulator thread should not panic")
        .expect("emulator should complete without error");
    let _ = fs::remove_dir_all(&pipe_dir);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("this example requires Unix domain sockets");
}
