use crate::cmd::{parse_channel, LinkArgs, StopArgs};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_run_state, OutputFormat};

pub fn run(args: StopArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = parse_channel(args.channel)?;
    let mut session = link.connect()?;

    session
        .set_running(channel, false)
        .map_err(|err| client_error("stop failed", err))?;

    let running = session
        .is_running(channel)
        .map_err(|err| client_error("status read-back failed", err))?;
    print_run_state(channel.get(), running, format);

    session.disconnect();
    if running {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}
