use crate::cmd::{parse_channel, LinkArgs, StatusArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_run_state, OutputFormat};

pub fn run(args: StatusArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let channel = parse_channel(args.channel)?;
    let mut session = link.connect()?;

    let running = session
        .is_running(channel)
        .map_err(|err| client_error("status query failed", err))?;
    print_run_state(channel.get(), running, format);

    session.disconnect();
    Ok(SUCCESS)
}
