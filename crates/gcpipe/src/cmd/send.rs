use crate::cmd::{LinkArgs, SendArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let params = args.params.unwrap_or_default();
    let mut session = link.connect()?;

    let response = session
        .request_raw(args.id, &params)
        .map_err(|err| client_error("request failed", err))?;
    print_response(&response, format);

    session.disconnect();
    Ok(SUCCESS)
}
