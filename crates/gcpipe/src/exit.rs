use std::fmt;
use std::io;

use gcpipe_client::ClientError;
use gcpipe_ctlfile::CtlFileError;
use gcpipe_transport::TransportError;
use gcpipe_wire::WireError;

// Exit codes are part of the scripting contract; scripts branch on them.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotFound
        | io::ErrorKind::AddrInUse => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::ConnectTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransportError::PathTooLong { .. } | TransportError::InvalidName { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::Io(source) => io_error(context, source),
        WireError::InvalidLength { .. }
        | WireError::ReservedId { .. }
        | WireError::ParamsTooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        WireError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Wire(err) => wire_error(context, err),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::Fault { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        ClientError::UnexpectedResponse(_) | ClientError::Protocol(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ClientError::Disconnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::InvalidChannel(_)
        | ClientError::ControlFilePathTooLong { .. }
        | ClientError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn ctlfile_error(context: &str, err: CtlFileError) -> CliError {
    match err {
        CtlFileError::Io(source) => io_error(context, source),
        CtlFileError::ChannelOutOfRange(_) => CliError::new(USAGE, format!("{context}: {err}")),
        CtlFileError::FileTooLarge { .. }
        | CtlFileError::MissingKey(_)
        | CtlFileError::InvalidValue { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
