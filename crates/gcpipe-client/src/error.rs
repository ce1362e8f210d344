use std::fmt;
use std::time::Duration;

use gcpipe_transport::TransportError;
use gcpipe_wire::WireError;

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by a [`Session`](crate::Session).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to reach or use the pipe endpoints.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The byte stream broke or carried an unrecoverable frame.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// No correlated response arrived within the response timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The instrument answered the command with a fault frame.
    #[error("instrument fault on command {command}: {code}")]
    Fault {
        /// The command id the instrument rejected.
        command: u8,
        code: FaultCode,
    },

    /// The response frame did not carry what the command expects.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The session was torn down while a request was waiting.
    #[error("session disconnected")]
    Disconnected,

    /// Instrument channel outside 1..=6.
    #[error("channel {0} out of range (valid channels are 1..={max})", max = crate::channel::CHANNEL_COUNT)]
    InvalidChannel(u8),

    /// A control file path longer than one command frame can carry.
    #[error("control file path is {len} bytes, limit is {max}")]
    ControlFilePathTooLong { len: usize, max: usize },

    /// The peer sent something the protocol does not allow here.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Reason carried in a fault frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// The instrument does not implement the command id.
    UnknownCommand,
    /// The parameter bytes did not match the command's shape.
    MalformedParams,
    /// A channel parameter was outside 1..=6.
    ChannelOutOfRange,
    /// The instrument refused the named control file.
    ControlFileRejected,
    /// The command cannot run while an acquisition is active.
    Busy,
    /// A code this library does not know.
    Other(u8),
}

impl FaultCode {
    /// The on-wire code byte.
    pub fn as_u8(self) -> u8 {
        match self {
            FaultCode::UnknownCommand => gcpipe_wire::ids::FAULT_UNKNOWN_COMMAND,
            FaultCode::MalformedParams => gcpipe_wire::ids::FAULT_MALFORMED_PARAMS,
            FaultCode::ChannelOutOfRange => gcpipe_wire::ids::FAULT_CHANNEL_OUT_OF_RANGE,
            FaultCode::ControlFileRejected => gcpipe_wire::ids::FAULT_CONTROL_FILE_REJECTED,
            FaultCode::Busy => gcpipe_wire::ids::FAULT_BUSY,
            FaultCode::Other(code) => code,
        }
    }
}

impl From<u8> for FaultCode {
    fn from(code: u8) -> Self {
        match code {
            gcpipe_wire::ids::FAULT_UNKNOWN_COMMAND => FaultCode::UnknownCommand,
            gcpipe_wire::ids::FAULT_MALFORMED_PARAMS => FaultCode::MalformedParams,
            gcpipe_wire::ids::FAULT_CHANNEL_OUT_OF_RANGE => FaultCode::ChannelOutOfRange,
            gcpipe_wire::ids::FAULT_CONTROL_FILE_REJECTED => FaultCode::ControlFileRejected,
            gcpipe_wire::ids::FAULT_BUSY => FaultCode::Busy,
            other => FaultCode::Other(other),
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCode::Other(code) => write!(f, "unrecognized fault code {code}"),
            known => write!(f, "{} (code {})", gcpipe_wire::ids::fault_name(known.as_u8()), known.as_u8()),
        }
    }
}
