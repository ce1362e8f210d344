//! Request/response session for driving a gas chromatograph over its
//! control pipes.
//!
//! The instrument-control application answers one command at a time over a
//! pair of local pipes. [`Session`] owns that exchange: it connects to both
//! endpoints, keeps a background reader feeding responses into a bounded
//! queue, and correlates each reply to the command that asked for it. Every
//! wait is bounded by the session's response timeout, and an in-flight wait
//! can be cancelled from another thread through a [`SessionCanceller`].
//!
//! [`InstrumentEmulator`] is the other side of the link: a deterministic
//! stand-in for the control application, used by the CLI and the test suite
//! when no instrument is attached.

pub mod channel;
pub mod commands;
pub mod config;
pub mod emulator;
pub mod error;
pub mod session;

pub use channel::{InstrumentChannel, CHANNEL_COUNT};
pub use config::{
    SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT, RESPONSE_QUEUE_DEPTH,
};
pub use emulator::{EmulatorConfig, InstrumentEmulator};
pub use error::{ClientError, FaultCode, Result};
pub use session::{Session, SessionCanceller};
