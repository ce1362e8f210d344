//! Local transport layer for instrument control links.
//!
//! An instrument-control application exposes two well-known local endpoints:
//! one carrying commands toward the instrument process, one carrying its
//! responses back. This crate resolves those endpoint names to filesystem
//! socket paths and provides the byte-stream connections over them. The
//! legacy application publishes Windows named pipes; on this side the same
//! link shape is served by Unix domain sockets.
//!
//! This is the lowest layer of gcpipe. Everything else builds on top of
//! the [`PipeStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{default_pipe_dir, EndpointPair, PipeName, DEFAULT_INSTRUMENT_NAME};
pub use error::{Result, TransportError};
pub use stream::PipeStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
