//! Control and acquisition harness for gas chromatographs driven over the
//! Peaksimple pipe protocol.
//!
//! The instrument-control application publishes two local pipe endpoints;
//! every exchange on them is a `[length, id, params]` frame answered by a
//! correlated response. gcpipe layers a typed command surface on that wire,
//! plus the control-file tooling an acquisition run needs.
//!
//! # Crate Structure
//!
//! - [`transport`] — Endpoint naming and local stream transport (UDS, named pipes)
//! - [`wire`] — The `[length, id, params]` frame codec
//! - [`ctlfile`] — Control-file (`.CON`) editing and acquisition plans (behind `ctlfile` feature)
//! - [`client`] — Session, typed commands, and the instrument emulator (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use gcpipe_transport::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use gcpipe_wire::*;
}

/// Re-export control-file types (requires `ctlfile` feature).
#[cfg(feature = "ctlfile")]
pub mod ctlfile {
    pub use gcpipe_ctlfile::*;
}

/// Re-export session and emulator types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use gcpipe_client::*;
}
