//! The `[length, id, params]` message codec for the instrument pipe link.
//!
//! Every message on the link is a single length-delimited frame:
//! - byte 0: total frame length in bytes, header included (`2..=255`)
//! - byte 1: message/command id (`0` is the no-message sentinel, `255` FAULT)
//! - bytes 2..length: raw 8-bit parameters
//!
//! The decoder reassembles partial reads and validates every header before
//! delivery. No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod ids;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, RecoveryMode, WireConfig, HEADER_SIZE, MAX_FRAME_LEN,
    MAX_PARAMS_LEN,
};
pub use error::{Result, WireError};
pub use reader::FrameReader;
pub use writer::FrameWriter;
