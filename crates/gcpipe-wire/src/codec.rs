use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::ids;

/// Frame header: length (1) + id (1) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Maximum total frame length; the length byte caps the whole message.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;

/// Maximum params size: 255 total minus the two header bytes.
pub const MAX_PARAMS_LEN: usize = MAX_FRAME_LEN - HEADER_SIZE;

/// A single message on the instrument link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message/command id (byte 1 on the wire).
    pub id: u8,
    /// The raw 8-bit parameters (bytes 2..length).
    pub params: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u8, params: impl Into<Bytes>) -> Self {
        Self {
            id,
            params: params.into(),
        }
    }

    /// The total wire size of this frame (header + params).
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.params.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────────┬──────────┬────────────────────┐
/// │ Length (1B) │ Id (1B)  │ Params             │
/// │ 2..=255     │ 1..=255  │ (Length - 2 bytes) │
/// └─────────────┴──────────┴────────────────────┘
/// ```
/// The length byte counts the whole message, header included.
pub fn encode_frame(id: u8, params: &[u8], dst: &mut BytesMut) -> Result<()> {
    if id == ids::ID_NONE {
        return Err(WireError::ReservedId { id });
    }
    if params.len() > MAX_PARAMS_LEN {
        return Err(WireError::ParamsTooLarge {
            size: params.len(),
            max: MAX_PARAMS_LEN,
        });
    }
    dst.reserve(HEADER_SIZE + params.len());
    dst.put_u8((HEADER_SIZE + params.len()) as u8);
    dst.put_u8(id);
    dst.put_slice(params);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the declared length from the buffer; on a
/// malformed header, consumes nothing so the caller decides whether to fail
/// or resynchronize.
pub fn decode_frame(src: &mut BytesMut, max_params: usize) -> Result<Option<Frame>> {
    if src.is_empty() {
        return Ok(None); // Need more data
    }

    let declared = src[0] as usize;
    if declared < HEADER_SIZE {
        return Err(WireError::InvalidLength { len: src[0] });
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Length byte seen, id not yet arrived
    }

    let id = src[1];
    if id == ids::ID_NONE {
        return Err(WireError::ReservedId { id });
    }

    let params_len = declared - HEADER_SIZE;
    if params_len > max_params {
        return Err(WireError::ParamsTooLarge {
            size: params_len,
            max: max_params,
        });
    }

    if src.len() < declared {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let params = src.split_to(params_len).freeze();

    Ok(Some(Frame { id, params }))
}

/// What a reader does when the stream yields a malformed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Surface the error; the caller tears the connection down.
    #[default]
    Strict,
    /// Drop one byte and rescan until the stream realigns.
    ///
    /// For peers that cannot be restarted mid-run; malformed bytes are
    /// logged, never silently dropped.
    Skip,
}

/// Configuration for the wire codec.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum accepted params size in bytes. Default: 253 (the wire cap).
    pub max_params: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
    /// Malformed-frame handling. Default: `Strict`.
    pub recovery: RecoveryMode,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_params: MAX_PARAMS_LEN,
            read_timeout: None,
            write_timeout: None,
            recovery: RecoveryMode::Strict,
        }
    }
}
