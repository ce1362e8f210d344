/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The declared frame length is below the two-byte header minimum.
    #[error("invalid frame length {len} (a frame is at least 2 bytes)")]
    InvalidLength { len: u8 },

    /// The frame carries a message id that must never appear on the wire.
    #[error("reserved message id {id} on the wire")]
    ReservedId { id: u8 },

    /// The params exceed the configured maximum size.
    #[error("params too large ({size} bytes, max {max})")]
    ParamsTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl WireError {
    /// True for errors a resynchronizing reader may skip past.
    ///
    /// I/O failures and EOF are terminal either way.
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self,
            WireError::InvalidLength { .. }
                | WireError::ReservedId { .. }
                | WireError::ParamsTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
