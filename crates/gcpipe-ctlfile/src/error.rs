/// Errors that can occur while reading, editing, or writing control files.
#[derive(Debug, thiserror::Error)]
pub enum CtlFileError {
    /// The control file could not be read or written.
    #[error("control file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exceeds the maximum a control file can plausibly be.
    #[error("control file too large ({size} bytes, max {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// A required entry is absent.
    #[error("control file has no <{0}> entry")]
    MissingKey(String),

    /// An entry value did not parse as the expected type.
    #[error("invalid value {value:?} for <{key}>: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },

    /// Instrument channel outside the hardware's range.
    #[error("channel {0} out of range (1..=6)")]
    ChannelOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, CtlFileError>;
