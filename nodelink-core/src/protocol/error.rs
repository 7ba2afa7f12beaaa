pub type ParseResult<T> = core::result::Result<T, FrameError>;

/// Reasons an inbound byte string is not accepted as a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short: needed {needed} bytes, got {available}")]
    TooShort { needed: usize, available: usize },

    #[error("checksum mismatch: frame carries {expected:#010X}, computed {actual:#010X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("unknown sentinel byte {0:#04X}")]
    UnknownSentinel(u8),
}
