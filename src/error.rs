// Error type shared by the decoder, the inspector and both repair passes

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of input while reading {0}")]
    TruncatedInput(&'static str),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("extended header CRC is not supported")]
    UnsupportedCrc,

    #[error("malformed frame at {offset:#010X}: {reason}")]
    MalformedFrame { offset: u64, reason: String },

    #[error("malformed tag header: {0}")]
    MalformedHeader(String),

    #[error("APIC picture type {0:#04X} is undefined")]
    UndefinedPictureType(u8),

    #[error("not [ima ge] at {offset:#010X}: found {found:#04X}")]
    RepairAssumptionViolated { offset: u64, found: u8 },

    #[error("tag size {0} does not fit in a synchsafe integer")]
    SizeOverflow(u32),

    #[error("rewritten tag size {actual} differs from planned size {expected}")]
    InconsistentSize { expected: u32, actual: u32 },

    #[error("invalid frame identifier: {0:?}")]
    InvalidFrameId(String),
}

pub type Result<T> = std::result::Result<T, RepairError>;
