//! Error types for miniSEED decoding, encoding and trace assembly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MseedError {
    #[error("record truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unrecognized record format")]
    UnrecognizedFormat,

    #[error("invalid record header: {0}")]
    Format(String),

    #[error("CRC-32C mismatch: stored {stored:#010X}, computed {computed:#010X}")]
    CrcMismatch { stored: u32, computed: u32 },

    #[error("unsupported encoding format: {0}")]
    UnsupportedEncoding(u8),

    #[error("payload decode error: {0}")]
    Decode(String),

    #[error("sample count mismatch: header says {expected}, decoded {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("source ID not found: {0}")]
    NoSuchSourceId(String),

    #[error("at byte offset {offset}: {source}")]
    AtOffset {
        offset: u64,
        #[source]
        source: Box<MseedError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`MseedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unrecognized version or header layout.
    Format,
    /// Fewer bytes than the declared record length.
    Truncated,
    /// CRC verification failed.
    Checksum,
    /// Malformed encoded payload.
    Decode,
    /// Caller-supplied data is inconsistent.
    Validation,
    Io,
    Other,
}

impl MseedError {
    /// Classify this error, looking through any offset context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::UnrecognizedFormat | Self::Format(_) | Self::UnsupportedEncoding(_) => {
                ErrorKind::Format
            }
            Self::CrcMismatch { .. } => ErrorKind::Checksum,
            Self::Decode(_) | Self::SampleCountMismatch { .. } => ErrorKind::Decode,
            Self::Validation(_) | Self::InvalidTime(_) => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Io,
            Self::NoSuchSourceId(_) => ErrorKind::Other,
            Self::AtOffset { source, .. } => source.kind(),
        }
    }

    pub(crate) fn at_offset(self, offset: u64) -> Self {
        match self {
            e @ Self::AtOffset { .. } => e,
            e => Self::AtOffset {
                offset,
                source: Box::new(e),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, MseedError>;
