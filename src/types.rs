//! Shared types: [`ByteOrder`], [`EncodingFormat`], [`FormatVersion`] and
//! [`SampleType`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{MseedError, Result};

/// miniSEED format version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// miniSEED v2 (SEED Manual, 48-byte fixed header + blockettes).
    V2,
    /// miniSEED v3 (FDSN, 40-byte fixed header, little-endian).
    #[default]
    V3,
}

impl FormatVersion {
    pub fn from_number(version: u8) -> Result<Self> {
        match version {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            _ => Err(MseedError::Format(format!(
                "unsupported format version {version}"
            ))),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => write!(f, "miniSEED v2"),
            Self::V3 => write!(f, "miniSEED v3"),
        }
    }
}

/// Byte order for multi-byte fields in a miniSEED record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// In-memory sample representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// 32-bit integers (`i`).
    Int,
    /// 32-bit floats (`f`).
    Float,
    /// 64-bit floats (`d`).
    Double,
    /// Text bytes (`t`).
    Text,
}

impl SampleType {
    /// One-letter code: `i`, `f`, `d` or `t`.
    pub fn code(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Float => 'f',
            Self::Double => 'd',
            Self::Text => 't',
        }
    }

    /// Bytes per decoded sample.
    pub fn size(self) -> usize {
        match self {
            Self::Int | Self::Float => 4,
            Self::Double => 8,
            Self::Text => 1,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int32"),
            Self::Float => write!(f, "float32"),
            Self::Double => write!(f, "float64"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Encoding format for the sample payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingFormat {
    /// Text, UTF-8 (code 0).
    Text,
    /// 16-bit signed integer (code 1).
    Int16,
    /// 32-bit signed integer (code 3).
    Int32,
    /// 32-bit IEEE float (code 4).
    Float32,
    /// 64-bit IEEE double (code 5).
    Float64,
    /// Steim-1 compressed integers (code 10).
    #[default]
    Steim1,
    /// Steim-2 compressed integers (code 11).
    Steim2,
}

impl EncodingFormat {
    /// Convert a raw encoding code to an `EncodingFormat`.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Text),
            1 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            4 => Ok(Self::Float32),
            5 => Ok(Self::Float64),
            10 => Ok(Self::Steim1),
            11 => Ok(Self::Steim2),
            _ => Err(MseedError::UnsupportedEncoding(code)),
        }
    }

    /// Convert to the raw encoding code.
    pub fn to_code(self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Int16 => 1,
            Self::Int32 => 3,
            Self::Float32 => 4,
            Self::Float64 => 5,
            Self::Steim1 => 10,
            Self::Steim2 => 11,
        }
    }

    /// Sample type produced when decoding this encoding.
    pub fn sample_type(self) -> SampleType {
        match self {
            Self::Text => SampleType::Text,
            Self::Int16 | Self::Int32 | Self::Steim1 | Self::Steim2 => SampleType::Int,
            Self::Float32 => SampleType::Float,
            Self::Float64 => SampleType::Double,
        }
    }

    /// Whether the payload is organised in 64-byte Steim frames.
    pub fn is_steim(self) -> bool {
        matches!(self, Self::Steim1 | Self::Steim2)
    }

    /// Payload byte order mandated by the v3 format.
    pub fn v3_byte_order(self) -> ByteOrder {
        if self.is_steim() {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Int16 => "16-bit integer",
            Self::Int32 => "32-bit integer",
            Self::Float32 => "32-bit float (IEEE single)",
            Self::Float64 => "64-bit float (IEEE double)",
            Self::Steim1 => "STEIM-1 integer compression",
            Self::Steim2 => "STEIM-2 integer compression",
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "TEXT"),
            Self::Int16 => write!(f, "INT16"),
            Self::Int32 => write!(f, "INT32"),
            Self::Float32 => write!(f, "FLOAT32"),
            Self::Float64 => write!(f, "FLOAT64"),
            Self::Steim1 => write!(f, "Steim1"),
            Self::Steim2 => write!(f, "Steim2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_codes_roundtrip() {
        for code in [0u8, 1, 3, 4, 5, 10, 11] {
            assert_eq!(EncodingFormat::from_code(code).unwrap().to_code(), code);
        }
        assert!(matches!(
            EncodingFormat::from_code(2),
            Err(MseedError::UnsupportedEncoding(2))
        ));
    }

    #[test]
    fn test_sample_types() {
        assert_eq!(EncodingFormat::Steim2.sample_type(), SampleType::Int);
        assert_eq!(EncodingFormat::Float64.sample_type().code(), 'd');
        assert_eq!(EncodingFormat::Text.sample_type().size(), 1);
    }

    #[test]
    fn test_format_version_numbers() {
        assert_eq!(FormatVersion::from_number(2).unwrap(), FormatVersion::V2);
        assert_eq!(FormatVersion::V3.number(), 3);
        assert!(FormatVersion::from_number(4).is_err());
    }
}
