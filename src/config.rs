//! Options for decoding, reading, trace assembly and packing.
//!
//! Every options struct implements `Default` and serde, so a hosting
//! application can load them from any serde format:
//!
//! ```
//! use mseed_trace::{OverlapPolicy, TraceListOptions};
//!
//! let options: TraceListOptions =
//!     serde_json::from_str(r#"{"overlap_policy": "ReplaceExisting"}"#).unwrap();
//! assert_eq!(options.overlap_policy, OverlapPolicy::ReplaceExisting);
//! assert_eq!(options.tolerance_factor, 0.5);
//! ```
//!
//! - [`DecodeOptions`]: payload unpacking and CRC validation per record.
//! - [`ReaderOptions`]: fail-fast or resync on corrupt input.
//! - [`TraceListOptions`]: merge tolerances, overlap policy, version split.
//! - [`PackOptions`]: record length, encoding, format version, flushing.

use serde::{Deserialize, Serialize};

use crate::types::{EncodingFormat, FormatVersion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Decode the sample payload immediately (default: false, lazy)
    #[serde(default)]
    pub unpack_data: bool,

    /// Verify the CRC of v3 records (default: true)
    #[serde(default = "default_true")]
    pub validate_crc: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unpack_data: false,
            validate_crc: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaderOptions {
    #[serde(default)]
    pub decode: DecodeOptions,

    /// Skip bytes that do not start a valid record instead of failing
    /// (default: false, fail fast)
    #[serde(default)]
    pub skip_not_data: bool,
}

/// Which data wins when a record overlaps samples already in a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Samples already in the list are kept; duplicates are dropped.
    #[default]
    KeepExisting,
    /// Incoming samples replace the overlapped ones.
    ReplaceExisting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceListOptions {
    /// Time tolerance as a fraction of the sample period (default: 0.5)
    #[serde(default = "default_tolerance_factor")]
    pub tolerance_factor: f64,

    /// Fixed time tolerance in seconds, overriding `tolerance_factor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_tolerance: Option<f64>,

    /// Relative sample rate tolerance: rates r1, r2 match when
    /// |1 - r1/r2| is below this (default: 0.0001)
    #[serde(default = "default_rate_tolerance")]
    pub rate_tolerance: f64,

    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// Keep publication versions in separate traces (default: false)
    #[serde(default)]
    pub split_version: bool,

    /// Keep the contributing records of each segment (default: false)
    #[serde(default)]
    pub record_list: bool,

    /// Decode samples when adding records (default: true). When false the
    /// list tracks coverage only.
    #[serde(default = "default_true")]
    pub unpack_data: bool,
}

impl Default for TraceListOptions {
    fn default() -> Self {
        Self {
            tolerance_factor: default_tolerance_factor(),
            time_tolerance: None,
            rate_tolerance: default_rate_tolerance(),
            overlap_policy: OverlapPolicy::default(),
            split_version: false,
            record_list: false,
            unpack_data: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackOptions {
    /// Maximum record length in bytes (default: 4096); a power of two for v2
    #[serde(default = "default_record_length")]
    pub record_length: u32,

    #[serde(default)]
    pub encoding: EncodingFormat,

    #[serde(default)]
    pub format_version: FormatVersion,

    /// Emit a final, partially filled record (default: true). When false
    /// only full records are produced and the rest is held back.
    #[serde(default = "default_true")]
    pub flush_data: bool,

    /// Pack without removing packed samples from the trace list
    /// (default: false)
    #[serde(default)]
    pub maintain: bool,

    /// Extra headers (JSON object text) added to every v3 record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<String>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            record_length: default_record_length(),
            encoding: EncodingFormat::default(),
            format_version: FormatVersion::default(),
            flush_data: true,
            maintain: false,
            extra_headers: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tolerance_factor() -> f64 {
    0.5
}

fn default_rate_tolerance() -> f64 {
    0.0001
}

fn default_record_length() -> u32 {
    4096
}
