//! Decode miniSEED v3 records from raw bytes.
//!
//! The v3 format uses a 40-byte fixed header (little-endian), followed by
//! variable-length Source Identifier, optional extra headers (JSON), and
//! data payload.

use crate::crc;
use crate::extra::ExtraHeaders;
use crate::record::MseedRecord;
use crate::sid::SourceId;
use crate::time::{NsTime, TimeParts};
use crate::types::{EncodingFormat, FormatVersion};
use crate::{MseedError, Result};

/// Size of the v3 fixed header.
pub const V3_HEADER_SIZE: usize = 40;

/// Decode a single v3 record; `data` holds exactly one record.
pub(crate) fn decode_v3(data: &[u8], validate_crc: bool) -> Result<MseedRecord> {
    let total_length = v3_record_length(data)?;
    if data.len() < total_length {
        return Err(MseedError::Truncated {
            expected: total_length,
            actual: data.len(),
        });
    }
    let data = &data[..total_length];

    let stored_crc = u32::from_le_bytes([data[28], data[29], data[30], data[31]]);
    if validate_crc {
        crc::verify_v3_crc(data)?;
    }

    let flags = data[3];
    let parts = TimeParts {
        nanosecond: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        year: u16::from_le_bytes([data[8], data[9]]),
        day: u16::from_le_bytes([data[10], data[11]]),
        hour: data[12],
        minute: data[13],
        second: data[14],
    };
    let start_time = NsTime::from_parts(&parts)?;
    let encoding = EncodingFormat::from_code(data[15])?;
    let mut rate_bytes = [0u8; 8];
    rate_bytes.copy_from_slice(&data[16..24]);
    let sample_rate = f64::from_le_bytes(rate_bytes);
    let sample_count = u32::from_le_bytes([data[24], data[25], data[26], data[27]]) as usize;
    let pub_version = data[32];
    let sid_length = data[33] as usize;
    let extra_length = u16::from_le_bytes([data[34], data[35]]) as usize;

    let sid_end = V3_HEADER_SIZE + sid_length;
    let sid_str = std::str::from_utf8(&data[V3_HEADER_SIZE..sid_end])
        .map_err(|_| MseedError::Format("invalid UTF-8 in source identifier".into()))?;
    let source_id = SourceId::parse(sid_str)
        .map_err(|e| MseedError::Format(format!("source identifier: {e}")))?;

    let extra_end = sid_end + extra_length;
    let extra_headers = std::str::from_utf8(&data[sid_end..extra_end])
        .map_err(|_| MseedError::Format("invalid UTF-8 in extra headers".into()))?
        .to_string();

    let mut record = MseedRecord::new(source_id)
        .with_start_time(start_time)
        .with_sample_rate(sample_rate)
        .with_encoding(encoding)
        .with_record_length(total_length as u32)
        .with_publication_version(pub_version)
        .with_flags(flags)
        .with_extra_headers(ExtraHeaders::verbatim(extra_headers))
        .with_payload(data[extra_end..].to_vec());
    record.format_version = FormatVersion::V3;
    record.sample_count = sample_count;
    record.crc = stored_crc;
    record.byte_order = encoding.v3_byte_order();
    Ok(record)
}

/// Total length of the v3 record at the start of `data`, read from the
/// fixed header.
pub(crate) fn v3_record_length(data: &[u8]) -> Result<usize> {
    if data.len() < V3_HEADER_SIZE {
        return Err(MseedError::Truncated {
            expected: V3_HEADER_SIZE,
            actual: data.len(),
        });
    }
    let sid_length = data[33] as usize;
    let extra_length = u16::from_le_bytes([data[34], data[35]]) as usize;
    let data_length = u32::from_le_bytes([data[36], data[37], data[38], data[39]]) as usize;
    Ok(V3_HEADER_SIZE + sid_length + extra_length + data_length)
}
