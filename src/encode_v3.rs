//! Assemble miniSEED v3 record bytes.
//!
//! The v3 format uses a 40-byte fixed header (little-endian), followed by
//! variable-length Source Identifier, optional extra headers (JSON), and
//! data payload. CRC-32C is computed over the entire record. Records are
//! written at their exact length; `record_length` is only an upper bound.

use crate::crc;
use crate::decode_v3::V3_HEADER_SIZE;
use crate::record::MseedRecord;
use crate::time::NsTime;
use crate::{MseedError, Result};

/// Bytes in front of the payload: fixed header, identifier and extra headers.
pub(crate) fn header_length(template: &MseedRecord) -> Result<usize> {
    let extra_len = template.extra_headers.len();
    if extra_len > u16::MAX as usize {
        return Err(MseedError::Validation(format!(
            "extra headers too long: {extra_len} bytes (max {})",
            u16::MAX
        )));
    }
    Ok(V3_HEADER_SIZE + template.source_id.as_str().len() + extra_len)
}

/// Build a v3 record around an already encoded payload.
pub(crate) fn assemble_v3(
    template: &MseedRecord,
    start_time: NsTime,
    sample_count: usize,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let sid_bytes = template.source_id.as_str().as_bytes();
    let extra_bytes = template.extra_headers.as_str().as_bytes();
    let data_start = header_length(template)?;
    let total_length = data_start + payload.len();
    if total_length > template.record_length as usize {
        return Err(MseedError::Validation(format!(
            "record of {total_length} bytes exceeds maximum length {}",
            template.record_length
        )));
    }
    let sample_count = u32::try_from(sample_count).map_err(|_| {
        MseedError::Validation(format!("{sample_count} samples exceed the v3 limit"))
    })?;
    let parts = start_time.to_parts()?;

    let mut buf = vec![0u8; total_length];

    // Magic + version
    buf[0..3].copy_from_slice(b"MS\x03");
    buf[3] = template.flags;
    buf[4..8].copy_from_slice(&parts.nanosecond.to_le_bytes());
    buf[8..10].copy_from_slice(&parts.year.to_le_bytes());
    buf[10..12].copy_from_slice(&parts.day.to_le_bytes());
    buf[12] = parts.hour;
    buf[13] = parts.minute;
    buf[14] = parts.second;
    buf[15] = template.encoding.to_code();
    // Raw rate: a negative value is a period in seconds
    buf[16..24].copy_from_slice(&template.sample_rate.to_le_bytes());
    buf[24..28].copy_from_slice(&sample_count.to_le_bytes());
    // CRC (28-31) written last
    buf[32] = template.publication_version;
    buf[33] = sid_bytes.len() as u8;
    buf[34..36].copy_from_slice(&(extra_bytes.len() as u16).to_le_bytes());
    buf[36..40].copy_from_slice(&(payload.len() as u32).to_le_bytes());

    let extra_start = V3_HEADER_SIZE + sid_bytes.len();
    buf[V3_HEADER_SIZE..extra_start].copy_from_slice(sid_bytes);
    buf[extra_start..data_start].copy_from_slice(extra_bytes);
    buf[data_start..].copy_from_slice(payload);

    crc::write_v3_crc(&mut buf);
    Ok(buf)
}
