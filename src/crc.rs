//! CRC-32C (Castagnoli) for miniSEED v3 record integrity.
//!
//! The CRC covers the whole record with the CRC field (bytes 28-31) taken
//! as zero, and is stored little-endian.

use crate::{MseedError, Result};

const CRC_FIELD: std::ops::Range<usize> = 28..32;

/// CRC-32C lookup table (Castagnoli polynomial 0x82F63B78).
const CRC32C_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x82F6_3B78;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

fn update(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32C_TABLE[index];
    }
    crc
}

/// Compute CRC-32C (Castagnoli) over the given data.
pub fn crc32c(data: &[u8]) -> u32 {
    update(0xFFFF_FFFF, data) ^ 0xFFFF_FFFF
}

/// CRC of a v3 record computed as if its CRC field were zero.
pub fn v3_record_crc(record: &[u8]) -> u32 {
    if record.len() < CRC_FIELD.end {
        return crc32c(record);
    }
    let crc = update(0xFFFF_FFFF, &record[..CRC_FIELD.start]);
    let crc = update(crc, &[0; 4]);
    update(crc, &record[CRC_FIELD.end..]) ^ 0xFFFF_FFFF
}

/// Compute the CRC of a v3 record and store it in the CRC field.
pub fn write_v3_crc(record: &mut [u8]) -> u32 {
    let crc = v3_record_crc(record);
    if record.len() >= CRC_FIELD.end {
        record[CRC_FIELD].copy_from_slice(&crc.to_le_bytes());
    }
    crc
}

/// The CRC stored in a v3 record header.
pub fn stored_v3_crc(record: &[u8]) -> Option<u32> {
    record
        .get(CRC_FIELD)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Verify the CRC-32C of a complete v3 record.
pub fn verify_v3_crc(record: &[u8]) -> Result<u32> {
    let stored = stored_v3_crc(record).ok_or(MseedError::Truncated {
        expected: CRC_FIELD.end,
        actual: record.len(),
    })?;
    let computed = v3_record_crc(record);
    if stored != computed {
        return Err(MseedError::CrcMismatch { stored, computed });
    }
    Ok(stored)
}
