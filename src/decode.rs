//! Decode miniSEED records from raw bytes.
//!
//! [`decode()`] auto-detects the format version and parses one record into
//! an [`MseedRecord`], leaving the payload encoded until
//! [`MseedRecord::unpack`] is called. [`decode_with`] takes
//! [`DecodeOptions`] to unpack eagerly or skip CRC validation. For
//! multi-record data, see [`MseedReader`](crate::MseedReader).
//!
//! v2 records are mapped onto the v3 model:
//! - the quality indicator sets the publication version (R=1, D=2, Q=3,
//!   M=4) and is kept in `/FDSN/DataQuality`;
//! - the sequence number is kept in `/FDSN/Sequence`;
//! - Blockette 1001 timing quality goes to `/FDSN/Time/Quality` and its
//!   microsecond offset is added to the start time;
//! - an unapplied time correction is added to the start time;
//! - Blockette 100 overrides the factor/multiplier sample rate.

use tracing::trace;

use crate::config::DecodeOptions;
use crate::decode_v3;
use crate::extra::{self, ExtraHeaders};
use crate::record::{
    Blockette, FLAG_CALIBRATION, FLAG_CLOCK_LOCKED, FLAG_TIME_QUESTIONABLE, MseedRecord,
};
use crate::sid::SourceId;
use crate::time::{BTime, NsTime};
use crate::types::{ByteOrder, EncodingFormat, FormatVersion};
use crate::{MseedError, Result};

/// Size of the v2 fixed header.
pub const V2_HEADER_SIZE: usize = 48;

/// Smallest and largest v2 record length exponents accepted.
const MIN_RECLEN_POWER: u8 = 6;
const MAX_RECLEN_POWER: u8 = 16;

/// Decode a single record, auto-detecting v2 or v3.
///
/// The payload stays encoded; the v3 CRC is verified.
pub fn decode(data: &[u8]) -> Result<MseedRecord> {
    decode_with(data, &DecodeOptions::default())
}

/// Decode a single record with explicit options.
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<MseedRecord> {
    let (version, length) = detect(data)?;
    let record_bytes = data.get(..length).ok_or(MseedError::Truncated {
        expected: length,
        actual: data.len(),
    })?;

    let mut record = match version {
        FormatVersion::V2 => decode_v2(record_bytes)?,
        FormatVersion::V3 => decode_v3::decode_v3(record_bytes, options.validate_crc)?,
    };
    if options.unpack_data {
        record.unpack()?;
    }

    trace!(
        sid = %record.source_id,
        version = version.number(),
        length,
        samples = record.sample_count,
        "decoded record"
    );
    Ok(record)
}

/// Detect the format version and total length of the record at the start
/// of `data`.
///
/// Fails with [`MseedError::Truncated`] when more bytes are needed to tell,
/// carrying the number of bytes required, and with
/// [`MseedError::UnrecognizedFormat`] when the bytes are not a record.
pub fn detect(data: &[u8]) -> Result<(FormatVersion, usize)> {
    if data.len() >= 3 && data[0] == b'M' && data[1] == b'S' {
        if data[2] != 3 {
            return Err(MseedError::Format(format!(
                "unsupported format version {}",
                data[2]
            )));
        }
        return decode_v3::v3_record_length(data).map(|len| (FormatVersion::V3, len));
    }

    if data.len() < V2_HEADER_SIZE {
        return Err(MseedError::Truncated {
            expected: V2_HEADER_SIZE,
            actual: data.len(),
        });
    }
    let order = v2_header_order(data).ok_or(MseedError::UnrecognizedFormat)?;
    let b1000 = find_blockette(data, order, 1000, 8)?
        .ok_or_else(|| MseedError::Format("v2 record without Blockette 1000".into()))?;
    let power = data[b1000 + 6];
    if !(MIN_RECLEN_POWER..=MAX_RECLEN_POWER).contains(&power) {
        return Err(MseedError::Format(format!(
            "record length exponent {power} out of range"
        )));
    }
    Ok((FormatVersion::V2, 1usize << power))
}

/// Header byte order of a plausible v2 fixed header, or `None` if the
/// bytes do not look like one.
fn v2_header_order(data: &[u8]) -> Option<ByteOrder> {
    let seq_ok = data[..6]
        .iter()
        .all(|&b| b.is_ascii_digit() || b == b' ' || b == 0);
    let quality_ok = matches!(data[6], b'D' | b'R' | b'Q' | b'M');
    let reserved_ok = matches!(data[7], b' ' | 0);
    let hms_ok = data[24] <= 23 && data[25] <= 59 && data[26] <= 60;
    if !(seq_ok && quality_ok && reserved_ok && hms_ok) {
        return None;
    }
    [ByteOrder::Big, ByteOrder::Little]
        .into_iter()
        .find(|&order| {
            let year = read_u16(data, 20, order);
            let day = read_u16(data, 22, order);
            (1900..=2100).contains(&year) && (1..=366).contains(&day)
        })
}

fn read_u16(data: &[u8], offset: usize, order: ByteOrder) -> u16 {
    let bytes = [data[offset], data[offset + 1]];
    match order {
        ByteOrder::Big => u16::from_be_bytes(bytes),
        ByteOrder::Little => u16::from_le_bytes(bytes),
    }
}

fn read_i16(data: &[u8], offset: usize, order: ByteOrder) -> i16 {
    read_u16(data, offset, order) as i16
}

fn read_u32(data: &[u8], offset: usize, order: ByteOrder) -> u32 {
    let bytes = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];
    match order {
        ByteOrder::Big => u32::from_be_bytes(bytes),
        ByteOrder::Little => u32::from_le_bytes(bytes),
    }
}

/// One entry of the v2 blockette chain.
struct ChainEntry {
    offset: usize,
    blockette_type: u16,
    next: usize,
}

/// Iterator over the v2 blockette chain (type + next-offset links).
///
/// Links must move forward through the record, so the walk terminates.
struct BlocketteChain<'a> {
    data: &'a [u8],
    order: ByteOrder,
    offset: usize,
}

impl<'a> BlocketteChain<'a> {
    fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self {
            data,
            order,
            offset: read_u16(data, 46, order) as usize,
        }
    }
}

impl Iterator for BlocketteChain<'_> {
    type Item = Result<ChainEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        if offset == 0 {
            return None;
        }
        // Any error ends the walk.
        self.offset = 0;
        if offset < V2_HEADER_SIZE {
            return Some(Err(MseedError::Format(format!(
                "blockette offset {offset} inside the fixed header"
            ))));
        }
        if offset + 4 > self.data.len() {
            return Some(Err(MseedError::Truncated {
                expected: offset + 4,
                actual: self.data.len(),
            }));
        }
        let blockette_type = read_u16(self.data, offset, self.order);
        let next = read_u16(self.data, offset + 2, self.order) as usize;
        if next != 0 && next <= offset {
            return Some(Err(MseedError::Format(format!(
                "blockette chain loops back from {offset} to {next}"
            ))));
        }
        self.offset = next;
        Some(Ok(ChainEntry {
            offset,
            blockette_type,
            next,
        }))
    }
}

/// Offset of the first blockette of type `wanted`, requiring `size` bytes.
fn find_blockette(
    data: &[u8],
    order: ByteOrder,
    wanted: u16,
    size: usize,
) -> Result<Option<usize>> {
    for entry in BlocketteChain::new(data, order) {
        let entry = entry?;
        if entry.blockette_type != wanted {
            continue;
        }
        if entry.offset + size > data.len() {
            return Err(MseedError::Truncated {
                expected: entry.offset + size,
                actual: data.len(),
            });
        }
        return Ok(Some(entry.offset));
    }
    Ok(None)
}

/// Fixed size of well-known blockette types, including the 4-byte header.
fn blockette_size(
    blockette_type: u16,
    data: &[u8],
    offset: usize,
    order: ByteOrder,
) -> Option<usize> {
    match blockette_type {
        100 => Some(12),
        200 => Some(52),
        201 | 300 | 310 => Some(60),
        320 => Some(64),
        390 => Some(28),
        395 | 400 => Some(16),
        405 => Some(6),
        500 => Some(200),
        1000 | 1001 => Some(8),
        2000 if offset + 6 <= data.len() => Some(read_u16(data, offset + 4, order) as usize),
        _ => None,
    }
}

fn header_text(bytes: &[u8], field: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(|s| s.trim_matches([' ', '\0']).to_string())
        .map_err(|_| MseedError::Format(format!("{field} is not valid text")))
}

/// Decode a complete v2 record (`data` is exactly one record).
fn decode_v2(data: &[u8]) -> Result<MseedRecord> {
    let order = v2_header_order(data).ok_or(MseedError::UnrecognizedFormat)?;

    let station = header_text(&data[8..13], "station")?;
    let location = header_text(&data[13..15], "location")?;
    let channel = header_text(&data[15..18], "channel")?;
    let network = header_text(&data[18..20], "network")?;
    let source_id = SourceId::from_nslc(&network, &station, &location, &channel)?;

    let btime = BTime {
        year: read_u16(data, 20, order),
        day: read_u16(data, 22, order),
        hour: data[24],
        minute: data[25],
        second: data[26],
        // byte 27 is unused
        fract: read_u16(data, 28, order),
    };
    let mut start_time = NsTime::from_btime(&btime)?;

    let sample_count = read_u16(data, 30, order) as usize;
    let mut sample_rate =
        rate_from_factor_multiplier(read_i16(data, 32, order), read_i16(data, 34, order));

    let (activity, io, dq) = (data[36], data[37], data[38]);
    let mut flags = 0;
    if activity & 0x01 != 0 {
        flags |= FLAG_CALIBRATION;
    }
    if dq & 0x80 != 0 {
        flags |= FLAG_TIME_QUESTIONABLE;
    }
    if io & 0x20 != 0 {
        flags |= FLAG_CLOCK_LOCKED;
    }

    let time_correction = read_u32(data, 40, order) as i32;
    if time_correction != 0 && activity & 0x02 == 0 {
        start_time = start_time.checked_add_nanos(time_correction as i64 * 100_000)?;
    }

    let data_offset = read_u16(data, 44, order) as usize;
    let mut extra_headers = ExtraHeaders::default();
    let quality = data[6];
    extra_headers.set(extra::DATA_QUALITY, (quality as char).to_string())?;
    let seq_text = header_text(&data[..6], "sequence number")?;
    if let Ok(sequence) = seq_text.parse::<u32>() {
        extra_headers.set(extra::SEQUENCE, sequence)?;
    }

    let mut encoding = None;
    let mut byte_order = order;
    let mut blockettes = Vec::new();
    let chain = BlocketteChain::new(data, order).collect::<Result<Vec<_>>>()?;
    for (i, entry) in chain.iter().enumerate() {
        let body = entry.offset + 4;
        match entry.blockette_type {
            1000 if entry.offset + 8 <= data.len() => {
                encoding = Some(EncodingFormat::from_code(data[body])?);
                byte_order = if data[body + 1] == 0 {
                    ByteOrder::Little
                } else {
                    ByteOrder::Big
                };
            }
            1001 if entry.offset + 8 <= data.len() => {
                extra_headers.set(extra::TIME_QUALITY, data[body])?;
                let microseconds = data[body + 1] as i8;
                start_time = start_time.checked_add_nanos(microseconds as i64 * 1000)?;
            }
            100 if entry.offset + 12 <= data.len() => {
                let rate = f32::from_bits(read_u32(data, body, order));
                if rate.is_finite() && rate != 0.0 {
                    sample_rate = rate as f64;
                }
            }
            blockette_type => {
                let limit = if data_offset > entry.offset {
                    data_offset
                } else {
                    data.len()
                };
                let end = blockette_size(blockette_type, data, entry.offset, order)
                    .map(|size| entry.offset + size)
                    .or_else(|| (entry.next != 0).then_some(entry.next))
                    .or_else(|| chain.get(i + 1).map(|e| e.offset))
                    .unwrap_or(limit)
                    .min(data.len());
                blockettes.push(Blockette {
                    blockette_type,
                    body: data[body.min(end)..end].to_vec(),
                });
            }
        }
    }
    let encoding =
        encoding.ok_or_else(|| MseedError::Format("v2 record without Blockette 1000".into()))?;

    let payload = if sample_count == 0 {
        Vec::new()
    } else if data_offset < V2_HEADER_SIZE || data_offset > data.len() {
        return Err(MseedError::Format(format!(
            "data offset {data_offset} outside record of {} bytes",
            data.len()
        )));
    } else {
        data[data_offset..].to_vec()
    };

    let mut record = MseedRecord::new(source_id)
        .with_format_version(FormatVersion::V2)
        .with_start_time(start_time)
        .with_sample_rate(sample_rate)
        .with_encoding(encoding)
        .with_record_length(data.len() as u32)
        .with_publication_version(quality_to_pubversion(quality))
        .with_flags(flags)
        .with_extra_headers(extra_headers)
        .with_payload(payload);
    record.sample_count = sample_count;
    record.byte_order = byte_order;
    record.blockettes = blockettes;
    Ok(record)
}

/// Map a v2 quality indicator to a publication version.
pub fn quality_to_pubversion(quality: u8) -> u8 {
    match quality {
        b'R' => 1,
        b'D' => 2,
        b'Q' => 3,
        b'M' => 4,
        _ => 0,
    }
}

/// Decode the v2 sample rate factor and multiplier into Hz.
pub fn rate_from_factor_multiplier(factor: i16, multiplier: i16) -> f64 {
    let f = factor as f64;
    let m = multiplier as f64;
    match (factor, multiplier) {
        (0, _) | (_, 0) => 0.0,
        _ => match (factor > 0, multiplier > 0) {
            (true, true) => f * m,
            (true, false) => -f / m,
            (false, true) => -m / f,
            (false, false) => 1.0 / (f * m),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 512-byte v2 record: IU.ANMO.00.BHZ, 2024-015 10:30:45.1234,
    /// 20 Hz, INT32 big-endian samples [1, -2, 3], Blockette 1000 and 1001.
    fn v2_fixture() -> Vec<u8> {
        let mut rec = vec![0u8; 512];
        rec[..6].copy_from_slice(b"000042");
        rec[6] = b'D';
        rec[7] = b' ';
        rec[8..13].copy_from_slice(b"ANMO ");
        rec[13..15].copy_from_slice(b"00");
        rec[15..18].copy_from_slice(b"BHZ");
        rec[18..20].copy_from_slice(b"IU");
        rec[20..22].copy_from_slice(&2024u16.to_be_bytes());
        rec[22..24].copy_from_slice(&15u16.to_be_bytes());
        rec[24] = 10;
        rec[25] = 30;
        rec[26] = 45;
        rec[28..30].copy_from_slice(&1234u16.to_be_bytes());
        rec[30..32].copy_from_slice(&3u16.to_be_bytes());
        rec[32..34].copy_from_slice(&20i16.to_be_bytes());
        rec[34..36].copy_from_slice(&1i16.to_be_bytes());
        rec[37] = 0x20; // clock locked
        rec[39] = 2;
        rec[44..46].copy_from_slice(&64u16.to_be_bytes());
        rec[46..48].copy_from_slice(&48u16.to_be_bytes());
        // Blockette 1000
        rec[48..50].copy_from_slice(&1000u16.to_be_bytes());
        rec[50..52].copy_from_slice(&56u16.to_be_bytes());
        rec[52] = 3;
        rec[53] = 1;
        rec[54] = 9;
        // Blockette 1001: timing quality 90, +50 µs
        rec[56..58].copy_from_slice(&1001u16.to_be_bytes());
        rec[60] = 90;
        rec[61] = 50;
        for (i, v) in [1i32, -2, 3].iter().enumerate() {
            rec[64 + i * 4..68 + i * 4].copy_from_slice(&v.to_be_bytes());
        }
        rec
    }

    #[test]
    fn test_decode_v2_fixture() {
        let mut rec = decode(&v2_fixture()).unwrap();
        assert_eq!(rec.format_version, FormatVersion::V2);
        assert_eq!(rec.source_id.as_str(), "FDSN:IU_ANMO_00_B_H_Z");
        assert_eq!(rec.record_length, 512);
        assert_eq!(rec.sample_rate, 20.0);
        assert_eq!(rec.publication_version, 2);
        assert!(rec.clock_locked());
        let expected = NsTime::from_ordinal(2024, 15, 10, 30, 45, 123_450_000).unwrap();
        assert_eq!(rec.start_time, expected);
        assert_eq!(
            rec.extra_headers.get_as::<u8>(extra::TIME_QUALITY).unwrap(),
            Some(90)
        );
        assert_eq!(
            rec.extra_headers.get_as::<u32>(extra::SEQUENCE).unwrap(),
            Some(42)
        );
        assert!(rec.samples().is_none());
        assert_eq!(rec.unpack().unwrap(), &crate::Samples::Int(vec![1, -2, 3]));
    }

    #[test]
    fn test_decode_v2_little_endian_header() {
        let mut rec = v2_fixture();
        rec[20..22].copy_from_slice(&2024u16.to_le_bytes());
        rec[22..24].copy_from_slice(&15u16.to_le_bytes());
        rec[28..30].copy_from_slice(&1234u16.to_le_bytes());
        rec[30..32].copy_from_slice(&3u16.to_le_bytes());
        rec[32..34].copy_from_slice(&20i16.to_le_bytes());
        rec[34..36].copy_from_slice(&1i16.to_le_bytes());
        rec[44..46].copy_from_slice(&64u16.to_le_bytes());
        rec[46..48].copy_from_slice(&48u16.to_le_bytes());
        rec[48..50].copy_from_slice(&1000u16.to_le_bytes());
        rec[50..52].copy_from_slice(&56u16.to_le_bytes());
        rec[56..58].copy_from_slice(&1001u16.to_le_bytes());
        let decoded = decode_with(
            &rec,
            &DecodeOptions {
                unpack_data: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(decoded.sample_count, 3);
        assert_eq!(decoded.samples(), Some(&crate::Samples::Int(vec![1, -2, 3])));
    }

    #[test]
    fn test_unknown_blockette_kept() {
        let mut rec = v2_fixture();
        rec[39] = 3;
        // Unknown blockette 9999 after 1001, payload moved to offset 128.
        rec[44..46].copy_from_slice(&128u16.to_be_bytes());
        rec[58..60].copy_from_slice(&64u16.to_be_bytes());
        rec[64..66].copy_from_slice(&9999u16.to_be_bytes());
        rec[66..68].copy_from_slice(&0u16.to_be_bytes());
        rec[68..72].copy_from_slice(b"abcd");
        for (i, v) in [1i32, -2, 3].iter().enumerate() {
            rec[128 + i * 4..132 + i * 4].copy_from_slice(&v.to_be_bytes());
        }
        let mut decoded = decode(&rec).unwrap();
        assert_eq!(decoded.blockettes.len(), 1);
        assert_eq!(decoded.blockettes[0].blockette_type, 9999);
        assert_eq!(&decoded.blockettes[0].body[..4], b"abcd");
        assert_eq!(decoded.blockettes[0].body.len(), 128 - 68);
        assert_eq!(decoded.unpack().unwrap().len(), 3);
    }

    #[test]
    fn test_time_correction_applied_once() {
        let mut rec = v2_fixture();
        rec[40..44].copy_from_slice(&10i32.to_be_bytes()); // 1 ms
        let base = decode(&v2_fixture()).unwrap().start_time;
        assert_eq!(
            decode(&rec).unwrap().start_time.nanos() - base.nanos(),
            1_000_000
        );
        rec[36] |= 0x02; // correction already applied
        assert_eq!(decode(&rec).unwrap().start_time, base);
    }

    #[test]
    fn test_blockette_100_overrides_rate() {
        let mut rec = v2_fixture();
        rec[39] = 3;
        rec[58..60].copy_from_slice(&128u16.to_be_bytes());
        rec[44..46].copy_from_slice(&192u16.to_be_bytes());
        rec[128..130].copy_from_slice(&100u16.to_be_bytes());
        rec[132..136].copy_from_slice(&19.5f32.to_be_bytes());
        let decoded = decode(&rec).unwrap();
        assert_eq!(decoded.sample_rate, 19.5);
    }

    #[test]
    fn test_detect() {
        let rec = v2_fixture();
        assert_eq!(detect(&rec).unwrap(), (FormatVersion::V2, 512));
        assert!(matches!(
            detect(&rec[..20]),
            Err(MseedError::Truncated { expected: 48, .. })
        ));
        assert!(matches!(
            detect(&[b'x'; 64]),
            Err(MseedError::UnrecognizedFormat)
        ));
        assert!(matches!(detect(b"MS\x04"), Err(MseedError::Format(_))));
    }

    #[test]
    fn test_declared_length_beyond_data() {
        let rec = v2_fixture();
        assert!(matches!(
            decode(&rec[..300]),
            Err(MseedError::Truncated {
                expected: 512,
                actual: 300
            })
        ));
    }

    #[test]
    fn test_rate_factor_multiplier() {
        assert_eq!(rate_from_factor_multiplier(20, 1), 20.0);
        assert_eq!(rate_from_factor_multiplier(1, -10), 0.1);
        assert_eq!(rate_from_factor_multiplier(-10, 1), 0.1);
        assert_eq!(rate_from_factor_multiplier(-10, -10), 0.01);
        assert_eq!(rate_from_factor_multiplier(0, 1), 0.0);
    }
}
