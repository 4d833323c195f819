//! Encode an [`MseedRecord`] into miniSEED record bytes.
//!
//! [`encode()`] serializes a record into exactly one record of at most
//! `record_length` bytes. Splitting a long sample buffer across several
//! records is the job of [`MseedRecord::pack`](crate::MseedRecord::pack).
//!
//! v2 records are always written big-endian with Blockette 1000. Blockette
//! 1001 is added for sub-100 µs start times or a timing quality header, and
//! Blockette 100 when the factor/multiplier pair cannot express the rate
//! exactly. Start time precision below 1 µs is lost in v2.

use crate::encode_v3;
use crate::encoding;
use crate::extra;
use crate::record::{
    FLAG_CALIBRATION, FLAG_CLOCK_LOCKED, FLAG_TIME_QUESTIONABLE, MseedRecord, Samples,
};
use crate::steim::FRAME_SIZE;
use crate::time::NsTime;
use crate::types::{ByteOrder, FormatVersion};
use crate::{MseedError, Result};

/// Largest sample count a v2 header can hold.
const V2_MAX_SAMPLES: usize = u16::MAX as usize;

/// Encode a record holding all of its samples.
///
/// The record needs either decoded samples or, for records obtained from
/// [`decode`](crate::decode()), its still-encoded payload. Fails with a
/// validation error if the samples do not fit in `record_length`.
pub fn encode(record: &MseedRecord) -> Result<Vec<u8>> {
    let target_order = payload_order(record);
    let sequence = first_sequence(record)?;
    // A v2 payload carries the record's padding and may not fit elsewhere.
    let reuse_payload = record.samples().is_none()
        && record.sample_count > 0
        && record.byte_order == target_order
        && record.payload().len() <= payload_capacity(record, record.start_time)?;
    let decoded;
    let samples = match record.samples() {
        Some(_) => record.validate_for_pack()?,
        None if reuse_payload => {
            return assemble(
                record,
                record.start_time,
                record.sample_count,
                record.payload(),
                sequence,
            );
        }
        None => {
            decoded = record.decode_payload()?;
            &decoded
        }
    };

    let (bytes, consumed) = encode_chunk(record, samples, 0, record.start_time, sequence)?;
    if consumed < samples.len() {
        return Err(MseedError::Validation(format!(
            "only {consumed} of {} samples fit in a {}-byte record",
            samples.len(),
            record.record_length
        )));
    }
    Ok(bytes)
}

/// Sequence number of a record's first v2 record: its `/FDSN/Sequence`
/// header, or 1.
pub(crate) fn first_sequence(record: &MseedRecord) -> Result<u32> {
    match record.format_version {
        FormatVersion::V2 => Ok(record
            .extra_headers
            .get_as::<u32>(extra::SEQUENCE)?
            .unwrap_or(1)),
        FormatVersion::V3 => Ok(1),
    }
}

/// Byte order of the payload written for `record`'s format and encoding.
fn payload_order(record: &MseedRecord) -> ByteOrder {
    match record.format_version {
        FormatVersion::V2 => ByteOrder::Big,
        FormatVersion::V3 => record.encoding.v3_byte_order(),
    }
}

/// Encode as many samples from index `from` on as fit into one record
/// shaped like `template`, the first of them at `start_time`. Returns the
/// record bytes and the number of samples used.
pub(crate) fn encode_chunk(
    template: &MseedRecord,
    samples: &Samples,
    from: usize,
    start_time: NsTime,
    sequence: u32,
) -> Result<(Vec<u8>, usize)> {
    let capacity = payload_capacity(template, start_time)?;
    let mut limit = encoding::max_samples(template.encoding, capacity);
    if template.format_version == FormatVersion::V2 {
        limit = limit.min(V2_MAX_SAMPLES);
    }
    let window;
    let samples = if from == 0 && samples.len() <= limit {
        samples
    } else {
        window = samples.slice(from, from.saturating_add(limit));
        &window
    };

    let (payload, consumed) = encoding::encode_bounded(
        samples,
        template.encoding,
        payload_order(template),
        Some(capacity),
    )?;
    if consumed == 0 && !samples.is_empty() {
        return Err(MseedError::Validation(format!(
            "record length {} leaves no room for {} samples",
            template.record_length, template.encoding
        )));
    }
    let bytes = assemble(template, start_time, consumed, &payload, sequence)?;
    Ok((bytes, consumed))
}

/// Payload bytes available in one record shaped like `template`.
pub(crate) fn payload_capacity(template: &MseedRecord, start_time: NsTime) -> Result<usize> {
    let overhead = match template.format_version {
        FormatVersion::V2 => {
            check_v2_record_length(template.record_length)?;
            v2_data_offset(template, start_time)?
        }
        FormatVersion::V3 => encode_v3::header_length(template)?,
    };
    (template.record_length as usize)
        .checked_sub(overhead)
        .filter(|&cap| cap > 0)
        .ok_or_else(|| {
            MseedError::Validation(format!(
                "record length {} is smaller than the {overhead}-byte header",
                template.record_length
            ))
        })
}

fn assemble(
    template: &MseedRecord,
    start_time: NsTime,
    sample_count: usize,
    payload: &[u8],
    sequence: u32,
) -> Result<Vec<u8>> {
    match template.format_version {
        FormatVersion::V2 => assemble_v2(template, start_time, sample_count, payload, sequence),
        FormatVersion::V3 => encode_v3::assemble_v3(template, start_time, sample_count, payload),
    }
}

fn check_v2_record_length(length: u32) -> Result<u8> {
    if !length.is_power_of_two() || !(64..=65536).contains(&length) {
        return Err(MseedError::Validation(format!(
            "v2 record length {length} is not a power of two between 64 and 65536"
        )));
    }
    Ok(length.trailing_zeros() as u8)
}

/// Blockettes written for a v2 record, in chain order: (type, body).
fn v2_blockettes(template: &MseedRecord, start_time: NsTime) -> Result<Vec<(u16, Vec<u8>)>> {
    let mut blockettes = Vec::new();

    let micros = (start_time.nanos().rem_euclid(100_000) / 1000) as i8;
    let timing_quality: Option<u8> = template.extra_headers.get_as(extra::TIME_QUALITY)?;
    if micros != 0 || timing_quality.is_some() {
        let mut body = vec![0u8; 4];
        body[0] = timing_quality.unwrap_or(0);
        body[1] = micros as u8;
        blockettes.push((1001, body));
    }

    let rate = template.sample_rate_hz();
    let (factor, multiplier) = factor_multiplier(rate).unwrap_or((0, 0));
    if crate::decode::rate_from_factor_multiplier(factor, multiplier) != rate {
        let mut body = vec![0u8; 8];
        body[..4].copy_from_slice(&(rate as f32).to_be_bytes());
        blockettes.push((100, body));
    }

    for b in &template.blockettes {
        blockettes.push((b.blockette_type, b.body.clone()));
    }
    Ok(blockettes)
}

fn v2_data_offset(template: &MseedRecord, start_time: NsTime) -> Result<usize> {
    let end = v2_blockettes(template, start_time)?
        .iter()
        .fold(56, |end, (_, body)| end + 4 + body.len());
    Ok(if template.encoding.is_steim() {
        end.next_multiple_of(FRAME_SIZE)
    } else {
        end
    })
}

fn assemble_v2(
    template: &MseedRecord,
    start_time: NsTime,
    sample_count: usize,
    payload: &[u8],
    sequence: u32,
) -> Result<Vec<u8>> {
    let power = check_v2_record_length(template.record_length)?;
    let rec_len = template.record_length as usize;
    let blockettes = v2_blockettes(template, start_time)?;
    let data_offset = v2_data_offset(template, start_time)?;
    if data_offset + payload.len() > rec_len {
        return Err(MseedError::Validation(format!(
            "{} payload bytes exceed record capacity of {} bytes",
            payload.len(),
            rec_len.saturating_sub(data_offset)
        )));
    }
    let sample_count = u16::try_from(sample_count).map_err(|_| {
        MseedError::Validation(format!("{sample_count} samples exceed the v2 limit"))
    })?;

    let mut buf = vec![0u8; rec_len];
    let sid = &template.source_id;

    let seq = format!("{:06}", sequence % 1_000_000);
    buf[0..6].copy_from_slice(seq.as_bytes());
    buf[6] = v2_quality(template)?;
    buf[7] = b' ';

    write_padded(&mut buf[8..13], sid.station(), "station")?;
    write_padded(&mut buf[13..15], sid.location(), "location")?;
    write_padded(&mut buf[15..18], &sid.channel(), "channel")?;
    write_padded(&mut buf[18..20], sid.network(), "network")?;

    let bt = start_time.to_btime()?;
    buf[20..22].copy_from_slice(&bt.year.to_be_bytes());
    buf[22..24].copy_from_slice(&bt.day.to_be_bytes());
    buf[24] = bt.hour;
    buf[25] = bt.minute;
    buf[26] = bt.second;
    buf[28..30].copy_from_slice(&bt.fract.to_be_bytes());

    buf[30..32].copy_from_slice(&sample_count.to_be_bytes());
    let (factor, multiplier) = factor_multiplier(template.sample_rate_hz()).unwrap_or((0, 0));
    buf[32..34].copy_from_slice(&factor.to_be_bytes());
    buf[34..36].copy_from_slice(&multiplier.to_be_bytes());

    if template.flags & FLAG_CALIBRATION != 0 {
        buf[36] |= 0x01;
    }
    if template.flags & FLAG_CLOCK_LOCKED != 0 {
        buf[37] |= 0x20;
    }
    if template.flags & FLAG_TIME_QUESTIONABLE != 0 {
        buf[38] |= 0x80;
    }
    buf[39] = u8::try_from(blockettes.len() + 1)
        .map_err(|_| MseedError::Validation("too many blockettes".into()))?;
    buf[44..46].copy_from_slice(&(data_offset as u16).to_be_bytes());
    buf[46..48].copy_from_slice(&48u16.to_be_bytes());

    // Blockette 1000
    buf[48..50].copy_from_slice(&1000u16.to_be_bytes());
    let next = if blockettes.is_empty() { 0 } else { 56u16 };
    buf[50..52].copy_from_slice(&next.to_be_bytes());
    buf[52] = template.encoding.to_code();
    buf[53] = 1;
    buf[54] = power;

    let mut offset = 56;
    for (i, (blockette_type, body)) in blockettes.iter().enumerate() {
        let end = offset + 4 + body.len();
        let next = if i + 1 < blockettes.len() { end as u16 } else { 0 };
        buf[offset..offset + 2].copy_from_slice(&blockette_type.to_be_bytes());
        buf[offset + 2..offset + 4].copy_from_slice(&next.to_be_bytes());
        buf[offset + 4..end].copy_from_slice(body);
        offset = end;
    }

    buf[data_offset..data_offset + payload.len()].copy_from_slice(payload);
    Ok(buf)
}

/// Quality indicator: the `/FDSN/DataQuality` header if set, otherwise
/// derived from the publication version.
fn v2_quality(template: &MseedRecord) -> Result<u8> {
    let header: Option<String> = template.extra_headers.get_as(extra::DATA_QUALITY)?;
    if let Some([q @ (b'D' | b'R' | b'Q' | b'M'), ..]) = header.as_deref().map(str::as_bytes) {
        return Ok(*q);
    }
    Ok(match template.publication_version {
        1 => b'R',
        3 => b'Q',
        4 => b'M',
        _ => b'D',
    })
}

fn write_padded(dest: &mut [u8], src: &str, field: &str) -> Result<()> {
    let bytes = src.as_bytes();
    if bytes.len() > dest.len() {
        return Err(MseedError::Validation(format!(
            "{field} code {src:?} longer than {} characters",
            dest.len()
        )));
    }
    for (i, slot) in dest.iter_mut().enumerate() {
        *slot = bytes.get(i).copied().unwrap_or(b' ');
    }
    Ok(())
}

/// Choose a v2 sample rate factor and multiplier for a rate in Hz.
///
/// Integer rates and integer periods are exact; other rates use the
/// closest fraction with 16-bit terms. `None` if no pair fits.
pub fn factor_multiplier(rate: f64) -> Option<(i16, i16)> {
    const MAX: i64 = i16::MAX as i64;
    if rate == 0.0 {
        return Some((0, 0));
    }
    if !rate.is_finite() || rate < 0.0 {
        return None;
    }
    if rate.fract() == 0.0 && rate <= MAX as f64 {
        return Some((rate as i16, 1));
    }
    let period = 1.0 / rate;
    if period.fract() == 0.0 && period <= MAX as f64 {
        return Some((-(period as i16), 1));
    }
    let (num, den) = rational_approx(rate, MAX);
    if num == 0 || den == 0 {
        return None;
    }
    Some((num as i16, -(den as i16)))
}

/// Best continued-fraction approximation of `x` with terms up to `max`.
fn rational_approx(x: f64, max: i64) -> (i64, i64) {
    let (mut h_prev, mut h) = (0i64, 1i64);
    let (mut k_prev, mut k) = (1i64, 0i64);
    let mut v = x;
    for _ in 0..64 {
        let a = v.floor();
        if a > max as f64 {
            break;
        }
        let a = a as i64;
        let h_next = a * h + h_prev;
        let k_next = a * k + k_prev;
        if h_next > max || k_next > max {
            break;
        }
        (h_prev, h) = (h, h_next);
        (k_prev, k) = (k, k_next);
        let frac = v - v.floor();
        if frac < 1e-12 {
            break;
        }
        v = 1.0 / frac;
    }
    (h, k)
}
