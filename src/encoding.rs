//! Sample payload codecs, dispatched on [`EncodingFormat`].
//!
//! Each encoding is a pair of pure functions: [`decode_samples`] turns a
//! payload into [`Samples`] and [`encode_samples`] does the reverse. The
//! packer uses [`encode_bounded`] to fill a record with as many samples as
//! fit in the available payload space.

use crate::record::Samples;
use crate::steim::{self, FRAME_SIZE, Steim};
use crate::types::{ByteOrder, EncodingFormat};
use crate::{MseedError, Result};

/// Decode `count` samples from a payload.
pub fn decode_samples(
    payload: &[u8],
    encoding: EncodingFormat,
    count: usize,
    byte_order: ByteOrder,
) -> Result<Samples> {
    match encoding {
        EncodingFormat::Text => Ok(Samples::Text(fixed_width(payload, count, 1)?.to_vec())),
        EncodingFormat::Int16 => {
            let data = fixed_width(payload, count, 2)?;
            Ok(Samples::Int(
                data.chunks_exact(2)
                    .map(|c| {
                        let bytes = [c[0], c[1]];
                        i32::from(match byte_order {
                            ByteOrder::Big => i16::from_be_bytes(bytes),
                            ByteOrder::Little => i16::from_le_bytes(bytes),
                        })
                    })
                    .collect(),
            ))
        }
        EncodingFormat::Int32 => {
            let data = fixed_width(payload, count, 4)?;
            Ok(Samples::Int(
                data.chunks_exact(4)
                    .map(|c| i32::from_bits_in(word4(c), byte_order))
                    .collect(),
            ))
        }
        EncodingFormat::Float32 => {
            let data = fixed_width(payload, count, 4)?;
            Ok(Samples::Float(
                data.chunks_exact(4)
                    .map(|c| f32::from_bits_in(word4(c), byte_order))
                    .collect(),
            ))
        }
        EncodingFormat::Float64 => {
            let data = fixed_width(payload, count, 8)?;
            Ok(Samples::Double(
                data.chunks_exact(8)
                    .map(|c| {
                        let mut bytes = [0u8; 8];
                        bytes.copy_from_slice(c);
                        match byte_order {
                            ByteOrder::Big => f64::from_be_bytes(bytes),
                            ByteOrder::Little => f64::from_le_bytes(bytes),
                        }
                    })
                    .collect(),
            ))
        }
        EncodingFormat::Steim1 => {
            steim::decode(Steim::One, payload, count, byte_order).map(Samples::Int)
        }
        EncodingFormat::Steim2 => {
            steim::decode(Steim::Two, payload, count, byte_order).map(Samples::Int)
        }
    }
}

/// Encode every sample.
///
/// Fails with a validation error if the encoding cannot represent the
/// sample type, or a value is out of range for the encoding.
pub fn encode_samples(
    samples: &Samples,
    encoding: EncodingFormat,
    byte_order: ByteOrder,
) -> Result<Vec<u8>> {
    encode_bounded(samples, encoding, byte_order, None).map(|(bytes, _)| bytes)
}

/// Encode as many leading samples as fit in `max_bytes`.
///
/// Returns the payload and the number of samples it holds. Steim payloads
/// are always a whole number of frames.
pub fn encode_bounded(
    samples: &Samples,
    encoding: EncodingFormat,
    byte_order: ByteOrder,
    max_bytes: Option<usize>,
) -> Result<(Vec<u8>, usize)> {
    check_compatible(samples, encoding)?;
    let fit = |size: usize| max_bytes.map_or(samples.len(), |max| samples.len().min(max / size));

    match (encoding, samples) {
        (EncodingFormat::Text, Samples::Text(text)) => {
            let n = fit(1);
            Ok((text[..n].to_vec(), n))
        }
        (EncodingFormat::Int16, Samples::Int(values)) => {
            let n = fit(2);
            let mut out = Vec::with_capacity(n * 2);
            for &v in &values[..n] {
                let v = i16::try_from(v).map_err(|_| {
                    MseedError::Validation(format!("sample {v} out of range for INT16"))
                })?;
                out.extend_from_slice(&match byte_order {
                    ByteOrder::Big => v.to_be_bytes(),
                    ByteOrder::Little => v.to_le_bytes(),
                });
            }
            Ok((out, n))
        }
        (EncodingFormat::Int32, Samples::Int(values)) => {
            let n = fit(4);
            let out = values[..n]
                .iter()
                .flat_map(|v| match byte_order {
                    ByteOrder::Big => v.to_be_bytes(),
                    ByteOrder::Little => v.to_le_bytes(),
                })
                .collect();
            Ok((out, n))
        }
        (EncodingFormat::Float32, Samples::Float(values)) => {
            let n = fit(4);
            let out = values[..n]
                .iter()
                .flat_map(|v| match byte_order {
                    ByteOrder::Big => v.to_be_bytes(),
                    ByteOrder::Little => v.to_le_bytes(),
                })
                .collect();
            Ok((out, n))
        }
        (EncodingFormat::Float64, Samples::Double(values)) => {
            let n = fit(8);
            let out = values[..n]
                .iter()
                .flat_map(|v| match byte_order {
                    ByteOrder::Big => v.to_be_bytes(),
                    ByteOrder::Little => v.to_le_bytes(),
                })
                .collect();
            Ok((out, n))
        }
        (EncodingFormat::Steim1, Samples::Int(values)) => steim::encode_frames(
            Steim::One,
            values,
            max_bytes.map(|max| max / FRAME_SIZE),
            byte_order,
        ),
        (EncodingFormat::Steim2, Samples::Int(values)) => steim::encode_frames(
            Steim::Two,
            values,
            max_bytes.map(|max| max / FRAME_SIZE),
            byte_order,
        ),
        _ => Err(incompatible(samples, encoding)),
    }
}

/// Upper bound on the number of samples `max_bytes` of payload can hold.
pub fn max_samples(encoding: EncodingFormat, max_bytes: usize) -> usize {
    let frames = max_bytes / FRAME_SIZE;
    match encoding {
        EncodingFormat::Text => max_bytes,
        EncodingFormat::Int16 => max_bytes / 2,
        EncodingFormat::Int32 | EncodingFormat::Float32 => max_bytes / 4,
        EncodingFormat::Float64 => max_bytes / 8,
        // 15 data words per frame, up to 4 or 7 differences per word
        EncodingFormat::Steim1 => frames * 15 * 4,
        EncodingFormat::Steim2 => frames * 15 * 7,
    }
}

/// Check that `encoding` can represent the sample type of `samples`.
pub fn check_compatible(samples: &Samples, encoding: EncodingFormat) -> Result<()> {
    if samples.sample_type() == encoding.sample_type() {
        Ok(())
    } else {
        Err(incompatible(samples, encoding))
    }
}

fn incompatible(samples: &Samples, encoding: EncodingFormat) -> MseedError {
    MseedError::Validation(format!(
        "{encoding} encoding cannot represent {} samples",
        samples.sample_type()
    ))
}

fn fixed_width(payload: &[u8], count: usize, size: usize) -> Result<&[u8]> {
    let needed = count
        .checked_mul(size)
        .ok_or_else(|| MseedError::Decode(format!("{count} samples overflow")))?;
    payload.get(..needed).ok_or_else(|| {
        MseedError::Decode(format!(
            "payload holds {} bytes, {count} samples need {needed}",
            payload.len()
        ))
    })
}

fn word4(c: &[u8]) -> [u8; 4] {
    [c[0], c[1], c[2], c[3]]
}

trait FromBitsIn {
    fn from_bits_in(bytes: [u8; 4], byte_order: ByteOrder) -> Self;
}

impl FromBitsIn for i32 {
    fn from_bits_in(bytes: [u8; 4], byte_order: ByteOrder) -> Self {
        match byte_order {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        }
    }
}

impl FromBitsIn for f32 {
    fn from_bits_in(bytes: [u8; 4], byte_order: ByteOrder) -> Self {
        match byte_order {
            ByteOrder::Big => f32::from_be_bytes(bytes),
            ByteOrder::Little => f32::from_le_bytes(bytes),
        }
    }
}
