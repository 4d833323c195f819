//! Steim1 and Steim2 compression and decompression.
//!
//! Both schemes store first differences of integer samples packed into
//! 64-byte frames of sixteen 32-bit words. Word 0 of every frame is a
//! control word holding a 2-bit nibble per word. In the first frame, word 1
//! is the forward integration constant X0 (the first sample) and word 2 the
//! reverse integration constant Xn (the last sample), which decoding checks.
//! See Appendix B of the SEED Manual v2.4.

use crate::types::ByteOrder;
use crate::{MseedError, Result};

/// Size of one compression frame in bytes.
pub const FRAME_SIZE: usize = 64;
const WORDS_PER_FRAME: usize = 16;

/// Steim compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steim {
    One,
    Two,
}

fn read_u32(data: &[u8], offset: usize, byte_order: ByteOrder) -> u32 {
    let bytes = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];
    match byte_order {
        ByteOrder::Big => u32::from_be_bytes(bytes),
        ByteOrder::Little => u32::from_le_bytes(bytes),
    }
}

fn extract_nibble(control_word: u32, word_index: usize) -> u8 {
    let shift = 30 - (word_index * 2);
    ((control_word >> shift) & 0x03) as u8
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    (value as i32).wrapping_shl(shift).wrapping_shr(shift)
}

/// Unpack `count` fields of `bits` width, the first one starting at bit
/// `top` (counted from bit 0), most significant field first.
fn unpack_fields(word: u32, count: u32, bits: u32, top: u32, diffs: &mut Vec<i32>) {
    let mask = (1u32 << bits) - 1;
    for i in 0..count {
        let shift = top - i * bits;
        diffs.push(sign_extend((word >> shift) & mask, bits));
    }
}

/// Unpack the differences held in one data word.
fn unpack_word(level: Steim, word: u32, nibble: u8, diffs: &mut Vec<i32>) -> Result<()> {
    let dnib = ((word >> 30) & 0x03) as u8;
    match (level, nibble, dnib) {
        (_, 0b00, _) => {}
        (_, 0b01, _) => unpack_fields(word, 4, 8, 24, diffs),
        (Steim::One, 0b10, _) => unpack_fields(word, 2, 16, 16, diffs),
        (Steim::One, _, _) => diffs.push(word as i32),
        (Steim::Two, 0b10, 0b01) => unpack_fields(word, 1, 30, 0, diffs),
        (Steim::Two, 0b10, 0b10) => unpack_fields(word, 2, 15, 15, diffs),
        (Steim::Two, 0b10, 0b11) => unpack_fields(word, 3, 10, 20, diffs),
        (Steim::Two, 0b11, 0b00) => unpack_fields(word, 5, 6, 24, diffs),
        (Steim::Two, 0b11, 0b01) => unpack_fields(word, 6, 5, 25, diffs),
        (Steim::Two, 0b11, 0b10) => unpack_fields(word, 7, 4, 24, diffs),
        (Steim::Two, _, _) => {
            return Err(MseedError::Decode(format!(
                "steim2 invalid dnib {dnib:#04b} for nibble {nibble:#04b}"
            )));
        }
    }
    Ok(())
}

/// Decode Steim-compressed frames into `num_samples` integers.
///
/// A trailing partial frame is ignored. The first difference of the record
/// is skipped since the first sample is carried by X0.
pub fn decode(
    level: Steim,
    data: &[u8],
    num_samples: usize,
    byte_order: ByteOrder,
) -> Result<Vec<i32>> {
    if num_samples == 0 {
        return Ok(Vec::new());
    }
    let num_frames = data.len() / FRAME_SIZE;
    if num_frames == 0 {
        return Err(MseedError::Decode(format!(
            "{} payload bytes hold no complete frame",
            data.len()
        )));
    }

    let x0 = read_u32(data, 4, byte_order) as i32;
    let xn = read_u32(data, 8, byte_order) as i32;
    let mut diffs = Vec::with_capacity(num_samples + 7);

    'frames: for frame_idx in 0..num_frames {
        let frame_offset = frame_idx * FRAME_SIZE;
        let control_word = read_u32(data, frame_offset, byte_order);
        let first_word = if frame_idx == 0 { 3 } else { 1 };

        for word_idx in first_word..WORDS_PER_FRAME {
            if diffs.len() >= num_samples {
                break 'frames;
            }
            let word = read_u32(data, frame_offset + word_idx * 4, byte_order);
            let nibble = extract_nibble(control_word, word_idx);
            unpack_word(level, word, nibble, &mut diffs)?;
        }
    }

    if diffs.len() < num_samples {
        return Err(MseedError::SampleCountMismatch {
            expected: num_samples,
            actual: diffs.len(),
        });
    }

    let mut samples = Vec::with_capacity(num_samples);
    let mut acc = x0;
    samples.push(acc);
    for &diff in &diffs[1..num_samples] {
        acc = acc.wrapping_add(diff);
        samples.push(acc);
    }

    if acc != xn {
        return Err(MseedError::Decode(format!(
            "last sample {acc} does not match reverse integration constant {xn}"
        )));
    }
    Ok(samples)
}

/// Decode Steim1 compressed data into i32 samples.
pub fn decode_steim1(data: &[u8], num_samples: usize, byte_order: ByteOrder) -> Result<Vec<i32>> {
    decode(Steim::One, data, num_samples, byte_order)
}

/// Decode Steim2 compressed data into i32 samples.
pub fn decode_steim2(data: &[u8], num_samples: usize, byte_order: ByteOrder) -> Result<Vec<i32>> {
    decode(Steim::Two, data, num_samples, byte_order)
}

/// Encode samples into at most `max_frames` frames.
///
/// Returns the encoded frames and the number of leading samples they hold.
/// With `max_frames == None` every sample is encoded. Xn is the last
/// sample actually consumed.
pub fn encode_frames(
    level: Steim,
    samples: &[i32],
    max_frames: Option<usize>,
    byte_order: ByteOrder,
) -> Result<(Vec<u8>, usize)> {
    if samples.is_empty() || max_frames == Some(0) {
        return Ok((Vec::new(), 0));
    }

    let mut diffs = Vec::with_capacity(samples.len());
    diffs.push(0i32);
    diffs.extend(samples.windows(2).map(|w| w[1].wrapping_sub(w[0])));

    let mut frames: Vec<[u32; WORDS_PER_FRAME]> = Vec::new();
    let mut diff_idx = 0;

    while diff_idx < diffs.len() && max_frames.is_none_or(|max| frames.len() < max) {
        let mut frame = [0u32; WORDS_PER_FRAME];
        let mut control: u32 = 0;
        let first_word = if frames.is_empty() { 3 } else { 1 };

        for (word_idx, slot) in frame.iter_mut().enumerate().skip(first_word) {
            if diff_idx >= diffs.len() {
                break;
            }
            let (packed_word, nibble, consumed) = match level {
                Steim::One => steim1_pack_diffs(&diffs[diff_idx..]),
                Steim::Two => steim2_pack_diffs(&diffs[diff_idx..])?,
            };
            *slot = packed_word;
            control |= (nibble as u32) << (30 - word_idx * 2);
            diff_idx += consumed;
        }

        frame[0] = control;
        frames.push(frame);
    }

    frames[0][1] = samples[0] as u32;
    frames[0][2] = samples[diff_idx - 1] as u32;

    let mut output = Vec::with_capacity(frames.len() * FRAME_SIZE);
    for frame in &frames {
        for &word in frame {
            match byte_order {
                ByteOrder::Big => output.extend_from_slice(&word.to_be_bytes()),
                ByteOrder::Little => output.extend_from_slice(&word.to_le_bytes()),
            }
        }
    }
    Ok((output, diff_idx))
}

/// Encode i32 samples using Steim1 compression.
pub fn encode_steim1(samples: &[i32], byte_order: ByteOrder) -> Result<Vec<u8>> {
    encode_frames(Steim::One, samples, None, byte_order).map(|(bytes, _)| bytes)
}

/// Encode i32 samples using Steim2 compression.
///
/// Fails if two consecutive samples differ by more than 30 bits can hold.
pub fn encode_steim2(samples: &[i32], byte_order: ByteOrder) -> Result<Vec<u8>> {
    encode_frames(Steim::Two, samples, None, byte_order).map(|(bytes, _)| bytes)
}

fn fits(diffs: &[i32], n: usize, bits: u32) -> bool {
    let min = -(1i32 << (bits - 1));
    let max = (1i32 << (bits - 1)) - 1;
    diffs.len() >= n && diffs[..n].iter().all(|d| (min..=max).contains(d))
}

fn pack_fields(diffs: &[i32], n: usize, bits: u32, top: u32) -> u32 {
    let mask = (1u32 << bits) - 1;
    diffs[..n]
        .iter()
        .enumerate()
        .fold(0u32, |word, (i, &d)| {
            word | (((d as u32) & mask) << (top - i as u32 * bits))
        })
}

/// Pack consecutive diffs into a single Steim1 word.
/// Returns (packed_word, nibble, num_consumed).
fn steim1_pack_diffs(diffs: &[i32]) -> (u32, u8, usize) {
    if fits(diffs, 4, 8) {
        return (pack_fields(diffs, 4, 8, 24), 0b01, 4);
    }
    if fits(diffs, 2, 16) {
        return (pack_fields(diffs, 2, 16, 16), 0b10, 2);
    }
    (diffs[0] as u32, 0b11, 1)
}

/// Pack consecutive diffs into a single Steim2 word.
/// Returns (packed_word, nibble, num_consumed).
fn steim2_pack_diffs(diffs: &[i32]) -> Result<(u32, u8, usize)> {
    // (count, bits, top bit, nibble, dnib), densest first
    const LAYOUTS: [(usize, u32, u32, u8, u32); 6] = [
        (7, 4, 24, 0b11, 0b10),
        (6, 5, 25, 0b11, 0b01),
        (5, 6, 24, 0b11, 0b00),
        (4, 8, 24, 0b01, 0b00),
        (3, 10, 20, 0b10, 0b11),
        (2, 15, 15, 0b10, 0b10),
    ];
    for (count, bits, top, nibble, dnib) in LAYOUTS {
        if fits(diffs, count, bits) {
            let word = (dnib << 30) | pack_fields(diffs, count, bits, top);
            return Ok((word, nibble, count));
        }
    }
    if fits(diffs, 1, 30) {
        let word = (0b01u32 << 30) | ((diffs[0] as u32) & 0x3FFF_FFFF);
        return Ok((word, 0b10, 1));
    }
    Err(MseedError::Validation(format!(
        "difference {} exceeds the 30-bit steim2 range",
        diffs[0]
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One frame: X0=10, Xn=12, word 3 = four 8-bit diffs [5, 1, -2, 3].
    fn hand_built_steim1_frame(xn: i32) -> Vec<u8> {
        let mut words = [0u32; WORDS_PER_FRAME];
        words[0] = 0b01 << 24;
        words[1] = 10;
        words[2] = xn as u32;
        words[3] = 0x05_01_FE_03;
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn random_walk(n: usize, step: i32) -> Vec<i32> {
        let mut rng_state: u32 = 42;
        let mut val: i32 = 0;
        (0..n)
            .map(|_| {
                rng_state = rng_state.wrapping_mul(1103515245).wrapping_add(12345);
                let diff = ((rng_state >> 16) as i32 % (2 * step)) - step;
                val = val.wrapping_add(diff);
                val
            })
            .collect()
    }

    #[test]
    fn test_first_difference_is_skipped() {
        let frame = hand_built_steim1_frame(12);
        let decoded = decode_steim1(&frame, 4, ByteOrder::Big).unwrap();
        assert_eq!(decoded, vec![10, 11, 9, 12]);
    }

    #[test]
    fn test_reverse_constant_mismatch() {
        let frame = hand_built_steim1_frame(13);
        let err = decode_steim1(&frame, 4, ByteOrder::Big).unwrap_err();
        assert!(matches!(err, MseedError::Decode(_)), "{err}");
    }

    #[test]
    fn test_too_few_differences() {
        let frame = hand_built_steim1_frame(12);
        assert!(matches!(
            decode_steim1(&frame, 9, ByteOrder::Big),
            Err(MseedError::SampleCountMismatch {
                expected: 9,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_steim2_bad_dnib() {
        let mut words = [0u32; WORDS_PER_FRAME];
        words[0] = 0b10 << 24;
        words[3] = 0x0000_0001; // nibble 10 requires dnib 01, 10 or 11
        let frame: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let err = decode_steim2(&frame, 1, ByteOrder::Big);
        assert!(matches!(err, Err(MseedError::Decode(_))));
    }

    #[test]
    fn test_no_frames() {
        assert!(decode_steim2(&[0u8; 32], 3, ByteOrder::Big).is_err());
        assert!(decode_steim2(&[], 0, ByteOrder::Big).unwrap().is_empty());
    }

    #[test]
    fn test_steim1_roundtrip() {
        let samples: Vec<i32> = (0..100).collect();
        let encoded = encode_steim1(&samples, ByteOrder::Big).unwrap();
        let decoded = decode_steim1(&encoded, samples.len(), ByteOrder::Big).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_steim2_roundtrip_random() {
        let samples = random_walk(500, 500);
        let encoded = encode_steim2(&samples, ByteOrder::Big).unwrap();
        let decoded = decode_steim2(&encoded, samples.len(), ByteOrder::Big).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_extreme_values_wrap() {
        let samples = vec![i32::MAX, i32::MIN, 0, i32::MIN, i32::MAX];
        let encoded = encode_steim1(&samples, ByteOrder::Big).unwrap();
        let decoded = decode_steim1(&encoded, samples.len(), ByteOrder::Big).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_steim2_rejects_wide_differences() {
        let samples = vec![0, 1 << 29];
        assert!(matches!(
            encode_steim2(&samples, ByteOrder::Big),
            Err(MseedError::Validation(_))
        ));
        let samples = vec![0, (1 << 29) - 1];
        assert!(encode_steim2(&samples, ByteOrder::Big).is_ok());
    }

    #[test]
    fn test_bounded_frames() {
        let samples = random_walk(2000, 20_000);
        let (bytes, consumed) =
            encode_frames(Steim::One, &samples, Some(3), ByteOrder::Big).unwrap();
        assert_eq!(bytes.len(), 3 * FRAME_SIZE);
        assert!(consumed > 0 && consumed < samples.len());
        let decoded = decode_steim1(&bytes, consumed, ByteOrder::Big).unwrap();
        assert_eq!(decoded, samples[..consumed]);
    }

    #[test]
    fn test_little_endian_frames() {
        let samples = random_walk(64, 8);
        let encoded = encode_steim2(&samples, ByteOrder::Little).unwrap();
        let decoded = decode_steim2(&encoded, samples.len(), ByteOrder::Little).unwrap();
        assert_eq!(decoded, samples);
    }
}
