//! Unified miniSEED record type for v2 and v3.
//!
//! [`MseedRecord`] represents a single miniSEED record, either decoded from
//! bytes or built for packing. Both formats share one struct; v2-only header
//! fields (quality indicator, sequence number, timing quality) travel in the
//! extra headers under their FDSN names.

use std::fmt;

use crate::encoding;
use crate::extra::ExtraHeaders;
use crate::sid::SourceId;
use crate::time::{NSTMODULUS, NsTime};
use crate::types::{ByteOrder, EncodingFormat, FormatVersion, SampleType};
use crate::{MseedError, Result};

/// v3 flag bit: calibration signals present.
pub const FLAG_CALIBRATION: u8 = 0x01;
/// v3 flag bit: time tag is questionable.
pub const FLAG_TIME_QUESTIONABLE: u8 = 0x02;
/// v3 flag bit: clock locked.
pub const FLAG_CLOCK_LOCKED: u8 = 0x04;

/// A v2 blockette carried through unchanged.
///
/// Blockettes 100, 1000 and 1001 are interpreted by the codec and are not
/// kept here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockette {
    pub blockette_type: u16,
    /// Body bytes following the 4-byte type/next-offset header, in the
    /// record's header byte order.
    pub body: Vec<u8>,
}

/// A miniSEED record (v2 or v3).
#[derive(Debug, Clone, PartialEq)]
pub struct MseedRecord {
    /// The miniSEED format version of this record.
    pub format_version: FormatVersion,
    pub source_id: SourceId,
    /// Time of the first sample.
    pub start_time: NsTime,
    /// Nominal rate: positive values are Hz, negative values are a sample
    /// period in seconds.
    pub sample_rate: f64,
    pub sample_count: usize,
    pub encoding: EncodingFormat,
    pub publication_version: u8,
    /// Record length in bytes; the maximum when packing.
    pub record_length: u32,
    /// v3 flag bits, see [`FLAG_CALIBRATION`] and friends.
    pub flags: u8,
    pub extra_headers: ExtraHeaders,
    /// Stored CRC-32C (v3 only, 0 otherwise).
    pub crc: u32,
    /// Byte order of the encoded payload.
    pub byte_order: ByteOrder,
    pub blockettes: Vec<Blockette>,
    payload: Vec<u8>,
    samples: Option<Samples>,
}

impl MseedRecord {
    /// Create a record template with v3 defaults: 4096-byte records,
    /// Steim-2, publication version 1 and no samples.
    pub fn new(source_id: SourceId) -> Self {
        Self {
            format_version: FormatVersion::V3,
            source_id,
            start_time: NsTime::EPOCH,
            sample_rate: 0.0,
            sample_count: 0,
            encoding: EncodingFormat::Steim2,
            publication_version: 1,
            record_length: 4096,
            flags: 0,
            extra_headers: ExtraHeaders::default(),
            crc: 0,
            byte_order: ByteOrder::Big,
            blockettes: Vec::new(),
            payload: Vec::new(),
            samples: None,
        }
    }

    pub(crate) fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_format_version(mut self, version: FormatVersion) -> Self {
        self.format_version = version;
        self
    }

    pub fn with_start_time(mut self, time: NsTime) -> Self {
        self.start_time = time;
        self
    }

    /// Set the sample rate in Hz (negative for a period in seconds).
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn with_encoding(mut self, enc: EncodingFormat) -> Self {
        self.encoding = enc;
        self
    }

    pub fn with_record_length(mut self, len: u32) -> Self {
        self.record_length = len;
        self
    }

    pub fn with_publication_version(mut self, version: u8) -> Self {
        self.publication_version = version;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_extra_headers(mut self, headers: ExtraHeaders) -> Self {
        self.extra_headers = headers;
        self
    }

    /// Set the sample data; the sample count follows the buffer length.
    pub fn with_samples(mut self, samples: Samples) -> Self {
        self.sample_count = samples.len();
        self.samples = Some(samples);
        self
    }

    /// Decoded samples, if the payload has been unpacked.
    pub fn samples(&self) -> Option<&Samples> {
        self.samples.as_ref()
    }

    /// Take the decoded samples out of the record.
    pub fn take_samples(&mut self) -> Option<Samples> {
        self.samples.take()
    }

    /// The encoded payload as read from the record.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload if not already done.
    pub fn unpack(&mut self) -> Result<&Samples> {
        let samples = match self.samples.take() {
            Some(samples) => samples,
            None => self.decode_payload()?,
        };
        Ok(self.samples.insert(samples))
    }

    /// Decode the payload without caching the result.
    pub fn decode_payload(&self) -> Result<Samples> {
        if self.sample_count == 0 {
            return Ok(Samples::empty(self.encoding.sample_type()));
        }
        let samples = encoding::decode_samples(
            &self.payload,
            self.encoding,
            self.sample_count,
            self.byte_order,
        )?;
        if samples.len() != self.sample_count {
            return Err(MseedError::SampleCountMismatch {
                expected: self.sample_count,
                actual: samples.len(),
            });
        }
        Ok(samples)
    }

    /// Rate in Hz regardless of whether a rate or period is stored.
    pub fn sample_rate_hz(&self) -> f64 {
        rate_hz(self.sample_rate)
    }

    /// The raw stored rate/period value.
    pub fn sample_rate_raw(&self) -> f64 {
        self.sample_rate
    }

    /// Sample period in nanoseconds, or 0 for a zero rate.
    pub fn sample_period_ns(&self) -> i64 {
        period_ns(self.sample_rate_hz())
    }

    /// Time of the last sample.
    pub fn end_time(&self) -> Result<NsTime> {
        if self.sample_count == 0 {
            return Ok(self.start_time);
        }
        self.start_time
            .sample_time(self.sample_count as i64 - 1, self.sample_rate_hz())
    }

    pub fn sample_type(&self) -> SampleType {
        self.encoding.sample_type()
    }

    pub fn calibration_signals(&self) -> bool {
        self.flags & FLAG_CALIBRATION != 0
    }

    pub fn time_tag_questionable(&self) -> bool {
        self.flags & FLAG_TIME_QUESTIONABLE != 0
    }

    pub fn clock_locked(&self) -> bool {
        self.flags & FLAG_CLOCK_LOCKED != 0
    }

    /// Check the sample buffer against the header before encoding.
    pub(crate) fn validate_for_pack(&self) -> Result<&Samples> {
        let samples = self
            .samples
            .as_ref()
            .ok_or_else(|| MseedError::Validation("record has no sample buffer".into()))?;
        if samples.len() != self.sample_count {
            return Err(MseedError::Validation(format!(
                "sample count {} does not match buffer length {}",
                self.sample_count,
                samples.len()
            )));
        }
        encoding::check_compatible(samples, self.encoding)?;
        Ok(samples)
    }
}

/// Convert a raw rate/period value to Hz.
pub fn rate_hz(raw: f64) -> f64 {
    if raw < 0.0 { -1.0 / raw } else { raw }
}

/// Sample period in nanoseconds for a rate in Hz, 0 when undefined.
pub fn period_ns(hz: f64) -> i64 {
    if hz > 0.0 && hz.is_finite() {
        (NSTMODULUS as f64 / hz).round() as i64
    } else {
        0
    }
}

impl fmt::Display for MseedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {} samples, {} Hz, {}",
            self.source_id,
            self.publication_version,
            self.record_length,
            self.sample_count,
            self.sample_rate_hz(),
            self.start_time,
        )
    }
}

/// Decoded sample data.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Text(Vec<u8>),
}

/// Apply the same expression to the vector inside any [`Samples`] variant.
macro_rules! each_variant {
    ($samples:expr, $v:ident => $body:expr) => {
        match $samples {
            Samples::Int($v) => $body,
            Samples::Float($v) => $body,
            Samples::Double($v) => $body,
            Samples::Text($v) => $body,
        }
    };
}

/// Apply an operation to two [`Samples`] of the same variant.
macro_rules! each_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr) => {
        match ($a, $b) {
            (Samples::Int($x), Samples::Int($y)) => Ok($body),
            (Samples::Float($x), Samples::Float($y)) => Ok($body),
            (Samples::Double($x), Samples::Double($y)) => Ok($body),
            (Samples::Text($x), Samples::Text($y)) => Ok($body),
            (a, b) => Err(MseedError::Validation(format!(
                "cannot combine {} samples with {} samples",
                a.sample_type(),
                b.sample_type()
            ))),
        }
    };
}

impl Samples {
    /// An empty buffer of the given type.
    pub fn empty(sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::Int => Samples::Int(Vec::new()),
            SampleType::Float => Samples::Float(Vec::new()),
            SampleType::Double => Samples::Double(Vec::new()),
            SampleType::Text => Samples::Text(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::Int(_) => SampleType::Int,
            Samples::Float(_) => SampleType::Float,
            Samples::Double(_) => SampleType::Double,
            Samples::Text(_) => SampleType::Text,
        }
    }

    /// Copy of the samples in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Samples {
        each_variant!(self, v => {
            let end = end.min(v.len());
            let start = start.min(end);
            Samples::from(v[start..end].to_vec())
        })
    }

    /// Append the samples of `other`.
    pub fn append(&mut self, other: &Samples) -> Result<()> {
        each_pair!(self, other, a, b => a.extend_from_slice(b))
    }

    /// Insert the samples of `other` at the front.
    pub fn prepend(&mut self, other: &Samples) -> Result<()> {
        each_pair!(self, other, a, b => {
            a.splice(0..0, b.iter().cloned());
        })
    }

    /// Overwrite samples starting at `at` with `other`, growing the buffer
    /// if `other` runs past the end.
    pub fn overwrite(&mut self, at: usize, other: &Samples) -> Result<()> {
        each_pair!(self, other, a, b => {
            let at = at.min(a.len());
            let end = (at + b.len()).min(a.len());
            a.splice(at..end, b.iter().cloned());
        })
    }

    /// Remove the first `n` samples.
    pub fn drain_front(&mut self, n: usize) {
        each_variant!(self, v => {
            let n = n.min(v.len());
            v.drain(..n);
        })
    }
}

impl From<Vec<i32>> for Samples {
    fn from(v: Vec<i32>) -> Self {
        Samples::Int(v)
    }
}

impl From<Vec<f32>> for Samples {
    fn from(v: Vec<f32>) -> Self {
        Samples::Float(v)
    }
}

impl From<Vec<f64>> for Samples {
    fn from(v: Vec<f64>) -> Self {
        Samples::Double(v)
    }
}

impl From<Vec<u8>> for Samples {
    fn from(v: Vec<u8>) -> Self {
        Samples::Text(v)
    }
}
