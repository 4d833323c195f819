//! Record-by-record comparison of miniSEED buffers.

use std::ops::Range;

use crate::decode::{decode, detect};
use crate::record::MseedRecord;
use crate::sid::SourceId;
use crate::time::NsTime;
use crate::{MseedError, Result};

/// Per-record equality of two buffers, in record order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentComparison {
    /// Records are byte-for-byte identical.
    pub binary: Vec<bool>,
    /// Records carry the same identifier, timing, versions, flags and samples.
    pub logical: Vec<bool>,
    /// Record counts of the two buffers.
    pub counts: (usize, usize),
}

impl ContentComparison {
    /// Both buffers hold the same number of records and every pair is
    /// logically equal.
    pub fn is_equal(&self) -> bool {
        self.counts.0 == self.counts.1 && self.logical.iter().all(|&eq| eq)
    }
}

struct Span {
    source_id: SourceId,
    start_time: NsTime,
    range: Range<usize>,
}

fn record_spans(content: &[u8]) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while offset < content.len() {
        let rest = &content[offset..];
        let (_, length) = detect(rest).map_err(|e| e.at_offset(offset as u64))?;
        let bytes = rest.get(..length).ok_or_else(|| {
            MseedError::Truncated {
                expected: length,
                actual: rest.len(),
            }
            .at_offset(offset as u64)
        })?;
        let record = decode(bytes).map_err(|e| e.at_offset(offset as u64))?;
        spans.push(Span {
            source_id: record.source_id,
            start_time: record.start_time,
            range: offset..offset + length,
        });
        offset += length;
    }
    Ok(spans)
}

/// Reorder the records of `content` by source identifier, then start time.
///
/// Records with equal keys keep their relative order.
pub fn sort_records(content: &[u8]) -> Result<Vec<u8>> {
    let mut spans = record_spans(content)?;
    spans.sort_by(|a, b| {
        a.source_id
            .cmp(&b.source_id)
            .then(a.start_time.cmp(&b.start_time))
    });
    let mut sorted = Vec::with_capacity(content.len());
    for span in &spans {
        sorted.extend_from_slice(&content[span.range.clone()]);
    }
    Ok(sorted)
}

/// Compare the records of two buffers pairwise.
///
/// With `ignore_order` both buffers are sorted first. Pairing stops at the
/// end of the shorter buffer; `counts` tells whether they differ in length.
pub fn compare_content(a: &[u8], b: &[u8], ignore_order: bool) -> Result<ContentComparison> {
    let (a, b) = if ignore_order {
        (sort_records(a)?, sort_records(b)?)
    } else {
        (a.to_vec(), b.to_vec())
    };
    let spans_a = record_spans(&a)?;
    let spans_b = record_spans(&b)?;

    let mut comparison = ContentComparison {
        counts: (spans_a.len(), spans_b.len()),
        ..Default::default()
    };
    for (sa, sb) in spans_a.iter().zip(&spans_b) {
        let bytes_a = &a[sa.range.clone()];
        let bytes_b = &b[sb.range.clone()];
        comparison.binary.push(bytes_a == bytes_b);
        comparison
            .logical
            .push(logically_equal(&decode(bytes_a)?, &decode(bytes_b)?)?);
    }
    Ok(comparison)
}

/// Same source, timing, publication version, flags and decoded samples,
/// whatever the format version or encoding.
pub fn logically_equal(a: &MseedRecord, b: &MseedRecord) -> Result<bool> {
    if a.source_id != b.source_id
        || a.start_time != b.start_time
        || a.sample_rate_hz() != b.sample_rate_hz()
        || a.sample_count != b.sample_count
        || a.publication_version != b.publication_version
        || a.flags != b.flags
    {
        return Ok(false);
    }
    Ok(a.decode_payload()? == b.decode_payload()?)
}
