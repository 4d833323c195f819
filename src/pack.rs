//! Packing samples into records.
//!
//! [`TraceList::pack`] slices every segment into records of at most
//! `record_length` bytes and hands each one to a sink callback.
//! [`MseedRecord::pack`] does the same for a single record template.
//!
//! A sink returning an error stops packing at once. Samples in records the
//! sink accepted are removed from the list (unless `maintain` is set);
//! nothing else changes.

use tracing::{debug, trace};

use crate::config::PackOptions;
use crate::encode::{encode, encode_chunk, first_sequence};
use crate::encoding;
use crate::extra::ExtraHeaders;
use crate::record::MseedRecord;
use crate::sid::SourceId;
use crate::tracelist::{TraceId, TraceList, TraceSegment};
use crate::{MseedError, Result};

/// Totals of a packing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Samples written.
    pub samples: usize,
    /// Records passed to the sink.
    pub records: usize,
}

impl TraceList {
    /// Pack all traces into records, in trace order.
    ///
    /// With `flush_data` off, the record that would hold the last samples
    /// of a segment is held back, so packing can resume once more data has
    /// been added.
    pub fn pack<F>(&mut self, mut sink: F, options: &PackOptions) -> Result<PackStats>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let extra = pack_extra_headers(options)?;
        let mut stats = PackStats::default();
        let mut sequence = 1;
        let mut result = Ok(());
        for trace in self.traces.values_mut() {
            result = pack_trace(trace, &mut sink, options, &extra, &mut sequence, &mut stats);
            if result.is_err() {
                break;
            }
        }
        if !options.maintain {
            self.traces.retain(|_, trace| !trace.segments.is_empty());
        }
        debug!(
            records = stats.records,
            samples = stats.samples,
            "packed trace list"
        );
        result.map(|()| stats)
    }

    /// Pack the trace of one source identifier.
    pub fn pack_source<F>(
        &mut self,
        source_id: &SourceId,
        mut sink: F,
        options: &PackOptions,
    ) -> Result<PackStats>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let extra = pack_extra_headers(options)?;
        let trace = self
            .get_mut(source_id)
            .ok_or_else(|| MseedError::NoSuchSourceId(source_id.to_string()))?;
        let mut stats = PackStats::default();
        let mut sequence = 1;
        let result = pack_trace(trace, &mut sink, options, &extra, &mut sequence, &mut stats);
        if !options.maintain {
            self.traces.retain(|_, trace| !trace.segments.is_empty());
        }
        result.map(|()| stats)
    }
}

fn pack_extra_headers(options: &PackOptions) -> Result<Option<ExtraHeaders>> {
    options
        .extra_headers
        .as_deref()
        .map(ExtraHeaders::parse)
        .transpose()
}

fn pack_trace<F>(
    trace: &mut TraceId,
    sink: &mut F,
    options: &PackOptions,
    extra: &Option<ExtraHeaders>,
    sequence: &mut u32,
    stats: &mut PackStats,
) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut template = MseedRecord::new(trace.source_id.clone())
        .with_format_version(options.format_version)
        .with_record_length(options.record_length)
        .with_encoding(options.encoding)
        .with_publication_version(trace.pub_version.max(1));
    if let Some(extra) = extra {
        template.extra_headers = extra.clone();
    }

    let mut result = Ok(());
    for segment in trace.segments.iter_mut() {
        template.sample_rate = segment.sample_rate;
        let mut packed = 0;
        let outcome = pack_segment(
            segment,
            &template,
            sink,
            options,
            sequence,
            stats,
            &mut packed,
        );
        if !options.maintain {
            segment.drain_front(packed)?;
        }
        if outcome.is_err() {
            result = outcome;
            break;
        }
    }
    if !options.maintain {
        trace.segments.retain(|s| s.sample_count > 0);
        trace.refresh_bounds();
    }
    result
}

/// Pack one segment, counting the samples the sink accepted in `packed`.
fn pack_segment<F>(
    segment: &TraceSegment,
    template: &MseedRecord,
    sink: &mut F,
    options: &PackOptions,
    sequence: &mut u32,
    stats: &mut PackStats,
    packed: &mut usize,
) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let samples = segment.samples().ok_or_else(|| {
        MseedError::Validation(format!(
            "segment of {} starting {} has no samples to pack",
            template.source_id, segment.start_time
        ))
    })?;
    encoding::check_compatible(samples, template.encoding)?;

    while *packed < segment.sample_count {
        let start = segment
            .start_time
            .sample_time(*packed as i64, segment.sample_rate)?;
        let (bytes, used) = encode_chunk(template, samples, *packed, start, *sequence)?;
        if !options.flush_data && *packed + used == segment.sample_count {
            break;
        }
        sink(&bytes)?;
        trace!(
            sid = %template.source_id,
            start = %start,
            samples = used,
            length = bytes.len(),
            "packed record"
        );
        *packed += used;
        stats.samples += used;
        stats.records += 1;
        *sequence = sequence.wrapping_add(1);
    }
    Ok(())
}

impl MseedRecord {
    /// Pack this record's samples into as many records as needed, each at
    /// most `record_length` bytes, passing each to `sink`.
    ///
    /// A record without samples produces a single header-only record.
    pub fn pack<F>(&self, mut sink: F) -> Result<PackStats>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let decoded;
        let samples = match self.samples() {
            Some(_) => self.validate_for_pack()?,
            None => {
                decoded = self.decode_payload()?;
                &decoded
            }
        };
        if samples.is_empty() {
            sink(&encode(self)?)?;
            return Ok(PackStats {
                samples: 0,
                records: 1,
            });
        }

        let mut sequence = first_sequence(self)?;
        let rate = self.sample_rate_hz();
        let mut stats = PackStats::default();
        while stats.samples < samples.len() {
            let start = self.start_time.sample_time(stats.samples as i64, rate)?;
            let (bytes, used) = encode_chunk(self, samples, stats.samples, start, sequence)?;
            sink(&bytes)?;
            stats.samples += used;
            stats.records += 1;
            sequence = sequence.wrapping_add(1);
        }
        Ok(stats)
    }
}
