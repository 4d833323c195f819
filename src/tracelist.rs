//! Assembly of records into continuous trace segments.
//!
//! A [`TraceList`] groups data by source identifier (and optionally by
//! publication version) into [`TraceId`] buckets. Each bucket holds
//! time-ordered [`TraceSegment`]s: maximal runs of samples with no gap or
//! overlap beyond the time tolerance.
//!
//! Records may arrive in any order. An incoming block of samples is placed
//! on the sample grid of a segment it touches or overlaps; it is appended,
//! prepended or spliced according to the [`OverlapPolicy`], and a segment
//! that grows into a neighbour absorbs it. Alignment is measured against
//! the grid anchored at the segment start, so timing jitter never
//! accumulates across records.
//!
//! Buckets iterate in source identifier order, then publication version.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use tracing::debug;

use crate::config::{OverlapPolicy, TraceListOptions};
use crate::reader::MseedReader;
use crate::record::{MseedRecord, Samples, period_ns};
use crate::sid::SourceId;
use crate::time::{NSTMODULUS, NsTime};
use crate::types::SampleType;
use crate::{MseedError, Result};

/// How incoming samples were placed in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Started a new segment.
    New,
    /// Started a new segment because the time-adjacent segment has a
    /// different sample rate.
    RateConflict,
    Appended,
    Prepended,
    /// Joined two or more existing segments.
    Merged,
    /// Overlapping samples were resolved by the overlap policy.
    OverlapTruncated,
}

/// Where an added record or data block ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct Added {
    pub source_id: SourceId,
    pub pub_version: u8,
    /// Index of the affected segment within its trace.
    pub segment: usize,
    pub outcome: MergeOutcome,
}

/// A record contributing samples to a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPtr {
    /// The record with its payload still encoded.
    pub record: MseedRecord,
    /// Index within the record of the first contributed sample.
    pub offset: usize,
    /// Number of contributed samples.
    pub count: usize,
}

/// A continuous run of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSegment {
    pub start_time: NsTime,
    /// Time of the last sample.
    pub end_time: NsTime,
    /// Nominal sample rate in Hz.
    pub sample_rate: f64,
    pub sample_count: usize,
    /// Number of times samples were added or removed after creation.
    pub updated: u32,
    pub(crate) samples: Option<Samples>,
    record_list: Option<Vec<RecordPtr>>,
}

impl TraceSegment {
    fn new(
        start_time: NsTime,
        sample_rate: f64,
        sample_count: usize,
        samples: Option<Samples>,
        record_list: Option<Vec<RecordPtr>>,
    ) -> Result<Self> {
        let mut segment = Self {
            start_time,
            end_time: start_time,
            sample_rate,
            sample_count,
            updated: 0,
            samples,
            record_list,
        };
        segment.refresh_end()?;
        Ok(segment)
    }

    /// The samples, or `None` for a coverage-only segment.
    pub fn samples(&self) -> Option<&Samples> {
        self.samples.as_ref()
    }

    /// Contributing records, when the list keeps them.
    pub fn record_list(&self) -> Option<&[RecordPtr]> {
        self.record_list.as_deref()
    }

    pub fn sample_period_ns(&self) -> i64 {
        period_ns(self.sample_rate)
    }

    /// Decode the samples of a coverage-only segment from its record list.
    pub fn unpack_record_list(&mut self) -> Result<&Samples> {
        if self.samples.is_none() {
            let ptrs = self
                .record_list
                .as_ref()
                .ok_or_else(|| MseedError::Validation("segment has no record list".into()))?;
            let covered: usize = ptrs.iter().map(|p| p.count).sum();
            if covered != self.sample_count {
                return Err(MseedError::Validation(format!(
                    "record list covers {covered} of {} samples",
                    self.sample_count
                )));
            }
            let mut unpacked: Option<Samples> = None;
            for ptr in ptrs {
                let part = ptr
                    .record
                    .decode_payload()?
                    .slice(ptr.offset, ptr.offset + ptr.count);
                match unpacked.as_mut() {
                    Some(samples) => samples.append(&part)?,
                    None => unpacked = Some(part),
                }
            }
            self.samples = unpacked;
        }
        self.samples
            .as_ref()
            .ok_or_else(|| MseedError::Validation("segment has no samples".into()))
    }

    fn refresh_end(&mut self) -> Result<()> {
        self.end_time = match self.sample_count {
            0 => self.start_time,
            n => self.start_time.sample_time(n as i64 - 1, self.sample_rate)?,
        };
        Ok(())
    }

    /// Whether `other` lies within `slack_ns` of this segment's time span.
    fn touches(&self, other: &TraceSegment, slack_ns: i64) -> bool {
        other.start_time.nanos() <= self.end_time.nanos().saturating_add(slack_ns)
            && other.end_time.nanos().saturating_add(slack_ns) >= self.start_time.nanos()
    }

    /// Sample index of `time` on this segment's grid, if `time` is within
    /// `tolerance_ns` of a grid point.
    fn grid_offset(&self, time: NsTime, tolerance_ns: f64) -> Option<i64> {
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return None;
        }
        let period = NSTMODULUS as f64 / self.sample_rate;
        let elapsed = time.nanos().saturating_sub(self.start_time.nanos());
        let offset = (elapsed as f64 / period).round() as i64;
        let expected = self.start_time.sample_time(offset, self.sample_rate).ok()?;
        let drift = time.nanos().abs_diff(expected.nanos());
        (drift as f64 <= tolerance_ns).then_some(offset)
    }

    /// Copy of the samples in `from..to`.
    fn window(&self, from: usize, to: usize) -> Result<TraceSegment> {
        let to = to.min(self.sample_count);
        let from = from.min(to);
        TraceSegment::new(
            self.start_time.sample_time(from as i64, self.sample_rate)?,
            self.sample_rate,
            to - from,
            self.samples.as_ref().map(|s| s.slice(from, to)),
            self.record_list
                .as_deref()
                .map(|ptrs| window_ptrs(ptrs, from, to)),
        )
    }

    fn append(&mut self, other: TraceSegment) -> Result<()> {
        combine(&mut self.samples, other.samples, |a, b| a.append(b))?;
        self.record_list = match (self.record_list.take(), other.record_list) {
            (Some(mut ptrs), Some(more)) => {
                ptrs.extend(more);
                Some(ptrs)
            }
            _ => None,
        };
        self.sample_count += other.sample_count;
        Ok(())
    }

    fn prepend(&mut self, other: TraceSegment) -> Result<()> {
        combine(&mut self.samples, other.samples, |a, b| a.prepend(b))?;
        self.record_list = match (self.record_list.take(), other.record_list) {
            (Some(ptrs), Some(mut front)) => {
                front.extend(ptrs);
                Some(front)
            }
            _ => None,
        };
        self.sample_count += other.sample_count;
        self.start_time = other.start_time;
        Ok(())
    }

    /// Replace samples from `at` on with `other`, growing past the end if
    /// needed.
    fn overwrite(&mut self, at: usize, other: TraceSegment) -> Result<()> {
        let end = at + other.sample_count;
        combine(&mut self.samples, other.samples, |a, b| a.overwrite(at, b))?;
        self.record_list = match (self.record_list.take(), other.record_list) {
            (Some(ptrs), Some(middle)) => {
                let mut spliced = window_ptrs(&ptrs, 0, at);
                spliced.extend(middle);
                spliced.extend(window_ptrs(&ptrs, end, self.sample_count));
                Some(spliced)
            }
            _ => None,
        };
        self.sample_count = self.sample_count.max(end);
        Ok(())
    }

    /// Remove the first `n` samples.
    pub(crate) fn drain_front(&mut self, n: usize) -> Result<()> {
        let n = n.min(self.sample_count);
        if n == 0 {
            return Ok(());
        }
        self.start_time = self.start_time.sample_time(n as i64, self.sample_rate)?;
        if let Some(samples) = self.samples.as_mut() {
            samples.drain_front(n);
        }
        if let Some(ptrs) = self.record_list.as_mut() {
            *ptrs = window_ptrs(ptrs, n, self.sample_count);
        }
        self.sample_count -= n;
        self.updated += 1;
        self.refresh_end()
    }

    /// Place `incoming`, whose first sample falls at grid index `offset`.
    fn merge(
        &mut self,
        incoming: TraceSegment,
        offset: i64,
        policy: OverlapPolicy,
    ) -> Result<MergeOutcome> {
        let len = self.sample_count as i64;
        let n = incoming.sample_count as i64;
        let (lo, hi) = (offset, offset + n);
        let outcome = if lo == len {
            MergeOutcome::Appended
        } else if hi == 0 {
            MergeOutcome::Prepended
        } else {
            MergeOutcome::OverlapTruncated
        };

        match policy {
            OverlapPolicy::KeepExisting => {
                let back = if hi > len {
                    Some(incoming.window((len - lo).clamp(0, n) as usize, n as usize)?)
                } else {
                    None
                };
                let front = if lo < 0 {
                    Some(incoming.window(0, (-lo).min(n) as usize)?)
                } else {
                    None
                };
                if let Some(back) = back {
                    self.append(back)?;
                }
                if let Some(front) = front {
                    self.prepend(front)?;
                }
            }
            OverlapPolicy::ReplaceExisting => {
                if lo >= 0 {
                    self.overwrite(lo as usize, incoming)?;
                } else {
                    self.drain_front(hi.clamp(0, len) as usize)?;
                    self.prepend(incoming)?;
                }
            }
        }
        self.updated += 1;
        self.refresh_end()?;
        Ok(outcome)
    }
}

impl fmt::Display for TraceSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {} Hz  {} samples",
            self.start_time, self.end_time, self.sample_rate, self.sample_count
        )
    }
}

/// Apply `op` when both sides hold samples; otherwise the result only
/// tracks coverage.
fn combine(
    target: &mut Option<Samples>,
    other: Option<Samples>,
    op: impl FnOnce(&mut Samples, &Samples) -> Result<()>,
) -> Result<()> {
    match (target.as_mut(), other) {
        (Some(a), Some(b)) => op(a, &b),
        _ => {
            *target = None;
            Ok(())
        }
    }
}

/// The record pointers covering segment samples `from..to`.
fn window_ptrs(ptrs: &[RecordPtr], from: usize, to: usize) -> Vec<RecordPtr> {
    let mut out = Vec::new();
    let mut pos = 0;
    for ptr in ptrs {
        let (lo, hi) = (pos, pos + ptr.count);
        pos = hi;
        let (start, end) = (lo.max(from), hi.min(to));
        if start < end {
            out.push(RecordPtr {
                record: ptr.record.clone(),
                offset: ptr.offset + (start - lo),
                count: end - start,
            });
        }
    }
    out
}

/// A gap or overlap between two consecutive segments of a trace.
#[derive(Debug, Clone, Copy)]
pub struct Gap<'a> {
    pub prev: &'a TraceSegment,
    pub next: &'a TraceSegment,
    /// `next.start - prev.end - period`: positive for a gap, negative for
    /// an overlap.
    pub delta_ns: i64,
}

impl<'a> Gap<'a> {
    fn between(prev: &'a TraceSegment, next: &'a TraceSegment) -> Self {
        let delta_ns = next
            .start_time
            .nanos()
            .saturating_sub(prev.end_time.nanos())
            .saturating_sub(prev.sample_period_ns());
        Self {
            prev,
            next,
            delta_ns,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.delta_ns as f64 / NSTMODULUS as f64
    }

    pub fn is_overlap(&self) -> bool {
        self.delta_ns < 0
    }
}

/// Lazy sequence of gaps between the segments of one trace.
pub struct Gaps<'a> {
    windows: std::slice::Windows<'a, TraceSegment>,
}

impl<'a> Iterator for Gaps<'a> {
    type Item = Gap<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.windows.next().map(|w| Gap::between(&w[0], &w[1]))
    }
}

/// All segments of one source identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceId {
    pub source_id: SourceId,
    /// Highest publication version of the data in this trace.
    pub pub_version: u8,
    /// Start of the earliest segment.
    pub earliest: NsTime,
    /// End of the latest segment.
    pub latest: NsTime,
    pub(crate) segments: Vec<TraceSegment>,
}

impl TraceId {
    fn new(source_id: SourceId, pub_version: u8) -> Self {
        Self {
            source_id,
            pub_version,
            earliest: NsTime::EPOCH,
            latest: NsTime::EPOCH,
            segments: Vec::new(),
        }
    }

    /// Segments ordered by start time.
    pub fn segments(&self) -> &[TraceSegment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [TraceSegment] {
        &mut self.segments
    }

    pub fn gaps(&self) -> Gaps<'_> {
        Gaps {
            windows: self.segments.windows(2),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.segments.iter().map(|s| s.sample_count).sum()
    }

    pub(crate) fn refresh_bounds(&mut self) {
        if let Some(first) = self.segments.first() {
            self.earliest = first.start_time;
        }
        if let Some(latest) = self.segments.iter().map(|s| s.end_time).max() {
            self.latest = latest;
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}, version {}, {} segment(s)",
            self.source_id,
            self.pub_version,
            self.segments.len()
        )?;
        for segment in &self.segments {
            writeln!(f, "  {segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TraceKey {
    source_id: SourceId,
    pub_version: u8,
}

/// Continuous trace segments assembled from records and data blocks.
///
/// ```
/// use mseed_trace::{NsTime, Samples, SourceId, TraceList};
///
/// let sid = SourceId::parse("FDSN:XX_TEST__B_H_Z").unwrap();
/// let t0 = NsTime::parse("2024-01-01T00:00:00Z").unwrap();
/// let t1 = NsTime::parse("2024-01-01T00:00:02Z").unwrap();
///
/// let mut list = TraceList::new();
/// list.add_data(sid.clone(), Samples::Int(vec![1, 2]), 1.0, t0).unwrap();
/// list.add_data(sid.clone(), Samples::Int(vec![3, 4]), 1.0, t1).unwrap();
///
/// let trace = list.get(&sid).unwrap();
/// assert_eq!(trace.segments().len(), 1);
/// assert_eq!(trace.segments()[0].samples(), Some(&Samples::Int(vec![1, 2, 3, 4])));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TraceList {
    pub(crate) traces: BTreeMap<TraceKey, TraceId>,
    options: TraceListOptions,
}

impl TraceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TraceListOptions) -> Self {
        Self {
            traces: BTreeMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &TraceListOptions {
        &self.options
    }

    /// Number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }

    pub fn traces(&self) -> impl Iterator<Item = &TraceId> {
        self.traces.values()
    }

    pub fn traces_mut(&mut self) -> impl Iterator<Item = &mut TraceId> {
        self.traces.values_mut()
    }

    /// The trace for `source_id`; with `split_version`, the one with the
    /// highest publication version.
    pub fn get(&self, source_id: &SourceId) -> Option<&TraceId> {
        self.traces
            .range(Self::version_range(source_id))
            .next_back()
            .map(|(_, trace)| trace)
    }

    pub fn get_mut(&mut self, source_id: &SourceId) -> Option<&mut TraceId> {
        self.traces
            .range_mut(Self::version_range(source_id))
            .next_back()
            .map(|(_, trace)| trace)
    }

    /// The trace for one publication version, when keyed by version.
    pub fn get_version(&self, source_id: &SourceId, pub_version: u8) -> Option<&TraceId> {
        self.traces.get(&TraceKey {
            source_id: source_id.clone(),
            pub_version: if self.options.split_version {
                pub_version
            } else {
                0
            },
        })
    }

    fn version_range(source_id: &SourceId) -> std::ops::RangeInclusive<TraceKey> {
        TraceKey {
            source_id: source_id.clone(),
            pub_version: 0,
        }..=TraceKey {
            source_id: source_id.clone(),
            pub_version: u8::MAX,
        }
    }

    /// Distinct source identifiers in order.
    pub fn source_ids(&self) -> impl Iterator<Item = &SourceId> {
        let mut last: Option<&SourceId> = None;
        self.traces.keys().filter_map(move |key| {
            if last == Some(&key.source_id) {
                return None;
            }
            last = Some(&key.source_id);
            last
        })
    }

    /// Gaps and overlaps of every trace.
    pub fn gaps(&self) -> impl Iterator<Item = (&TraceId, Gap<'_>)> {
        self.traces
            .values()
            .flat_map(|trace| trace.gaps().map(move |gap| (trace, gap)))
    }

    /// Add a record's samples to the list.
    ///
    /// With `unpack_data` the payload is decoded; otherwise only coverage is
    /// tracked. Returns `None` for a record without samples.
    pub fn add_record(&mut self, mut record: MseedRecord) -> Result<Option<Added>> {
        if record.sample_count == 0 {
            return Ok(None);
        }
        let samples = if self.options.unpack_data {
            let samples = match record.take_samples() {
                Some(samples) => samples,
                None => record.decode_payload()?,
            };
            if samples.len() != record.sample_count {
                return Err(MseedError::Validation(format!(
                    "sample count {} does not match buffer length {}",
                    record.sample_count,
                    samples.len()
                )));
            }
            Some(samples)
        } else {
            record.take_samples();
            None
        };

        let source_id = record.source_id.clone();
        let pub_version = record.publication_version;
        let start_time = record.start_time;
        let rate = record.sample_rate_hz();
        let count = record.sample_count;
        let record_list = self.options.record_list.then(|| {
            vec![RecordPtr {
                record,
                offset: 0,
                count,
            }]
        });
        let incoming = TraceSegment::new(start_time, rate, count, samples, record_list)?;
        self.add_segment(source_id, pub_version, incoming).map(Some)
    }

    /// Add a block of samples starting at `start_time`, as if it came from
    /// a record with publication version 1.
    pub fn add_data(
        &mut self,
        source_id: SourceId,
        samples: Samples,
        sample_rate: f64,
        start_time: NsTime,
    ) -> Result<Option<Added>> {
        if samples.is_empty() {
            return Ok(None);
        }
        let count = samples.len();
        let incoming = TraceSegment::new(start_time, sample_rate, count, Some(samples), None)?;
        self.add_segment(source_id, 1, incoming).map(Some)
    }

    /// Add every record from `reader`, returning the number of records.
    ///
    /// Stops at the first read or merge error.
    pub fn add_reader<R: Read>(&mut self, reader: MseedReader<R>) -> Result<usize> {
        let mut count = 0;
        for record in reader.records() {
            self.add_record(record?)?;
            count += 1;
        }
        Ok(count)
    }

    fn tolerance_ns(&self, rate: f64) -> f64 {
        match self.options.time_tolerance {
            Some(seconds) => seconds * NSTMODULUS as f64,
            None if rate > 0.0 => self.options.tolerance_factor * NSTMODULUS as f64 / rate,
            None => 0.0,
        }
    }

    fn add_segment(
        &mut self,
        source_id: SourceId,
        pub_version: u8,
        incoming: TraceSegment,
    ) -> Result<Added> {
        let key = TraceKey {
            source_id: source_id.clone(),
            pub_version: if self.options.split_version {
                pub_version
            } else {
                0
            },
        };
        let tolerance = self.tolerance_ns(incoming.sample_rate);
        let rate_tolerance = self.options.rate_tolerance;
        let policy = self.options.overlap_policy;
        let trace = self
            .traces
            .entry(key)
            .or_insert_with(|| TraceId::new(source_id.clone(), pub_version));
        trace.pub_version = trace.pub_version.max(pub_version);

        let mut conflict = false;
        let mut type_clash = None;
        let mut target = None;
        for (i, segment) in trace.segments.iter().enumerate() {
            let slack = segment
                .sample_period_ns()
                .max(incoming.sample_period_ns())
                .saturating_add(tolerance as i64);
            if !segment.touches(&incoming, slack) {
                continue;
            }
            if !rates_compatible(segment.sample_rate, incoming.sample_rate, rate_tolerance) {
                conflict = true;
                continue;
            }
            let Some(offset) = mergeable(segment, &incoming, tolerance) else {
                continue;
            };
            if let Some((existing, added)) = type_mismatch(segment, &incoming) {
                type_clash = Some((existing, added));
                continue;
            }
            target = Some((i, offset));
            break;
        }

        if let (None, Some((existing, added))) = (target, type_clash) {
            return Err(MseedError::Validation(format!(
                "cannot merge {added} samples into a {existing} segment"
            )));
        }
        let Some((index, offset)) = target else {
            let outcome = if conflict {
                MergeOutcome::RateConflict
            } else {
                MergeOutcome::New
            };
            debug!(sid = %source_id, ?outcome, start = %incoming.start_time, "new segment");
            let index = insert_segment(trace, incoming);
            return Ok(Added {
                source_id,
                pub_version,
                segment: index,
                outcome,
            });
        };

        let mut segment = trace.segments.remove(index);
        let merged = segment
            .merge(incoming, offset, policy)
            .and_then(|outcome| {
                absorb_neighbours(trace, &mut segment, tolerance, rate_tolerance, outcome)
            });
        // The segment goes back even when merging failed.
        let samples = segment.sample_count;
        let index = insert_segment(trace, segment);
        let outcome = merged?;

        debug!(sid = %source_id, ?outcome, samples, "merged into segment");
        Ok(Added {
            source_id,
            pub_version,
            segment: index,
            outcome,
        })
    }
}

fn insert_segment(trace: &mut TraceId, segment: TraceSegment) -> usize {
    let index = trace
        .segments
        .partition_point(|s| s.start_time <= segment.start_time);
    trace.segments.insert(index, segment);
    trace.refresh_bounds();
    index
}

fn rates_compatible(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a > 0.0 && b > 0.0 && (1.0 - a / b).abs() <= tolerance)
}

/// Merge every neighbour the grown `segment` now reaches into it.
fn absorb_neighbours(
    trace: &mut TraceId,
    segment: &mut TraceSegment,
    tolerance: f64,
    rate_tolerance: f64,
    mut outcome: MergeOutcome,
) -> Result<MergeOutcome> {
    loop {
        let neighbour = trace.segments.iter().enumerate().find_map(|(j, other)| {
            if !rates_compatible(segment.sample_rate, other.sample_rate, rate_tolerance)
                || type_mismatch(segment, other).is_some()
            {
                return None;
            }
            mergeable(segment, other, tolerance).map(|offset| (j, offset))
        });
        let Some((j, offset)) = neighbour else {
            return Ok(outcome);
        };
        let other = trace.segments.remove(j);
        segment.merge(other, offset, OverlapPolicy::KeepExisting)?;
        outcome = MergeOutcome::Merged;
    }
}

/// Grid offset at which `incoming` joins `segment`, if it is aligned and
/// touches or overlaps it.
fn mergeable(segment: &TraceSegment, incoming: &TraceSegment, tolerance: f64) -> Option<i64> {
    let offset = segment.grid_offset(incoming.start_time, tolerance)?;
    if offset > segment.sample_count as i64 || offset + (incoming.sample_count as i64) < 0 {
        return None;
    }
    Some(offset)
}

/// Sample types of the two segments when both hold samples of different
/// types.
fn type_mismatch(
    segment: &TraceSegment,
    incoming: &TraceSegment,
) -> Option<(SampleType, SampleType)> {
    match (&segment.samples, &incoming.samples) {
        (Some(a), Some(b)) if a.sample_type() != b.sample_type() => {
            Some((a.sample_type(), b.sample_type()))
        }
        _ => None,
    }
}

impl fmt::Display for TraceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for trace in self.traces.values() {
            write!(f, "{trace}")?;
        }
        Ok(())
    }
}
