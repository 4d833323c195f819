//! Sequential reader for multi-record miniSEED data.
//!
//! [`MseedReader`] pulls bytes from any [`Read`] source, reads just enough
//! to learn each record's length, then decodes the full record. It yields
//! [`ReadEvent`]s: decoded records and, when resync is enabled, reports of
//! bytes skipped while searching for the next record.
//!
//! By default the reader fails fast: the first bad record ends iteration
//! with an error carrying its byte offset. With
//! [`ReaderOptions::skip_not_data`] it instead drops bytes one at a time
//! until a decodable record starts.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::warn;

use crate::config::ReaderOptions;
use crate::decode::{decode_with, detect};
use crate::record::MseedRecord;
use crate::{MseedError, Result};

const READ_CHUNK: usize = 8192;

/// One step of reading a stream.
#[derive(Debug)]
pub enum ReadEvent {
    Record(MseedRecord),
    /// `length` bytes starting at stream `offset` did not hold a record and
    /// were skipped.
    SkippedBytes { offset: u64, length: usize },
}

/// Iterator over the records of a byte source.
///
/// # Example
///
/// ```
/// use mseed_trace::{encode, EncodingFormat, MseedReader, MseedRecord, Samples, SourceId};
///
/// let sid = SourceId::parse("FDSN:XX_TEST__B_H_Z").unwrap();
/// let record = MseedRecord::new(sid)
///     .with_encoding(EncodingFormat::Int32)
///     .with_samples(Samples::Int(vec![1, 2, 3]));
/// let mut data = encode(&record).unwrap();
/// data.extend(encode(&record).unwrap());
///
/// let records: Vec<_> = MseedReader::new(data.as_slice())
///     .records()
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
/// assert_eq!(records.len(), 2);
/// ```
pub struct MseedReader<R> {
    source: R,
    options: ReaderOptions,
    buffer: Vec<u8>,
    /// Start of unconsumed bytes in `buffer`.
    pos: usize,
    /// Stream offset of `buffer[pos]`.
    offset: u64,
    eof: bool,
    failed: bool,
    skipped: Option<(u64, usize)>,
    /// Record found right after a skipped run, returned on the next call.
    pending: Option<MseedRecord>,
}

impl<R: Read> MseedReader<R> {
    /// Create a fail-fast reader with default decode options.
    pub fn new(source: R) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        Self {
            source,
            options,
            buffer: Vec::new(),
            pos: 0,
            offset: 0,
            eof: false,
            failed: false,
            skipped: None,
            pending: None,
        }
    }

    /// Stream offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// The next record, passing over skipped-bytes events.
    ///
    /// Returns `Ok(None)` at the end of the source.
    pub fn next_record(&mut self) -> Result<Option<MseedRecord>> {
        while let Some(event) = self.next() {
            if let ReadEvent::Record(record) = event? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Iterate over records only.
    pub fn records(self) -> Records<R> {
        Records { reader: self }
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn available(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// Read until at least `needed` bytes are buffered or the source ends.
    fn fill(&mut self, needed: usize) -> Result<()> {
        if self.pos > 0 && self.pos >= self.buffer.len() / 2 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
        let mut chunk = [0u8; READ_CHUNK];
        while !self.eof && self.available().len() < needed {
            match self.source.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn consume(&mut self, n: usize) {
        self.pos += n;
        self.offset += n as u64;
    }

    /// Decode the record at the current position.
    fn read_record(&mut self) -> Result<MseedRecord> {
        let length = loop {
            match detect(self.available()) {
                Ok((_, length)) => break length,
                Err(MseedError::Truncated { expected, actual })
                    if !self.eof && expected > actual =>
                {
                    self.fill(expected)?;
                }
                Err(e) => return Err(e),
            }
        };
        self.fill(length)?;
        let available = self.available();
        let bytes = available.get(..length).ok_or(MseedError::Truncated {
            expected: length,
            actual: available.len(),
        })?;
        let record = decode_with(bytes, &self.options.decode)?;
        self.consume(length);
        Ok(record)
    }

    fn take_skipped(&mut self) -> Option<ReadEvent> {
        let (offset, length) = self.skipped.take()?;
        warn!(offset, length, "skipped bytes that are not miniSEED");
        Some(ReadEvent::SkippedBytes { offset, length })
    }
}

impl<R: Read + Seek> MseedReader<R> {
    /// Restart reading from the beginning of the source.
    pub fn rewind(&mut self) -> Result<()> {
        self.source.seek(SeekFrom::Start(0))?;
        self.buffer.clear();
        self.pos = 0;
        self.offset = 0;
        self.eof = false;
        self.failed = false;
        self.skipped = None;
        self.pending = None;
        Ok(())
    }
}

impl<R: Read> Iterator for MseedReader<R> {
    type Item = Result<ReadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(ReadEvent::Record(record)));
        }
        if self.failed {
            return None;
        }
        loop {
            if let Err(e) = self.fill(1) {
                self.failed = true;
                return Some(Err(e.at_offset(self.offset)));
            }
            if self.available().is_empty() {
                return self.take_skipped().map(Ok);
            }

            let offset = self.offset;
            match self.read_record() {
                Ok(record) => {
                    // Report a skipped run before the record that ended it.
                    if let Some(event) = self.take_skipped() {
                        self.pending = Some(record);
                        return Some(Ok(event));
                    }
                    return Some(Ok(ReadEvent::Record(record)));
                }
                Err(e @ MseedError::Io(_)) => {
                    self.failed = true;
                    return Some(Err(e.at_offset(offset)));
                }
                Err(e) if !self.options.skip_not_data => {
                    self.failed = true;
                    return Some(Err(e.at_offset(offset)));
                }
                Err(_) => {
                    let run = self.skipped.get_or_insert((offset, 0));
                    run.1 += 1;
                    self.consume(1);
                }
            }
        }
    }
}

/// Iterator over the records of an [`MseedReader`], see
/// [`MseedReader::records`].
pub struct Records<R> {
    reader: MseedReader<R>,
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<MseedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}
