//! Pure Rust miniSEED v2 and v3 record codec and trace assembly.
//!
//! Decode and encode single records (Steim1/2, INT16/32, FLOAT32/64 and
//! text payloads, CRC-32C checked v3 records), read record streams from
//! any [`std::io::Read`], assemble records into continuous traces with
//! [`TraceList`], and pack traces back into records.
//!
//! # Decoding a record
//!
//! ```
//! use mseed_trace::{decode, encode, MseedRecord, Samples, SourceId};
//!
//! let sid = SourceId::from_nslc("IU", "ANMO", "00", "BHZ").unwrap();
//! let record = MseedRecord::new(sid)
//!     .with_sample_rate(20.0)
//!     .with_samples(Samples::Int(vec![100, 200, 300]));
//!
//! let bytes = encode(&record).unwrap();
//! let mut decoded = decode(&bytes).unwrap();
//!
//! assert_eq!(decoded.source_id.as_str(), "FDSN:IU_ANMO_00_B_H_Z");
//! assert_eq!(decoded.sample_count, 3);
//! assert_eq!(decoded.unpack().unwrap(), &Samples::Int(vec![100, 200, 300]));
//! ```
//!
//! # Reading a stream into traces
//!
//! ```
//! use mseed_trace::{encode, MseedReader, MseedRecord, NsTime, Samples, SourceId, TraceList};
//!
//! let sid = SourceId::parse("FDSN:XX_TEST__B_S_0").unwrap();
//! let start = NsTime::parse("2024-03-01T00:00:00Z").unwrap();
//! let first = MseedRecord::new(sid.clone())
//!     .with_start_time(start)
//!     .with_sample_rate(1.0)
//!     .with_samples(Samples::Int(vec![1, 2, 3]));
//! let second = first
//!     .clone()
//!     .with_start_time(start.sample_time(3, 1.0).unwrap())
//!     .with_samples(Samples::Int(vec![4, 5, 6]));
//!
//! let mut data = encode(&first).unwrap();
//! data.extend_from_slice(&encode(&second).unwrap());
//!
//! let mut traces = TraceList::new();
//! traces.add_reader(MseedReader::new(&data[..])).unwrap();
//!
//! let trace = traces.get(&sid).unwrap();
//! assert_eq!(trace.segments().len(), 1);
//! assert_eq!(trace.sample_count(), 6);
//! ```
//!
//! # Packing traces into v2 records
//!
//! ```
//! use mseed_trace::{
//!     EncodingFormat, FormatVersion, NsTime, PackOptions, Samples, SourceId, TraceList,
//! };
//!
//! let mut traces = TraceList::new();
//! traces
//!     .add_data(
//!         SourceId::from_nslc("XX", "TEST", "00", "BHZ").unwrap(),
//!         Samples::Int((0..1000).collect()),
//!         20.0,
//!         NsTime::parse("2025-04-10T12:30:45Z").unwrap(),
//!     )
//!     .unwrap();
//!
//! let options = PackOptions {
//!     record_length: 512,
//!     encoding: EncodingFormat::Steim2,
//!     format_version: FormatVersion::V2,
//!     ..Default::default()
//! };
//! let mut records = Vec::new();
//! let stats = traces
//!     .pack(|bytes| {
//!         records.push(bytes.to_vec());
//!         Ok(())
//!     }, &options)
//!     .unwrap();
//!
//! assert_eq!(stats.samples, 1000);
//! assert!(records.iter().all(|r| r.len() == 512));
//! assert!(traces.is_empty());
//! ```

pub mod compare;
pub mod config;
pub mod crc;
pub mod decode;
pub mod decode_v3;
pub mod encode;
pub mod encode_v3;
pub mod encoding;
pub mod error;
pub mod extra;
pub mod pack;
pub mod reader;
pub mod record;
pub mod sid;
pub mod steim;
pub mod time;
pub mod tracelist;
pub mod types;

pub use config::{DecodeOptions, OverlapPolicy, PackOptions, ReaderOptions, TraceListOptions};
pub use error::{ErrorKind, MseedError, Result};
pub use extra::ExtraHeaders;
pub use pack::PackStats;
pub use reader::{MseedReader, ReadEvent};
pub use record::{Blockette, MseedRecord, Samples};
pub use sid::SourceId;
pub use time::{BTime, NsTime, SubSecond, TimeFormat, TimeParts};
pub use tracelist::{Added, Gap, MergeOutcome, RecordPtr, TraceId, TraceList, TraceSegment};
pub use types::{ByteOrder, EncodingFormat, FormatVersion, SampleType};

pub use decode::{decode, decode_with, detect};
pub use encode::encode;
