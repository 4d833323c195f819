//! Compile-time smoke test: verify top-level re-exports work.

use mseed_trace::{
    Added, BTime, Blockette, ByteOrder, DecodeOptions, EncodingFormat, ErrorKind, ExtraHeaders,
    FormatVersion, Gap, MergeOutcome, MseedError, MseedReader, MseedRecord, NsTime, OverlapPolicy,
    PackOptions, PackStats, ReadEvent, ReaderOptions, RecordPtr, Result, SampleType, Samples,
    SourceId, SubSecond, TimeFormat, TimeParts, TraceId, TraceList, TraceListOptions,
    TraceSegment, decode, decode_with, detect, encode,
};

#[test]
fn top_level_imports_compile() {
    // Just verify the types are usable from the crate root
    let _: fn(&[u8]) -> Result<MseedRecord> = decode;
    let _: fn(&[u8], &DecodeOptions) -> Result<MseedRecord> = decode_with;
    let _: fn(&[u8]) -> Result<(FormatVersion, usize)> = detect;
    let _: fn(&MseedRecord) -> Result<Vec<u8>> = encode;

    let _bo = ByteOrder::Big;
    let _s = Samples::Int(vec![]);
    let _st = SampleType::Int;
    let _bt = BTime {
        year: 2025,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
        fract: 0,
    };
    let _tp: Option<TimeParts> = None;
    let _nt = NsTime::EPOCH;
    let _tf = (TimeFormat::IsoMonthDayZ, SubSecond::Nano);

    let _enc = EncodingFormat::Steim1;
    let _fv = FormatVersion::V2;

    let _sid = SourceId::from_nslc("IU", "ANMO", "00", "BHZ");
    let _extra = ExtraHeaders::default();

    let _opts = (
        ReaderOptions::default(),
        TraceListOptions::default(),
        PackOptions::default(),
        OverlapPolicy::KeepExisting,
    );
    let _list = TraceList::new();
    let _stats = PackStats::default();
    let _outcome = MergeOutcome::Appended;
    let _reader: MseedReader<&[u8]> = MseedReader::new(&[][..]);

    // Types only reachable through other values
    let _: Option<(&TraceId, &TraceSegment, Gap<'_>, Added, RecordPtr, ReadEvent, Blockette)> =
        None;

    // MseedError is accessible
    let _e: Option<MseedError> = None;
    let _k = ErrorKind::Io;
}
