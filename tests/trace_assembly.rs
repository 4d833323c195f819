//! End-to-end behaviour: records through the stream reader into trace lists
//! and back out through the packer.

use mseed_trace::{
    DecodeOptions, EncodingFormat, ErrorKind, FormatVersion, MseedError, MseedReader, MseedRecord,
    NsTime, PackOptions, Samples, SourceId, TraceList, TraceListOptions, decode, decode_with,
    encode,
};

fn t0() -> NsTime {
    NsTime::parse("2023-01-02T01:02:03.123456789Z").unwrap()
}

/// 500 samples of a sine wave with amplitude 500, one sample per degree.
fn sine_500() -> Vec<i32> {
    (0..500)
        .map(|x| ((x as f64).to_radians().sin() * 500.0) as i32)
        .collect()
}

fn record(sid: &str, start: NsTime, rate: f64, samples: Vec<i32>) -> Vec<u8> {
    let record = MseedRecord::new(SourceId::parse(sid).unwrap())
        .with_start_time(start)
        .with_sample_rate(rate)
        .with_encoding(EncodingFormat::Steim2)
        .with_samples(Samples::Int(samples));
    encode(&record).unwrap()
}

fn assemble(stream: &[u8]) -> TraceList {
    let mut list = TraceList::new();
    list.add_reader(MseedReader::new(stream)).unwrap();
    list
}

#[test]
fn roundtrip_across_versions_and_encodings() {
    let sid = SourceId::from_nslc("IU", "ANMO", "00", "BHZ").unwrap();
    let unpack = DecodeOptions {
        unpack_data: true,
        ..Default::default()
    };
    let encodings = [
        EncodingFormat::Int16,
        EncodingFormat::Int32,
        EncodingFormat::Steim1,
        EncodingFormat::Steim2,
    ];
    for version in [FormatVersion::V2, FormatVersion::V3] {
        for encoding in encodings {
            let original = MseedRecord::new(sid.clone())
                .with_format_version(version)
                .with_record_length(2048)
                .with_start_time(NsTime::parse("2025-04-10T12:30:45.5Z").unwrap())
                .with_sample_rate(100.0)
                .with_encoding(encoding)
                .with_samples(Samples::Int(sine_500()));
            let decoded = decode_with(&encode(&original).unwrap(), &unpack).unwrap();
            assert_eq!(decoded.format_version, version);
            assert_eq!(decoded.source_id, sid, "{version} {encoding}");
            assert_eq!(decoded.start_time, original.start_time, "{version} {encoding}");
            assert_eq!(decoded.sample_rate_hz(), 100.0);
            assert_eq!(decoded.samples(), original.samples(), "{version} {encoding}");
        }
    }
}

#[test]
fn pack_then_reassemble_is_identity() {
    let sid = SourceId::parse("FDSN:XX_TEST__B_S_X").unwrap();
    let mut list = TraceList::new();
    list.add_data(sid.clone(), Samples::Int(sine_500()), 40.0, t0())
        .unwrap();

    let options = PackOptions {
        record_length: 256,
        encoding: EncodingFormat::Steim1,
        ..Default::default()
    };
    let mut stream = Vec::new();
    let stats = list
        .pack(
            |bytes| {
                stream.extend_from_slice(bytes);
                Ok(())
            },
            &options,
        )
        .unwrap();
    assert!(stats.records > 1);

    let rebuilt = assemble(&stream);
    let trace = rebuilt.get(&sid).unwrap();
    assert_eq!(trace.segments().len(), 1);
    let segment = &trace.segments()[0];
    assert_eq!(segment.start_time, t0());
    assert_eq!(segment.end_time, t0().sample_time(499, 40.0).unwrap());
    assert_eq!(segment.samples(), Some(&Samples::Int(sine_500())));
}

#[test]
fn two_second_gap_at_one_hertz() {
    let sid = "FDSN:XX_GAP__B_H_Z";
    let mut stream = record(sid, t0(), 1.0, (0..10).collect());
    let later = t0().checked_add_nanos(12_000_000_000).unwrap();
    stream.extend(record(sid, later, 1.0, (0..10).collect()));

    let list = assemble(&stream);
    let trace = list.get(&SourceId::parse(sid).unwrap()).unwrap();
    assert_eq!(trace.segments().len(), 2);
    let gaps: Vec<_> = trace.gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert!((gaps[0].seconds() - 2.0).abs() < 0.5);
    assert!(!gaps[0].is_overlap());
}

#[test]
fn overlap_merges_without_duplicates() {
    let sid = "FDSN:XX_OVL__B_H_Z";
    let mut stream = record(sid, t0(), 1.0, (0..10).collect());
    let later = t0().checked_add_nanos(5_000_000_000).unwrap();
    stream.extend(record(sid, later, 1.0, (5..15).collect()));

    let list = assemble(&stream);
    let trace = list.get(&SourceId::parse(sid).unwrap()).unwrap();
    assert_eq!(trace.segments().len(), 1);
    let segment = &trace.segments()[0];
    assert_eq!(segment.sample_count, 15);
    assert_eq!(segment.start_time, t0());
    assert_eq!(segment.end_time, t0().checked_add_nanos(14_000_000_000).unwrap());
    assert_eq!(segment.samples(), Some(&Samples::Int((0..15).collect())));
}

#[test]
fn reverse_ingestion_matches_forward() {
    let sid = "FDSN:XX_ORD__B_H_Z";
    let records: Vec<Vec<u8>> = (0..6)
        .map(|i| {
            let start = t0().sample_time(i * 25, 20.0).unwrap();
            record(sid, start, 20.0, (i as i32 * 25..(i as i32 + 1) * 25).collect())
        })
        .collect();

    let forward = assemble(&records.concat());
    let reversed: Vec<Vec<u8>> = records.iter().rev().cloned().collect();
    let backward = assemble(&reversed.concat());

    let sid = SourceId::parse(sid).unwrap();
    let (f, b) = (forward.get(&sid).unwrap(), backward.get(&sid).unwrap());
    assert_eq!(f.segments().len(), 1);
    assert_eq!(b.segments().len(), 1);
    assert_eq!(f.segments()[0].start_time, b.segments()[0].start_time);
    assert_eq!(f.segments()[0].end_time, b.segments()[0].end_time);
    assert_eq!(f.segments()[0].samples(), b.segments()[0].samples());
    assert_eq!(f.earliest, b.earliest);
    assert_eq!(f.latest, b.latest);
}

#[test]
fn declared_length_past_end_is_truncated() {
    let sid = SourceId::parse("FDSN:XX_CUT__B_H_Z").unwrap();
    let full = encode(
        &MseedRecord::new(sid)
            .with_format_version(FormatVersion::V2)
            .with_record_length(512)
            .with_sample_rate(1.0)
            .with_encoding(EncodingFormat::Int32)
            .with_samples(Samples::Int(vec![7; 100])),
    )
    .unwrap();
    let cut = &full[..300];

    assert!(matches!(
        decode(cut),
        Err(MseedError::Truncated {
            expected: 512,
            actual: 300
        })
    ));

    let mut reader = MseedReader::new(cut);
    let err = reader.next_record().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert!(matches!(err, MseedError::AtOffset { offset: 0, .. }));
    // Fused after the error
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn different_rates_never_merge() {
    let sid = "FDSN:XX_RATE__B_H_Z";
    let mut stream = record(sid, t0(), 1.0, (0..10).collect());
    let later = t0().checked_add_nanos(10_000_000_000).unwrap();
    stream.extend(record(sid, later, 2.0, (0..10).collect()));

    let list = assemble(&stream);
    let trace = list.get(&SourceId::parse(sid).unwrap()).unwrap();
    assert_eq!(trace.segments().len(), 2);
    assert_eq!(trace.segments()[0].sample_rate, 1.0);
    assert_eq!(trace.segments()[1].sample_rate, 2.0);
}

#[test]
fn three_channels_at_40_hz() {
    let options = PackOptions {
        record_length: 512,
        encoding: EncodingFormat::Int32,
        format_version: FormatVersion::V3,
        flush_data: true,
        ..Default::default()
    };
    let sids: Vec<SourceId> = (0..3)
        .map(|c| SourceId::parse(&format!("FDSN:XX_TEST__B_S_{c}")).unwrap())
        .collect();

    let mut list = TraceList::new();
    for (c, sid) in sids.iter().enumerate() {
        let samples = sine_500().into_iter().map(|v| v + c as i32 * 1000).collect();
        list.add_data(sid.clone(), Samples::Int(samples), 40.0, t0())
            .unwrap();
    }

    let mut records = Vec::new();
    list.pack(
        |bytes| {
            records.push(bytes.to_vec());
            Ok(())
        },
        &options,
    )
    .unwrap();

    for sid in &sids {
        let max_per_record = (512 - 40 - sid.as_str().len()) / 4;
        let expected = 500usize.div_ceil(max_per_record);
        let ours: Vec<&Vec<u8>> = records
            .iter()
            .filter(|bytes| decode(bytes).unwrap().source_id == *sid)
            .collect();
        assert_eq!(ours.len(), expected, "{sid}");
        assert!(ours.iter().all(|bytes| bytes.len() <= 512));
    }
    assert!(list.is_empty());
}

#[test]
fn coverage_only_list_unpacks_from_record_list() {
    let sid = "FDSN:XX_LAZY__B_H_Z";
    let mut stream = record(sid, t0(), 10.0, (0..30).collect());
    let later = t0().sample_time(30, 10.0).unwrap();
    stream.extend(record(sid, later, 10.0, (30..60).collect()));

    let mut list = TraceList::with_options(TraceListOptions {
        record_list: true,
        unpack_data: false,
        ..Default::default()
    });
    list.add_reader(MseedReader::new(stream.as_slice())).unwrap();

    let trace = list.get_mut(&SourceId::parse(sid).unwrap()).unwrap();
    let segment = &mut trace.segments_mut()[0];
    assert!(segment.samples().is_none());
    assert_eq!(segment.record_list().map(<[_]>::len), Some(2));
    assert_eq!(
        segment.unpack_record_list().unwrap(),
        &Samples::Int((0..60).collect())
    );
}
