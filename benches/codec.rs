use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use mseed_trace::{
    DecodeOptions, EncodingFormat, FormatVersion, MseedReader, MseedRecord, NsTime, PackOptions,
    Samples, SourceId, TraceList, decode, decode_with, encode,
};

/// Generate realistic seismic-like samples (smooth with small diffs, good for Steim).
fn seismic_samples(n: usize) -> Vec<i32> {
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        // Slow sinusoidal drift + small noise-like variation
        let drift = (i as f64 * 0.05).sin() * 50.0;
        let noise = ((i as f64 * 1.7).sin() * 10.0) as i32;
        v.push(1000 + drift as i32 + noise);
    }
    v
}

fn start() -> NsTime {
    NsTime::from_ordinal(2025, 100, 12, 0, 0, 0).unwrap()
}

fn template(version: FormatVersion, encoding: EncodingFormat, samples: &[i32]) -> MseedRecord {
    MseedRecord::new(SourceId::from_nslc("IU", "ANMO", "00", "BHZ").unwrap())
        .with_format_version(version)
        .with_record_length(512)
        .with_start_time(start())
        .with_sample_rate(100.0)
        .with_encoding(encoding)
        .with_samples(Samples::Int(samples.to_vec()))
}

const CASES: [(FormatVersion, EncodingFormat, &str); 6] = [
    (FormatVersion::V2, EncodingFormat::Steim1, "v2/steim1"),
    (FormatVersion::V2, EncodingFormat::Steim2, "v2/steim2"),
    (FormatVersion::V2, EncodingFormat::Int32, "v2/int32"),
    (FormatVersion::V3, EncodingFormat::Steim1, "v3/steim1"),
    (FormatVersion::V3, EncodingFormat::Steim2, "v3/steim2"),
    (FormatVersion::V3, EncodingFormat::Int32, "v3/int32"),
];

fn bench_decode(c: &mut Criterion) {
    let samples = seismic_samples(100);
    let unpack = DecodeOptions {
        unpack_data: true,
        ..Default::default()
    };

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(100));
    for (version, encoding, name) in CASES {
        let bytes = encode(&template(version, encoding, &samples)).unwrap();
        group.bench_function(format!("{name}/100samp/header"), |b| {
            b.iter(|| decode(black_box(&bytes)).unwrap())
        });
        group.bench_function(format!("{name}/100samp/unpack"), |b| {
            b.iter(|| decode_with(black_box(&bytes), &unpack).unwrap())
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let samples = seismic_samples(100);

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(100));
    for (version, encoding, name) in CASES {
        let record = template(version, encoding, &samples);
        group.bench_function(format!("{name}/100samp"), |b| {
            b.iter(|| encode(black_box(&record)).unwrap())
        });
    }
    group.finish();
}

fn bench_reader(c: &mut Criterion) {
    let samples = seismic_samples(100);

    // Stream of 10 records alternating v2 and v3
    let mut stream = Vec::new();
    for i in 0..10 {
        let version = if i % 2 == 0 {
            FormatVersion::V2
        } else {
            FormatVersion::V3
        };
        let record = template(version, EncodingFormat::Steim2, &samples);
        stream.extend_from_slice(&encode(&record).unwrap());
    }

    c.bench_function("reader/mixed_10rec", |b| {
        b.iter(|| {
            let records: Vec<_> = MseedReader::new(black_box(stream.as_slice()))
                .records()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            assert_eq!(records.len(), 10);
        })
    });
}

fn bench_tracelist(c: &mut Criterion) {
    let samples = seismic_samples(10_000);
    let options = PackOptions {
        record_length: 512,
        encoding: EncodingFormat::Steim2,
        ..Default::default()
    };

    let mut list = TraceList::new();
    list.add_data(
        SourceId::from_nslc("IU", "ANMO", "00", "BHZ").unwrap(),
        Samples::Int(samples),
        100.0,
        start(),
    )
    .unwrap();
    let mut stream = Vec::new();
    list.pack(
        |bytes| {
            stream.extend_from_slice(bytes);
            Ok(())
        },
        &options,
    )
    .unwrap();

    let mut group = c.benchmark_group("tracelist");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("assemble/10000samp", |b| {
        b.iter(|| {
            let mut list = TraceList::new();
            list.add_reader(MseedReader::new(black_box(stream.as_slice())))
                .unwrap();
            list
        })
    });

    let mut assembled = TraceList::new();
    assembled
        .add_reader(MseedReader::new(stream.as_slice()))
        .unwrap();
    let maintain = PackOptions {
        maintain: true,
        ..options
    };
    group.bench_function("pack/steim2/10000samp", |b| {
        b.iter(|| {
            let mut bytes = 0;
            assembled
                .pack(
                    |record| {
                        bytes += record.len();
                        Ok(())
                    },
                    &maintain,
                )
                .unwrap();
            bytes
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_encode,
    bench_reader,
    bench_tracelist
);
criterion_main!(benches);
