use clausewitz_save::container::{GameFamily, SavegameContainer};
use clausewitz_save::text::{parse, write_to_vec, NodeWriterBuilder, Tokenizer};
use clausewitz_save::Charset;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Builds a save shaped document with the given number of provinces
fn provinces(count: usize) -> Vec<u8> {
    let mut out = Vec::from(&b"date=1444.11.11\nplayer=\"ENG\"\nprovinces={\n"[..]);
    for i in 1..=count {
        let province = format!(
            "\t-{}={{\n\t\tname=\"Province {}\"\n\t\towner=ENG\n\t\tbase_tax=3.000\n\t\tcores={{ ENG FRA }}\n\t\tcolor=rgb {{ 10 20 30 }}\n\t}}\n",
            i, i
        );
        out.extend_from_slice(province.as_bytes());
    }
    out.extend_from_slice(b"}\n");
    out
}

pub fn tokenize_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for count in [10, 100, 1000].iter() {
        let data = provinces(*count);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| Tokenizer::new(black_box(data)).tokenize().unwrap())
        });
    }
    group.finish();
}

pub fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for count in [10, 100, 1000].iter() {
        let data = provinces(*count);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| parse(black_box(data)).unwrap())
        });
    }
    group.finish();
}

pub fn write_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    let options = NodeWriterBuilder::new();
    for count in [10, 100, 1000].iter() {
        let data = provinces(*count);
        let root = parse(&data).unwrap();
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &root, |b, root| {
            b.iter(|| write_to_vec(black_box(root), &options).unwrap())
        });
    }
    group.finish();
}

pub fn decode_benchmark(c: &mut Criterion) {
    let mut data = Vec::from(&b"HOI4txt\n"[..]);
    data.extend_from_slice(&provinces(100));
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("hoi4-plain", |b| {
        b.iter(|| SavegameContainer::decode(black_box(&data), GameFamily::Hoi4).unwrap())
    });
    group.finish();
}

pub fn transcode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcode");
    for size in [16, 128, 512].iter() {
        let ascii = vec![b'a'; *size];
        let high = vec![0xf6; *size];
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("ascii", size), size, |b, &_size| {
            b.iter(|| Charset::Windows1252.transcode(black_box(&ascii)))
        });
        group.bench_with_input(BenchmarkId::new("1252", size), size, |b, &_size| {
            b.iter(|| Charset::Windows1252.transcode(black_box(&high)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    tokenize_benchmark,
    parse_benchmark,
    write_benchmark,
    decode_benchmark,
    transcode_benchmark,
);
criterion_main!(benches);
