//! Frame, message body and digest benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recwire_client::RecordRequest;
use recwire_protocol::{
    compute_digest, Decoder, Encoder, Frame, Key, MessageBody, MessageKind, OpKind, ParticleType,
};

fn create_test_body(bins: usize, value_size: usize) -> MessageBody {
    let key = Key::new("test", "bench", "user-12345").unwrap();
    let value = "x".repeat(value_size);
    let mut request = RecordRequest::write(key).ttl(3600);
    for i in 0..bins {
        request = request.put(format!("bin{}", i), value.as_str());
    }
    request.build().unwrap()
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let frame = Frame::new(MessageKind::Message, Bytes::from("x".repeat(size)));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for size in [100, 1000, 10000] {
        let frame = Frame::new(MessageKind::Message, Bytes::from("x".repeat(size)));
        let encoded = frame.encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = encoded.clone();
                black_box(Frame::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_body_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_build");

    for bins in [1, 10, 100] {
        group.throughput(Throughput::Elements(bins as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bins), &bins, |b, &bins| {
            b.iter(|| {
                let mut body = MessageBody::new();
                for i in 0..bins {
                    body.add_operation(
                        OpKind::Write,
                        ParticleType::Integer,
                        "counter",
                        &(i as i64).to_be_bytes(),
                    )
                    .unwrap();
                }
                black_box(body)
            });
        });
    }

    group.finish();
}

fn bench_body_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_walk");

    for bins in [1, 10, 100] {
        let body = create_test_body(bins, 64);

        group.throughput(Throughput::Elements(bins as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bins), &body, |b, body| {
            b.iter(|| {
                let walked = body.operations().filter(|op| op.is_ok()).count();
                black_box(walked)
            });
        });
    }

    group.finish();
}

fn bench_message_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_decode");

    for bins in [1, 10, 100] {
        let encoded = Encoder::encode_message(&create_test_body(bins, 64)).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bins), &encoded, |b, encoded| {
            b.iter(|| {
                let mut decoder = Decoder::new();
                decoder.extend(encoded);
                black_box(decoder.decode_message().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    for size in [8, 100, 1000] {
        let key = vec![0x42u8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &key, |b, key| {
            b.iter(|| black_box(compute_digest(b"bench", ParticleType::Blob.code(), key).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_body_build,
    bench_body_walk,
    bench_message_decode,
    bench_digest,
);

criterion_main!(benches);
