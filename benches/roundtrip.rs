use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::Rng;
use rawpack::{Timestamp, Value};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
struct Event {
    id: u64,
    at: Timestamp,
    kind: String,
    tags: BTreeMap<String, i64>,
    samples: Vec<f64>,
    #[serde(with = "serde_bytes")]
    blob: Vec<u8>,
}

fn events(n: usize) -> Vec<Event> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|i| {
            let tags = (0..8)
                .map(|t| (format!("tag{}", t), rng.gen_range(-100_000..100_000)))
                .collect();
            Event {
                id: i as u64,
                at: Timestamp::new(1_700_000_000 + i as i64, rng.gen_range(0..1_000_000_000)),
                kind: if i % 3 == 0 { "open" } else { "update" }.to_string(),
                tags,
                samples: (0..32).map(|_| rng.gen()).collect(),
                blob: (0..rng.gen_range(0..256)).map(|_| rng.gen()).collect(),
            }
        })
        .collect()
}

fn bench_structs(c: &mut Criterion) {
    let input = events(256);
    let encoded: Vec<Vec<u8>> = input
        .iter()
        .map(|e| rawpack::marshal(e).unwrap())
        .collect();
    let total: usize = encoded.iter().map(|e| e.len()).sum();

    let mut group = c.benchmark_group("struct");
    group.throughput(Throughput::Bytes(total as u64));

    group.bench_function("encode", |b| {
        let mut buf = Vec::with_capacity(total);
        b.iter(|| {
            buf.clear();
            let mut enc = rawpack::Encoder::new(&mut buf);
            for e in input.iter() {
                enc.encode(black_box(e)).unwrap();
            }
        });
    });

    group.bench_function("decode", |b| {
        b.iter(|| {
            for e in encoded.iter() {
                let _: Event = rawpack::unmarshal(black_box(e)).unwrap();
            }
        });
    });

    group.finish();
}

fn bench_ints(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let ints: Vec<i64> = (0..4096)
        .map(|_| rng.gen::<i64>() >> rng.gen_range(0..63u32))
        .collect();
    let encoded = rawpack::marshal(&ints).unwrap();

    let mut group = c.benchmark_group("ints");
    group.throughput(Throughput::Elements(ints.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| rawpack::marshal(black_box(&ints)).unwrap());
    });
    group.bench_function("decode", |b| {
        b.iter(|| rawpack::unmarshal::<Vec<i64>>(black_box(&encoded)).unwrap());
    });
    group.bench_function("decode_value", |b| {
        b.iter(|| rawpack::unmarshal::<Value>(black_box(&encoded)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_structs, bench_ints);
criterion_main!(benches);
