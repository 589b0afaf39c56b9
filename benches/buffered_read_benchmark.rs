use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fs_remote_io::{open_read_binary, open_read_text, Context, MemoryBackend};
use rand::prelude::*;
use std::io::Read;

const OBJECT_SIZE: usize = 1048576;

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn memory_context() -> Context {
    let backend = MemoryBackend::new();
    backend
        .insert("bench/random", generate_random_data(OBJECT_SIZE))
        .expect("failed to seed memory backend");
    let lines: String = (0..OBJECT_SIZE / 16)
        .map(|i| format!("line {:>9}\n", i))
        .collect();
    backend
        .insert("bench/lines", lines)
        .expect("failed to seed memory backend");
    Context::default().with_backend("mem", backend)
}

fn binary_read_by_buffer_size(c: &mut Criterion) {
    let ctx = memory_context();
    let inputs = [
        ("read_binary_small_blocks", 512),
        ("read_binary_default_blocks", 8192),
        ("read_binary_large_blocks", 262144),
    ];

    for (name, buffer_size) in inputs.iter() {
        let mut group = c.benchmark_group(name.to_string());
        group.measurement_time(std::time::Duration::from_secs(5));

        group.bench_function("drain", |b| {
            b.iter(|| {
                let mut reader =
                    open_read_binary(&ctx, "mem://bench/random", *buffer_size)
                        .expect("open_read_binary returned an error");
                let mut content = Vec::with_capacity(OBJECT_SIZE);
                reader
                    .read_to_end(&mut content)
                    .expect("read_to_end returned an error");
                black_box(content)
            });
        });

        group.finish();
    }
}

fn text_line_iteration(c: &mut Criterion) {
    let ctx = memory_context();
    let mut group = c.benchmark_group("read_text_lines");
    group.measurement_time(std::time::Duration::from_secs(5));

    group.bench_function("lines", |b| {
        b.iter(|| {
            let mut reader = open_read_text(&ctx, "mem://bench/lines", 8192)
                .expect("open_read_text returned an error");
            let count = reader
                .lines()
                .filter_map(Result::ok)
                .count();
            black_box(count)
        });
    });

    group.finish();
}

criterion_group!(benches, binary_read_by_buffer_size, text_line_iteration);
criterion_main!(benches);
