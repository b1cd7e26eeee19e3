//! Criterion micro-benchmarks for buffer allocation and reference counting.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use fastformat_arena::BufferArena;
use fastformat_bench::Resolution;
use fastformat_core::ColorSpace;

/// Benchmark: allocate and free one zeroed Full HD BGR8 frame.
fn bench_allocate_fhd(c: &mut Criterion) {
    let arena = BufferArena::default();
    let len = Resolution::FullHd.frame_len(ColorSpace::Bgr8);
    c.bench_function("arena_allocate_fhd", |b| {
        b.iter(|| {
            let buf = arena.allocate(len).unwrap();
            black_box(buf.as_ptr());
        });
    });
}

/// Benchmark: adopt a Vec without copying.
fn bench_adopt_vec(c: &mut Criterion) {
    let arena = BufferArena::default();
    c.bench_function("arena_adopt_vec", |b| {
        b.iter_batched(
            || vec![0u8; 4096],
            |data| black_box(arena.adopt_vec(data)),
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark: retain and release a shared buffer.
fn bench_retain_release(c: &mut Criterion) {
    let arena = BufferArena::default();
    let buf = arena.allocate(64).unwrap();
    c.bench_function("arena_retain_release", |b| {
        b.iter(|| {
            let view = arena.retain(&buf);
            black_box(view.ref_count());
            arena.release(view);
        });
    });
}

criterion_group!(benches, bench_allocate_fhd, bench_adopt_vec, bench_retain_release);
criterion_main!(benches);
