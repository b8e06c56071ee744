// Performance benchmarks for note-interval maths
//
// Run with: cargo bench --bench overlap_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ostinato_core::domain::clip::{spans_overlap, MidiClip, MidiNote, TimeSignature};
use ostinato_core::domain::ids::ClipId;
use std::hint::black_box;

fn bench_spans_overlap(c: &mut Criterion) {
    c.bench_function("spans_overlap", |b| {
        b.iter(|| {
            black_box(spans_overlap(
                black_box(0.0),
                black_box(1.0),
                black_box(0.5),
                black_box(1.0),
            ));
        });
    });
}

fn clip_with_notes(count: usize) -> MidiClip {
    let duration = count as f64 + 1.0;
    let mut clip = MidiClip::new(
        ClipId::new(),
        TimeSignature::new(4, 4).unwrap(),
        0.0,
        duration,
    )
    .unwrap();
    for i in 0..count {
        clip.add_note(MidiNote::new(60, 100, i as f64, 0.5).unwrap())
            .unwrap();
    }
    clip
}

fn bench_note_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("note_scan");

    for count in [8, 64, 256, 1024].iter() {
        let clip = clip_with_notes(*count);
        // Candidate span in the gap after the last note
        let start = *count as f64 - 0.25;

        group.bench_with_input(BenchmarkId::new("fits", count), count, |b, _| {
            b.iter(|| {
                let fits = !clip
                    .notes()
                    .iter()
                    .any(|n| spans_overlap(n.start_time(), n.duration(), black_box(start), 0.2));
                black_box(fits);
            });
        });
    }

    group.finish();
}

fn bench_add_note_rejection(c: &mut Criterion) {
    let clip = clip_with_notes(256);
    let colliding = MidiNote::new(60, 100, 128.0, 0.5).unwrap();

    c.bench_function("add_note_overlap_rejected_256_notes", |b| {
        b.iter(|| {
            let mut clip = clip.clone();
            black_box(clip.add_note(black_box(colliding)).is_err());
        });
    });
}

criterion_group!(
    benches,
    bench_spans_overlap,
    bench_note_scan,
    bench_add_note_rejection
);

criterion_main!(benches);
