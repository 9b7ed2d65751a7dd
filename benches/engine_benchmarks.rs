//! # Micdrop Performance Benchmarks
//!
//! Benchmarks for the hot paths of a running session: forming the song
//! pool and picking the next song. Pool sizes here are far beyond a
//! realistic karaoke night so regressions show up clearly.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench queue
//! cargo bench selection
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use micdrop::algorithm::select_next;
use micdrop::queue::{form_queue, QueueConfig};
use micdrop::rating::{PreferenceIndex, Rating};
use micdrop::rng::SeededRandomness;
use micdrop::session::Session;
use std::hint::black_box;

/// Build a synthetic preference index: every user rates every song, with
/// ratings spread across the scale deterministically.
fn create_benchmark_index(user_count: i64, song_count: i64) -> PreferenceIndex {
    let mut index = PreferenceIndex::new();
    for user_id in 1..=user_count {
        for song_id in 1..=song_count {
            let rating = match (user_id * 7 + song_id) % 5 {
                0 => Rating::DontKnow,
                1 => Rating::SingAlong,
                2 => Rating::SingAlong,
                3 => Rating::CanTakeTheMic,
                _ => Rating::NeedTheMic,
            };
            index.insert(user_id, song_id, rating);
        }
    }
    index
}

fn roster(user_count: i64) -> Vec<i64> {
    (1..=user_count).collect()
}

fn bench_queue_formation(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    for song_count in [100i64, 1000, 5000] {
        let index = create_benchmark_index(8, song_count);
        group.bench_with_input(
            BenchmarkId::new("form_queue", song_count),
            &song_count,
            |b, _| {
                b.iter_batched(
                    || {
                        (
                            Session::new(0, "BNCH".into(), &roster(8)),
                            SeededRandomness::new(42),
                        )
                    },
                    |(mut session, mut rng)| {
                        form_queue(&mut session, &index, &mut rng, &QueueConfig::default());
                        black_box(session.songs.len())
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    for song_count in [100i64, 1000, 5000] {
        let index = create_benchmark_index(8, song_count);
        let mut setup_rng = SeededRandomness::new(42);
        let mut template = Session::new(0, "BNCH".into(), &roster(8));
        form_queue(
            &mut template,
            &index,
            &mut setup_rng,
            &QueueConfig::undamped(),
        );

        group.bench_with_input(
            BenchmarkId::new("select_next", song_count),
            &song_count,
            |b, _| {
                b.iter_batched(
                    || (template.clone(), SeededRandomness::new(7)),
                    |(mut session, mut rng)| {
                        let picked = select_next(&mut session, &index, &mut rng)
                            .expect("selection never fails on a fresh pool");
                        black_box(picked)
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_session_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");
    // Draining replays a full night: pick, sing, score, repeat.
    group.sample_size(20);

    let index = create_benchmark_index(8, 200);
    let mut setup_rng = SeededRandomness::new(42);
    let mut template = Session::new(0, "BNCH".into(), &roster(8));
    form_queue(
        &mut template,
        &index,
        &mut setup_rng,
        &QueueConfig::undamped(),
    );

    group.bench_function("full_session", |b| {
        b.iter_batched(
            || (template.clone(), SeededRandomness::new(7)),
            |(mut session, mut rng)| {
                let mut played = 0usize;
                while let Some(_song_id) = select_next(&mut session, &index, &mut rng)
                    .expect("selection never fails while draining")
                {
                    session.mark_current_played(&index);
                    played += 1;
                }
                black_box(played)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_queue_formation,
    bench_selection,
    bench_session_drain
);
criterion_main!(benches);
