//! Benchmarks for move generation and search.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use chess_bot::board::Board;
use chess_bot::engine::{search_fixed_depth, Difficulty};
use chess_bot::piece::Color;

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");
    let mut board = Board::new();

    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| board.perft(black_box(depth)))
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let counts = HashMap::new();
    for difficulty in [Difficulty::Medium, Difficulty::Hard] {
        let mut board = Board::new();
        let Some(profile) = difficulty.profile(board.non_king_piece_count()) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("startpos_depth3", difficulty), &profile, |b, profile| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| search_fixed_depth(&mut board, Color::White, black_box(3), profile, &counts, &mut rng))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_perft, bench_search);
criterion_main!(benches);
