use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tictactoe_engine::rules::Cooldowns;
use tictactoe_engine::{evaluate, generate_moves, Board, CounterTable, Engine, Rules, SearchConfig, Symbol, Variation};

#[derive(Clone, Copy)]
struct SearchCase {
    name: &'static str,
    win_length: usize,
    rows: &'static [&'static str],
    mover: Symbol,
    opponents: &'static [Symbol],
}

const CASES: &[SearchCase] = &[
    SearchCase {
        name: "opening_6x6",
        win_length: 4,
        rows: &["......", "......", "..X...", "...O..", "......", "......"],
        mover: Symbol::X,
        opponents: &[Symbol::O],
    },
    SearchCase {
        name: "midgame_6x6",
        win_length: 4,
        rows: &["X..O..", ".XO...", "..XO..", ".O....", "....X.", "O....."],
        mover: Symbol::X,
        opponents: &[Symbol::O],
    },
    SearchCase {
        name: "three_players_7x7",
        win_length: 4,
        rows: &[".......", ".X..O..", "..D....", "...X...", "..O.D..", ".......", "......."],
        mover: Symbol::O,
        opponents: &[Symbol::X, Symbol::D],
    },
];

fn config(case: &SearchCase, variation: Variation, depth: u32) -> SearchConfig {
    let board = Board::from_rows(case.win_length, case.rows).expect("benchmark board should parse");
    let rules = Rules::new(variation, Cooldowns::default());
    let counters = CounterTable::fresh(&rules.cooldowns);
    SearchConfig::new(board, case.mover, case.opponents.to_vec(), counters, rules, depth)
        .expect("benchmark config should be valid")
}

fn bench_search(c: &mut Criterion) {
    let depth = std::env::var("TICTACTOE_BENCH_DEPTH")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(3)
        .max(1);

    let mut group = c.benchmark_group("search");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(4));
    group.sample_size(10);

    for case in CASES {
        for (label, variation) in [("mark", Variation::MarkOnly), ("full", Variation::Full)] {
            let cfg = config(case, variation, depth);
            group.bench_with_input(
                BenchmarkId::new(case.name, format!("{label}_d{depth}")),
                &cfg,
                |b, cfg| b.iter(|| black_box(Engine::new().search_depth(cfg, depth))),
            );
        }
    }
    group.finish();
}

fn bench_leaf_ops(c: &mut Criterion) {
    let case = &CASES[1];
    let cfg = config(case, Variation::Full, 1);
    let rules = Rules::default();
    let counters = CounterTable::fresh(&rules.cooldowns);

    c.bench_function("evaluate_midgame_6x6", |b| {
        b.iter(|| black_box(evaluate(black_box(cfg.board()), case.mover, case.opponents)))
    });
    c.bench_function("generate_moves_midgame_6x6", |b| {
        b.iter(|| {
            black_box(generate_moves(
                black_box(cfg.board()),
                &rules,
                case.mover,
                case.opponents,
                &counters.get(case.mover),
            ))
        })
    });
}

criterion_group!(benches, bench_search, bench_leaf_ops);
criterion_main!(benches);
