//! Board generation and turn resolution throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use memory_match::game::board;
use memory_match::{ConnectionId, Session, SessionConfig, SessionRng};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("board_generate");
    for pairs in [2usize, 8, 25] {
        group.bench_with_input(BenchmarkId::from_parameter(pairs), &pairs, |b, &pairs| {
            let mut rng = SessionRng::new(7);
            b.iter(|| board::generate(black_box(pairs), &mut rng));
        });
    }
    group.finish();
}

fn bench_full_round(c: &mut Criterion) {
    c.bench_function("clear_board_8_pairs", |b| {
        b.iter(|| {
            let mut session = Session::new(SessionConfig {
                seed: Some(11),
                ..Default::default()
            });
            for n in 1..=2u8 {
                let _ = session.join(ConnectionId::new([n; 16]), &format!("10.0.0.{}", n), "");
            }
            let _ = session.start_game(ConnectionId::new([1; 16]), Some(8), Some(1));

            while !board::is_cleared(session.board()) {
                let Some(actor) = session.roster().iter().find(|p| p.has_turn).map(|p| p.id) else {
                    break;
                };
                let Some(first) = session.board().iter().find(|c| !c.is_matched) else {
                    break;
                };
                let (face, a) = (first.face, first.position);
                let Some(pair) = session
                    .board()
                    .iter()
                    .find(|c| c.face == face && c.position != a)
                    .map(|c| c.position)
                else {
                    break;
                };
                let _ = session.flip(actor, a);
                let _ = session.flip(actor, pair);
                if session.phase() != memory_match::Phase::InProgress {
                    break;
                }
            }
            black_box(session.round_index())
        });
    });
}

criterion_group!(benches, bench_generate, bench_full_round);
criterion_main!(benches);
