use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::hint::black_box;

use awale::{
    Board, Lobby, LobbyConfig,
    lobby::ConnectionId,
    messages::Command,
};

/// Plays random legal moves from the opening until the game ends.
fn random_playout(rng: &mut StdRng) -> Board {
    let mut board = Board::new();
    for _ in 0..1000 {
        if board.is_game_over() {
            break;
        }
        let legal = board.legal_moves();
        let pit = legal[rng.random_range(0..legal.len())];
        board.apply_move(pit).unwrap();
    }
    board
}

fn bench_legal_moves(c: &mut Criterion) {
    let board = Board::new();
    c.bench_function("legal_moves_opening", |b| {
        b.iter(|| black_box(&board).legal_moves());
    });
}

fn bench_apply_move(c: &mut Criterion) {
    c.bench_function("apply_move_opening", |b| {
        b.iter(|| {
            let mut board = Board::new();
            board.apply_move(black_box(2)).unwrap()
        });
    });
}

fn bench_render(c: &mut Criterion) {
    let board = random_playout(&mut StdRng::seed_from_u64(7));
    c.bench_function("render", |b| {
        b.iter(|| black_box(&board).render());
    });
}

fn bench_random_playouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_playouts");
    for games in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(games), &games, |b, &games| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                for _ in 0..games {
                    black_box(random_playout(&mut rng));
                }
            });
        });
    }
    group.finish();
}

/// Registers `n` users and has every one of them chat once.
fn bench_lobby_chat(c: &mut Criterion) {
    let mut group = c.benchmark_group("lobby_chat");
    for users in [2, 32, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, &users| {
            let mut lobby = Lobby::with_seed(LobbyConfig::default(), 1);
            for i in 0..users {
                lobby.register(ConnectionId(i), &format!("user{i}")).unwrap();
            }
            lobby.drain_outbox();
            b.iter(|| {
                for i in 0..users {
                    lobby
                        .handle_command(ConnectionId(i), Command::Chat("hello".to_string()))
                        .unwrap();
                }
                black_box(lobby.drain_outbox())
            });
        });
    }
    group.finish();
}

criterion_group!(
    engine,
    bench_legal_moves,
    bench_apply_move,
    bench_render,
    bench_random_playouts
);

criterion_group!(lobby, bench_lobby_chat);

criterion_main!(engine, lobby);
