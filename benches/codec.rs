use criterion::{black_box, criterion_group, criterion_main, Criterion};
use checkers_link::core::{decode, encode_turn, frame_len, MoveAccumulator, TurnMachine};
use checkers_link::types::{ControlFlag, Move, MAX_MOVES_PER_TURN};

fn jump_chain(len: usize) -> Vec<Move> {
    (0..len)
        .map(|i| {
            let i = i as i8;
            Move::new(i, i, i + 1, i + 1).unwrap()
        })
        .collect()
}

fn bench_encode_turn(c: &mut Criterion) {
    let moves = jump_chain(4);

    c.bench_function("encode_turn_4_moves", |b| {
        b.iter(|| encode_turn(black_box(&moves), ControlFlag::EndTurn, Some("haha")))
    });
}

fn bench_decode_turn(c: &mut Criterion) {
    let payload = encode_turn(&jump_chain(MAX_MOVES_PER_TURN), ControlFlag::EndTurn, Some("gg"));

    c.bench_function("decode_full_turn", |b| {
        b.iter(|| decode(black_box(&payload)).unwrap())
    });
}

fn bench_frame_stream(c: &mut Criterion) {
    let mut stream = Vec::new();
    for _ in 0..8 {
        stream.extend(encode_turn(&jump_chain(3), ControlFlag::EndTurn, None));
    }

    c.bench_function("frame_8_units", |b| {
        b.iter(|| {
            let mut rest = black_box(&stream[..]);
            while let Ok(Some(len)) = frame_len(rest) {
                rest = &rest[len..];
            }
        })
    });
}

fn bench_accumulate_turn(c: &mut Criterion) {
    let moves = jump_chain(6);

    c.bench_function("accumulate_and_finish", |b| {
        b.iter(|| {
            let mut acc = MoveAccumulator::new();
            for mv in &moves {
                acc.push(*mv).unwrap();
            }
            acc.finish(None)
        })
    });
}

fn bench_turn_exchange(c: &mut Criterion) {
    let reply = decode(&encode_turn(&jump_chain(2), ControlFlag::EndTurn, None)).unwrap();

    c.bench_function("machine_turn_exchange", |b| {
        b.iter(|| {
            let mut machine = TurnMachine::new();
            machine.send_invitation(None).unwrap();
            machine.send_completed();
            machine.receive(black_box(reply.clone()));
            machine.local_move(Move::new(5, 5, 4, 4).unwrap()).unwrap();
            machine.end_turn(None).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode_turn,
    bench_decode_turn,
    bench_frame_stream,
    bench_accumulate_turn,
    bench_turn_exchange
);
criterion_main!(benches);
