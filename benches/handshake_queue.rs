// CLASSIFICATION: COMMUNITY
// Filename: handshake_queue.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use doomctl::ipc::{loopback_pair, HandshakeChannel, Message, MessageCode, MessageQueue};
use tempfile::tempdir;

fn bench_queue_round_trip(c: &mut Criterion) {
    let dir = tempdir().expect("tempdir");
    let queue = MessageQueue::create(dir.path(), "doomctl-bench-q").expect("queue");
    let tic = Message::signal(MessageCode::Tic);
    let command = Message::command("map map01").expect("command");
    c.bench_function("shm_queue_signal", |b| {
        b.iter(|| {
            queue.try_send(&tic).expect("send");
            queue.try_receive().expect("receive")
        });
    });
    c.bench_function("shm_queue_command", |b| {
        b.iter(|| {
            queue.try_send(&command).expect("send");
            queue.try_receive().expect("receive")
        });
    });
}

fn bench_loopback_round_trip(c: &mut Criterion) {
    let (mut ctrl, mut engine) = loopback_pair(Duration::from_millis(100));
    let tic = Message::signal(MessageCode::Tic);
    let done = Message::signal(MessageCode::DoomTic);
    c.bench_function("loopback_tic_cycle", |b| {
        b.iter(|| {
            ctrl.send(&tic).expect("send");
            engine.try_receive().expect("receive");
            engine.send(&done).expect("reply");
            ctrl.try_receive().expect("ack")
        });
    });
}

criterion_group!(benches, bench_queue_round_trip, bench_loopback_round_trip);
criterion_main!(benches);
