//! Buffers retained on one thread and released on another.

use std::thread;

use crossbeam_channel::bounded;
use fastformat_arena::{ArenaConfig, BufferArena};

#[test]
fn last_release_on_worker_frees_exactly_once() {
    let arena = BufferArena::new(ArenaConfig::default()).unwrap();
    let buf = arena.copy_from_slice(&[3u8; 64]).unwrap();
    let addr = buf.as_ptr() as usize;

    let (tx, rx) = bounded(8);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let rx = rx.clone();
            thread::spawn(move || {
                let mut seen = 0;
                while let Ok(view) = rx.recv() {
                    let view: fastformat_arena::BufferRef = view;
                    assert_eq!(view.as_ptr() as usize, addr);
                    assert!(view.as_slice().iter().all(|&b| b == 3));
                    seen += 1;
                }
                seen
            })
        })
        .collect();
    drop(rx);

    for _ in 0..100 {
        tx.send(arena.retain(&buf)).unwrap();
    }
    drop(tx);
    arena.release(buf);

    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(total, 100);

    let stats = arena.stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.total_frees, 1);
}

#[test]
fn concurrent_allocation_respects_limit() {
    let arena = BufferArena::new(ArenaConfig::with_limit(1024)).unwrap();
    let (tx, rx) = bounded(64);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let arena = arena.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for _ in 0..16 {
                    if let Ok(buf) = arena.allocate(64) {
                        tx.send(buf).unwrap();
                    }
                }
            })
        })
        .collect();
    drop(tx);

    let held: Vec<_> = rx.iter().collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(held.len(), 16);
    assert_eq!(arena.stats().live_bytes, 1024);
    assert!(arena.stats().peak_live_bytes <= 1024);
}
