use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use motor_core::{QuadratureDecoder, transition_delta};
use motor_traits::Channel;
use rstest::rstest;

const FORWARD: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];

#[test]
fn full_forward_cycle_counts_four() {
    let d = QuadratureDecoder::new(false, false);
    for (a, b) in FORWARD {
        assert_eq!(d.on_edge(a, b), 1);
    }
    assert_eq!(d.read(), 4);
}

#[test]
fn full_reverse_cycle_counts_minus_four() {
    let d = QuadratureDecoder::new(false, false);
    for (a, b) in FORWARD.iter().rev().skip(1).chain(std::iter::once(&(false, false))) {
        d.on_edge(*a, *b);
    }
    assert_eq!(d.read(), -4);
}

#[rstest]
#[case((false, false), (true, true), 2)] // code 12
#[case((true, true), (false, false), 2)] // code 3
#[case((false, true), (true, false), -2)] // code 6
#[case((true, false), (false, true), -2)] // code 9
fn double_flips_count_two(#[case] from: (bool, bool), #[case] to: (bool, bool), #[case] delta: i64) {
    let d = QuadratureDecoder::new(from.0, from.1);
    assert_eq!(d.on_edge(to.0, to.1), delta);
    assert_eq!(d.read(), delta);
}

#[test]
fn repeated_levels_never_move() {
    let d = QuadratureDecoder::new(true, false);
    for _ in 0..10 {
        assert_eq!(d.on_edge(true, false), 0);
    }
    assert_eq!(d.read(), 0);
    assert_eq!(transition_delta(5), 0);
}

#[test]
fn channel_edges_match_sampled_edges() {
    let by_channel = QuadratureDecoder::new(false, false);
    let by_levels = QuadratureDecoder::new(false, false);
    let edges = [
        (Channel::B, true),
        (Channel::A, true),
        (Channel::B, false),
        (Channel::A, false),
        (Channel::A, true),
        (Channel::B, true),
    ];
    let (mut a, mut b) = (false, false);
    for (ch, lvl) in edges {
        match ch {
            Channel::A => a = lvl,
            Channel::B => b = lvl,
        }
        assert_eq!(by_channel.on_channel_edge(ch, lvl), by_levels.on_edge(a, b));
    }
    assert_eq!(by_channel.read(), by_levels.read());
    assert_eq!(by_channel.phase(), by_levels.phase());
}

#[test]
fn concurrent_reader_never_sees_lost_or_torn_counts() {
    const CYCLES: i64 = 20_000;
    let d = Arc::new(QuadratureDecoder::new(false, false));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let d = Arc::clone(&d);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last = 0;
                while !done.load(Ordering::Acquire) {
                    let now = d.read();
                    assert!(now >= last, "position went backwards: {last} -> {now}");
                    assert!(now <= CYCLES * 4);
                    last = now;
                }
            })
        })
        .collect();

    let writer = {
        let d = Arc::clone(&d);
        thread::spawn(move || {
            for _ in 0..CYCLES {
                d.on_channel_edge(Channel::B, true);
                d.on_channel_edge(Channel::A, true);
                d.on_channel_edge(Channel::B, false);
                d.on_channel_edge(Channel::A, false);
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(d.read(), CYCLES * 4);
}

#[test]
fn concurrent_writes_and_edges_keep_phase_consistent() {
    // A position write racing edge handling must never corrupt the phase bits:
    // once both threads finish, a final forward cycle still adds exactly 4.
    let d = Arc::new(QuadratureDecoder::new(false, false));
    let edges = {
        let d = Arc::clone(&d);
        thread::spawn(move || {
            for _ in 0..5_000 {
                d.on_channel_edge(Channel::B, true);
                d.on_channel_edge(Channel::A, true);
                d.on_channel_edge(Channel::B, false);
                d.on_channel_edge(Channel::A, false);
            }
        })
    };
    for i in 0..1_000 {
        d.write(i * 10);
    }
    edges.join().unwrap();
    assert_eq!(d.phase(), 0b00);
    let before = d.read();
    for (a, b) in FORWARD {
        d.on_edge(a, b);
    }
    assert_eq!(d.read(), before + 4);
}
