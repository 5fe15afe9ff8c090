use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use motor_hardware::sim::{SimCfg, pair_with_clock};
use motor_traits::clock::test_clock::TestClock;
use motor_traits::{Channel, PwmOutput, QuadratureInput};
use rstest::rstest;

fn counting_pair(clock: &TestClock) -> (motor_hardware::SimulatedEncoder, motor_hardware::SimulatedPwm, Arc<AtomicI64>) {
    let (mut enc, pwm) = pair_with_clock(SimCfg::default(), Arc::new(clock.clone()));
    let net = Arc::new(AtomicI64::new(0));
    let sink = Arc::clone(&net);
    // Track the last (A, B) seen to reconstruct direction like a decoder would.
    let last = Arc::new(std::sync::Mutex::new((false, false)));
    enc.subscribe(Box::new(move |ch, level| {
        let mut l = last.lock().unwrap();
        let prev = *l;
        match ch {
            Channel::A => l.0 = level,
            Channel::B => l.1 = level,
        }
        let fwd = matches!(
            (prev, *l),
            ((false, false), (false, true))
                | ((false, true), (true, true))
                | ((true, true), (true, false))
                | ((true, false), (false, false))
        );
        sink.fetch_add(if fwd { 1 } else { -1 }, Ordering::Relaxed);
    }))
    .unwrap();
    (enc, pwm, net)
}

#[rstest]
#[case(80.0, 100)] // full forward: 2000us at 400Hz, clamped
#[case(40.0, -100)] // full reverse: 1000us at 400Hz, clamped
#[case(60.0, 0)] // neutral
fn duty_drives_direction(#[case] duty: f64, #[case] expected: i64) {
    let clock = TestClock::new();
    let (enc, mut pwm, net) = counting_pair(&clock);
    pwm.start(0.0).unwrap();
    pwm.set_duty_cycle(duty).unwrap();
    clock.advance(Duration::from_millis(50));
    enc.sync();
    assert_eq!(enc.true_position(), expected);
    assert_eq!(net.load(Ordering::Relaxed), expected);
}

#[test]
fn out_of_range_duty_is_rejected() {
    let clock = TestClock::new();
    let (_enc, mut pwm, _net) = counting_pair(&clock);
    let err = pwm.set_duty_cycle(120.0).expect_err("duty > 100 must fail");
    assert!(err.to_string().contains("outside"));
}

#[test]
fn stop_halts_the_plant() {
    let clock = TestClock::new();
    let (enc, mut pwm, _net) = counting_pair(&clock);
    pwm.start(80.0).unwrap();
    clock.advance(Duration::from_millis(10));
    pwm.set_duty_cycle(0.0).unwrap();
    let at_stop = enc.true_position();
    clock.advance(Duration::from_secs(1));
    enc.sync();
    assert_eq!(enc.true_position(), at_stop);
    assert_eq!(at_stop, 20);
}
