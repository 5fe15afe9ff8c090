use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use motor_core::{TracePoint, TraceSink};

fn point(t: f64) -> TracePoint {
    TracePoint {
        t_s: t,
        setpoint: 1.0,
        feedback: 0.5,
        output: 0.1,
    }
}

#[test]
fn records_are_written_in_order() {
    let out = Arc::new(Mutex::new(Vec::new()));
    let sink_out = Arc::clone(&out);
    let sink = TraceSink::spawn(64, move |p| {
        sink_out.lock().unwrap().push(p.t_s);
        Ok(())
    });
    for i in 0..10 {
        sink.record(point(f64::from(i)));
    }
    assert_eq!(sink.finish(), 0);
    let got = out.lock().unwrap().clone();
    assert_eq!(got, (0..10).map(f64::from).collect::<Vec<_>>());
}

#[test]
fn full_channel_drops_instead_of_blocking() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let written = Arc::new(Mutex::new(0usize));
    let w = Arc::clone(&written);
    let mut first = true;
    let sink = TraceSink::spawn(1, move |_| {
        if first {
            first = false;
            entered_tx.send(()).unwrap();
            go_rx.recv().unwrap();
        }
        *w.lock().unwrap() += 1;
        Ok(())
    });

    sink.record(point(0.0));
    // writer is now parked inside the first write with an empty channel
    entered_rx.recv().unwrap();
    sink.record(point(1.0)); // fills the single slot
    sink.record(point(2.0)); // dropped
    sink.record(point(3.0)); // dropped
    assert_eq!(sink.dropped(), 2);

    go_tx.send(()).unwrap();
    assert_eq!(sink.finish(), 2);
    assert_eq!(*written.lock().unwrap(), 2);
}

#[test]
fn write_error_stops_writing_but_not_recording() {
    let calls = Arc::new(Mutex::new(0usize));
    let c = Arc::clone(&calls);
    let sink = TraceSink::spawn(16, move |_| {
        *c.lock().unwrap() += 1;
        Err(std::io::Error::other("disk full"))
    });
    for i in 0..5 {
        sink.record(point(f64::from(i)));
    }
    drop(sink);
    assert_eq!(*calls.lock().unwrap(), 1);
}
