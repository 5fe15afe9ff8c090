//! Background trace writer.
//!
//! `TraceSink` owns one thread that drains a bounded channel into a writer
//! callback. `record()` never blocks the control thread: when the channel is
//! full the point is dropped and counted. Dropping the sink closes the channel
//! and joins the thread.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::simulate::TracePoint;

pub struct TraceSink {
    tx: Option<xch::Sender<TracePoint>>,
    dropped: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TraceSink {
    /// Spawn the writer thread. `write` is called for every received point;
    /// the first error stops further writes (the channel is still drained).
    pub fn spawn<W>(capacity: usize, mut write: W) -> Self
    where
        W: FnMut(&TracePoint) -> std::io::Result<()> + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<TracePoint>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        let join_handle = std::thread::spawn(move || {
            let mut failed = false;
            // Ends once every sender is gone.
            for point in rx.iter() {
                if failed {
                    continue;
                }
                if let Err(e) = write(&point) {
                    tracing::warn!(error = %e, "trace write failed; discarding further points");
                    failed = true;
                }
            }
            tracing::trace!("trace writer exiting cleanly");
        });

        Self {
            tx: Some(tx),
            dropped,
            join_handle: Some(join_handle),
        }
    }

    /// Queue a point without blocking.
    pub fn record(&self, point: TracePoint) {
        let Some(tx) = &self.tx else { return };
        if let Err(xch::TrySendError::Full(_) | xch::TrySendError::Disconnected(_)) =
            tx.try_send(point)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Points discarded because the writer could not keep up.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the channel and wait for the writer to drain it.
    pub fn finish(mut self) -> u64 {
        self.shutdown();
        self.dropped()
    }

    fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("trace writer joined"),
                Err(e) => tracing::warn!(?e, "trace writer panicked during shutdown"),
            }
        }
    }
}

impl Drop for TraceSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
