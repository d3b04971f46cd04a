//! Periodic driver for timed capture sessions.
//!
//! The ticker thread wakes once per period, takes the sequencer lock and
//! runs one tick. A stop request wakes it immediately. When a tick overruns
//! its period the missed deadlines are skipped instead of queued.

use crate::sequencer::{Core, lock};
use crate::session::{SequencerState, TickOutcome};
use std::sync::mpsc::{self, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub(crate) struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub(crate) fn spawn(shared: Arc<Mutex<Core>>, period: Duration) -> std::io::Result<Self> {
        let (stop, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("sweep-ticker".to_string())
            .spawn(move || tick_loop(&shared, &stop_rx, period))?;
        Ok(Self { stop, handle })
    }

    /// Wait for the session to end on its own.
    pub(crate) fn join(self) {
        let Ticker { stop, handle } = self;
        if handle.join().is_err() {
            error!("Ticker thread panicked");
        }
        drop(stop);
    }

    /// Wake the thread, ask it to exit and wait for it.
    pub(crate) fn cancel(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            error!("Ticker thread panicked");
        }
    }
}

/// Sleep until `deadline`. Returns false when a stop was requested.
fn wait_until(stop: &mpsc::Receiver<()>, deadline: Instant) -> bool {
    let now = Instant::now();
    if deadline <= now {
        return matches!(stop.try_recv(), Err(TryRecvError::Empty));
    }
    matches!(stop.recv_timeout(deadline - now), Err(RecvTimeoutError::Timeout))
}

fn tick_loop(shared: &Mutex<Core>, stop: &mpsc::Receiver<()>, period: Duration) {
    let mut deadline = Instant::now() + period;
    loop {
        if !wait_until(stop, deadline) {
            debug!("Ticker stopped on request");
            break;
        }

        {
            let mut core = lock(shared);
            if core.state() != SequencerState::Capturing {
                break;
            }
            match core.tick() {
                Ok(TickOutcome::Captured { .. }) => {}
                Ok(_) => break,
                Err(e) => {
                    error!("Capture session aborted: {}", e);
                    core.record_error(e);
                    break;
                }
            }
        }

        deadline = next_deadline(deadline, Instant::now(), period);
    }
}

/// The first deadline after `now` on the grid `deadline + k * period`.
///
/// Deadlines missed while a tick overran are dropped, never replayed.
fn next_deadline(deadline: Instant, now: Instant, period: Duration) -> Instant {
    let next = deadline + period;
    if next > now {
        return next;
    }
    let behind = now - next;
    let skipped = (behind.as_nanos() / period.as_nanos()) as u32 + 1;
    debug!("Tick overran its period, skipping {} tick(s)", skipped);
    next + period * skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(40);

    #[test]
    fn test_on_time_tick_keeps_grid() {
        let start = Instant::now();
        let now = start + Duration::from_millis(10);
        assert_eq!(next_deadline(start, now, PERIOD), start + PERIOD);
    }

    #[test]
    fn test_overrun_skips_missed_deadlines() {
        let start = Instant::now();
        // A tick that ran for five periods lands on the next grid slot after it.
        let now = start + Duration::from_millis(210);
        assert_eq!(next_deadline(start, now, PERIOD), start + PERIOD * 6);

        let now = start + PERIOD;
        assert_eq!(next_deadline(start, now, PERIOD), start + PERIOD * 2);
    }

    #[test]
    fn test_next_deadline_is_always_ahead() {
        let start = Instant::now();
        for ms in [0, 39, 40, 41, 79, 80, 1_000, 12_345] {
            let now = start + Duration::from_millis(ms);
            let next = next_deadline(start, now, PERIOD);
            assert!(next > now);
            assert!(next - now <= PERIOD);
        }
    }
}
