//! Background tick scheduling for the transport
//!
//! Commands and ticks must never interleave, so the transport lives behind a
//! mutex shared between the host and a [`Ticker`] thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::engine::clock::Clock;
use crate::engine::sink::AudioSink;
use crate::engine::transport::Transport;

/// Transport handle shared between the host and the ticker thread
#[derive(Debug)]
pub struct SharedTransport<S: AudioSink, C: Clock> {
    inner: Arc<Mutex<Transport<S, C>>>,
}

impl<S: AudioSink, C: Clock> Clone for SharedTransport<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AudioSink, C: Clock> SharedTransport<S, C> {
    pub fn new(transport: Transport<S, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Exclusive access for issuing commands
    pub fn lock(&self) -> MutexGuard<'_, Transport<S, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the lock held
    pub fn with<R>(&self, f: impl FnOnce(&mut Transport<S, C>) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Periodic driver calling [`Transport::tick`] on a background thread
///
/// Each computed position is handed to the observer (a playhead display, for
/// example). Stopping is synchronous: once [`Ticker::stop`] returns the
/// observer will not be called again. Dropping the ticker stops it.
#[derive(Debug)]
pub struct Ticker {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start ticking `transport` every `interval`
    pub fn spawn<S, C, F>(
        transport: SharedTransport<S, C>,
        interval: Duration,
        mut observer: F,
    ) -> Self
    where
        S: AudioSink + Send + 'static,
        C: Clock + Send + 'static,
        F: FnMut(f64) + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            debug!("[TICKER] Started, interval {:?}", interval);
            while !flag.load(Ordering::Acquire) {
                let position = transport.with(|t| t.tick());
                observer(position);
                thread::park_timeout(interval);
            }
            debug!("[TICKER] Stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("[TICKER] Observer panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::SampleBuffer;
    use crate::engine::clock::ManualClock;
    use crate::engine::sink::RecordingSink;
    use std::sync::mpsc;

    fn shared_loop() -> (SharedTransport<RecordingSink, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut transport = Transport::new(RecordingSink::new(), clock.clone());
        let buffer = Arc::new(SampleBuffer::allocate(1, 400, 100).unwrap());
        transport.load_loop(buffer);
        (SharedTransport::new(transport), clock)
    }

    #[test]
    fn test_shared_transport_clones_share_state() {
        let (shared, _) = shared_loop();
        let other = shared.clone();
        shared.with(|t| t.seek(2.0));
        assert_eq!(other.lock().position(), 2.0);
    }

    #[test]
    fn test_ticker_reports_positions() {
        let (shared, clock) = shared_loop();
        shared.with(|t| t.play());
        clock.advance(1.5);

        let (tx, rx) = mpsc::channel();
        let mut ticker = Ticker::spawn(shared.clone(), Duration::from_millis(1), move |p| {
            let _ = tx.send(p);
        });

        let position = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!((position - 1.5).abs() < 1e-9);

        ticker.stop();
        assert!(!ticker.is_running());
        assert!((shared.lock().position() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_callbacks_after_stop() {
        let (shared, _) = shared_loop();
        let (tx, rx) = mpsc::channel();
        let mut ticker = Ticker::spawn(shared, Duration::from_millis(1), move |p| {
            let _ = tx.send(p);
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        ticker.stop();

        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_stops_thread() {
        let (shared, _) = shared_loop();
        let (tx, rx) = mpsc::channel::<f64>();
        {
            let _ticker = Ticker::spawn(shared, Duration::from_millis(1), move |p| {
                let _ = tx.send(p);
            });
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        while rx.try_recv().is_ok() {}
        // Sender was moved into the thread; it is gone once the thread exits
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }
}
