use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use sportshub_events::{EventBus, Subscription};

/// How often an idle worker checks its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Message counts of one worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub handled: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    handled: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            handled: self.handled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Running background consumer. Dropping the handle detaches the thread.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Stop the worker, wait for it, and return its final counts.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!(worker = self.name, "worker thread panicked");
            }
        }
        self.counters.snapshot()
    }
}

/// Thread that feeds every bus message to a handler.
///
/// The subscription is taken before `spawn` returns, so nothing published
/// afterwards is missed. Handler errors are counted and logged; the loop keeps
/// going, which requires the handler to tolerate repeated or skipped input.
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    pub fn spawn<M, B, H, E>(name: &'static str, bus: &B, handler: H) -> io::Result<WorkerHandle>
    where
        M: Send + 'static,
        B: EventBus<M> + ?Sized,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let subscription = bus.subscribe();
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let join = {
            let stop = stop.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run(name, subscription, &stop, &counters, handler))?
        };

        Ok(WorkerHandle {
            name,
            stop,
            counters,
            join: Some(join),
        })
    }
}

fn run<M, H, E>(
    name: &'static str,
    subscription: Subscription<M>,
    stop: &AtomicBool,
    counters: &Counters,
    mut handler: H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    debug!(worker = name, "worker started");

    while !stop.load(Ordering::Acquire) {
        let message = match subscription.recv_timeout(POLL_INTERVAL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match handler(message) {
            Ok(()) => {
                counters.handled.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = name, error = ?err, "worker handler failed");
            }
        }
    }

    let stats = counters.snapshot();
    debug!(worker = name, handled = stats.handled, failed = stats.failed, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    use sportshub_events::InMemoryEventBus;

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn counts_handled_and_failed_messages() {
        let bus = InMemoryEventBus::<i64>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let seen = seen.clone();
            ProjectionWorker::spawn("test-worker", &bus, move |delta: i64| {
                if delta == 0 {
                    return Err("zero delta");
                }
                seen.lock().map_err(|_| "poisoned")?.push(delta);
                Ok(())
            })
            .unwrap()
        };

        for delta in [-3, 0, 5] {
            bus.publish(delta).unwrap();
        }
        wait_for(|| handle.stats().handled + handle.stats().failed == 3);

        assert_eq!(handle.name(), "test-worker");
        let stats = handle.shutdown();
        assert_eq!(stats, WorkerStats { handled: 2, failed: 1 });
        assert_eq!(*seen.lock().unwrap(), vec![-3, 5]);
    }

    #[test]
    fn stops_when_the_bus_goes_away() {
        let bus = InMemoryEventBus::<i64>::new();
        let handle = ProjectionWorker::spawn("orphan", &bus, |_: i64| Ok::<(), ()>(())).unwrap();
        drop(bus);

        assert_eq!(handle.shutdown(), WorkerStats::default());
    }
}
