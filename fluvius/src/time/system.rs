use super::timer::TimerEntry;
use super::{Clock, TimerHandle, TimerTask};

use parking_lot::Mutex;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Commands sent to the timer thread.
enum Command {
    SetTimer {
        deadline: Duration,
        sequence: u64,
        task: TimerTask,
        handle: TimerHandle,
    },
    Shutdown,
}

/// Wall-clock timer service.
///
/// `SystemClock` owns a dedicated thread that keeps pending timers in a
/// min-heap and sleeps until the earliest deadline or the next command.
/// Callbacks run on that thread, so they should hand heavy work to a
/// scheduler.
///
/// Dropping the clock stops the thread; timers still pending are
/// discarded.
pub struct SystemClock {
    origin: Instant,
    transmitter: Sender<Command>,
    sequence: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SystemClock {
    /// Starts the timer thread.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let clock = SystemClock::start();
    /// clock.schedule(Duration::from_millis(10), Box::new(|| println!("tick")));
    /// ```
    pub fn start() -> Arc<Self> {
        let origin = Instant::now();
        let (transmitter, receiver) = channel();

        let thread = thread::Builder::new()
            .name("fluvius-timer".to_owned())
            .spawn(move || TimerThread::new(origin, receiver).run())
            .map_err(|error| tracing::error!(%error, "failed to spawn timer thread"))
            .ok();

        Arc::new(Self {
            origin,
            transmitter,
            sequence: AtomicU64::new(0),
            thread: Mutex::new(thread),
        })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_with(&self, delay: Duration, handle: TimerHandle, task: TimerTask) {
        let command = Command::SetTimer {
            deadline: self.now().saturating_add(delay),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            task,
            handle,
        };

        if self.transmitter.send(command).is_err() {
            tracing::warn!("timer thread is gone; dropping timer");
        }
    }
}

impl Drop for SystemClock {
    /// Stops the timer thread and waits for it, unless the clock is dropped
    /// from a timer callback.
    fn drop(&mut self) {
        let _ = self.transmitter.send(Command::Shutdown);

        if let Some(handle) = self.thread.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

struct TimerThread {
    origin: Instant,
    receiver: Receiver<Command>,
    timers: BinaryHeap<TimerEntry>,
}

impl TimerThread {
    fn new(origin: Instant, receiver: Receiver<Command>) -> Self {
        Self {
            origin,
            receiver,
            timers: BinaryHeap::new(),
        }
    }

    fn run(&mut self) {
        tracing::debug!("timer thread started");

        loop {
            let timeout = self
                .timers
                .peek()
                .map(|entry| entry.deadline.saturating_sub(self.origin.elapsed()));

            let command = match timeout {
                Some(timeout) => match self.receiver.recv_timeout(timeout) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.receiver.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            match command {
                Some(Command::SetTimer {
                    deadline,
                    sequence,
                    task,
                    handle,
                }) => self.timers.push(TimerEntry {
                    deadline,
                    sequence,
                    task,
                    handle,
                }),
                Some(Command::Shutdown) => break,
                None => {}
            }

            self.fire_due();
        }

        tracing::debug!(pending = self.timers.len(), "timer thread stopped");
    }

    fn fire_due(&mut self) {
        let now = self.origin.elapsed();

        while let Some(entry) = self.timers.peek() {
            if entry.deadline > now {
                break;
            }

            let Some(entry) = self.timers.pop() else {
                break;
            };

            if panic::catch_unwind(AssertUnwindSafe(|| entry.fire())).is_err() {
                tracing::error!("timer callback panicked");
            }
        }
    }
}
