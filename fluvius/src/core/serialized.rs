use super::{Signal, Subscriber};
use crate::error::FluxError;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Serializes signals coming from several threads into one subscriber.
///
/// Used where signals for the same subscriber can originate from more than
/// one thread (a timer and the upstream, for instance). The first thread to
/// enqueue a signal becomes the drainer and delivers the queue in order;
/// other threads only enqueue. Everything after the first terminal signal
/// is discarded.
pub(crate) struct SerializedSubscriber<T> {
    downstream: Arc<dyn Subscriber<T>>,
    inner: Mutex<Queue<T>>,
}

struct Queue<T> {
    signals: VecDeque<Signal<T>>,
    draining: bool,
    terminated: bool,
}

impl<T> SerializedSubscriber<T> {
    pub(crate) fn new(downstream: Arc<dyn Subscriber<T>>) -> Self {
        Self {
            downstream,
            inner: Mutex::new(Queue {
                signals: VecDeque::new(),
                draining: false,
                terminated: false,
            }),
        }
    }

    pub(crate) fn downstream(&self) -> &Arc<dyn Subscriber<T>> {
        &self.downstream
    }

    pub(crate) fn next(&self, item: T) {
        self.emit(Signal::Next(item));
    }

    pub(crate) fn error(&self, error: FluxError) {
        self.emit(Signal::Error(error));
    }

    pub(crate) fn complete(&self) {
        self.emit(Signal::Complete);
    }

    pub(crate) fn emit(&self, signal: Signal<T>) {
        {
            let mut queue = self.inner.lock();

            if queue.terminated {
                return;
            }

            queue.terminated = signal.is_terminal();
            queue.signals.push_back(signal);

            if queue.draining {
                return;
            }

            queue.draining = true;
        }

        loop {
            let signal = {
                let mut queue = self.inner.lock();

                match queue.signals.pop_front() {
                    Some(signal) => signal,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };

            signal.deliver(self.downstream.as_ref());
        }
    }
}
