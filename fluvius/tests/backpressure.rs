use fluvius::scheduler::SchedulerBuilder;
use fluvius::testing::TestSubscriber;
use fluvius::time::VirtualClock;
use fluvius::{Flux, FluxError, Publisher, Subscriber, Subscription, UNBOUNDED};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// Endless source recording every request it receives.
struct DemandProbe {
    requests: Arc<Mutex<Vec<u64>>>,
}

struct DemandProbeSubscription {
    requests: Arc<Mutex<Vec<u64>>>,
    downstream: Arc<dyn Subscriber<i64>>,
    next: AtomicI64,
    cancelled: AtomicBool,
}

impl Publisher<i64> for DemandProbe {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<i64>>) {
        let subscription = Arc::new(DemandProbeSubscription {
            requests: self.requests.clone(),
            downstream: subscriber.clone(),
            next: AtomicI64::new(0),
            cancelled: AtomicBool::new(false),
        });

        subscriber.on_subscribe(subscription);
    }
}

impl Subscription for DemandProbeSubscription {
    fn request(&self, n: u64) {
        self.requests.lock().unwrap().push(n);

        for _ in 0..n.min(1_000) {
            if self.cancelled.load(Ordering::SeqCst) {
                return;
            }

            let item = self.next.fetch_add(1, Ordering::SeqCst);
            self.downstream.on_next(item);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

fn demand_probe() -> (Flux<i64>, Arc<Mutex<Vec<u64>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));

    let flux = Flux::from_publisher(DemandProbe {
        requests: requests.clone(),
    });

    (flux, requests)
}

#[test]
fn test_bounded_demand_is_honoured() {
    let probe = TestSubscriber::<i64>::with_demand(2);

    Flux::range(1, 10).subscribe(probe.clone());
    assert_eq!(probe.values(), vec![1, 2]);

    probe.request(3);
    assert_eq!(probe.values(), vec![1, 2, 3, 4, 5]);
    assert!(!probe.is_complete());
    assert!(probe.violations().is_empty());
}

#[test]
fn test_zero_request_is_an_error() {
    let direct = TestSubscriber::<i64>::with_demand(0);
    Flux::range(1, 5).subscribe(direct.clone());
    direct.request(0);

    assert_eq!(direct.error(), Some(FluxError::InvalidDemand(0)));
    assert!(direct.values().is_empty());

    let mapped = TestSubscriber::<i64>::with_demand(0);
    Flux::range(1, 5).map(|n| n + 1).subscribe(mapped.clone());
    mapped.request(0);

    assert_eq!(mapped.error(), Some(FluxError::InvalidDemand(0)));
}

#[test]
fn test_cancel_after_partial_demand() {
    let probe = TestSubscriber::<i64>::with_demand(3);

    Flux::range(1, 10).map(|n| n * 2).subscribe(probe.clone());
    assert_eq!(probe.values(), vec![2, 4, 6]);

    probe.cancel();
    probe.request(10);

    assert_eq!(probe.values(), vec![2, 4, 6]);
    assert!(!probe.is_terminated());
}

#[test]
fn test_requests_saturate() {
    let probe = TestSubscriber::<i64>::with_demand(UNBOUNDED - 1);

    Flux::range(1, 5).subscribe(probe.clone());
    probe.request(10);

    assert_eq!(probe.values(), vec![1, 2, 3, 4, 5]);
    assert!(probe.is_complete());
}

#[test]
fn test_take_caps_upstream_demand() {
    let (flux, requests) = demand_probe();
    let probe = TestSubscriber::<i64>::new();

    flux.take(3).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![0, 1, 2]);
    assert!(probe.is_complete());
    assert_eq!(*requests.lock().unwrap(), vec![3]);
}

#[test]
fn test_buffer_scales_upstream_demand() {
    let (flux, requests) = demand_probe();
    let probe = TestSubscriber::<Vec<i64>>::with_demand(2);

    flux.buffer(3).subscribe(probe.clone());

    assert_eq!(probe.values(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    assert_eq!(*requests.lock().unwrap(), vec![6]);
}

#[test]
fn test_parallel_pipeline_respects_demand() {
    let upstream = SchedulerBuilder::new().worker_threads(2).name("up").build();
    let downstream = SchedulerBuilder::new().worker_threads(2).name("down").build();

    let probe = TestSubscriber::<i64>::with_demand(10);

    Flux::range(1, 100)
        .subscribe_on(upstream)
        .map(|n| n * 3)
        .publish_on(downstream)
        .subscribe(probe.clone());

    assert!(probe.await_count(10, WAIT));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(probe.value_count(), 10);

    probe.request(90);
    assert!(probe.await_terminal(WAIT));

    assert_eq!(probe.values(), (1..=100).map(|n| n * 3).collect::<Vec<_>>());
    assert!(probe.violations().is_empty());
}

#[test]
fn test_dispose_stops_interval() {
    let clock = VirtualClock::new();
    let ticks = Arc::new(Mutex::new(Vec::new()));

    let sink = ticks.clone();
    let disposable = Flux::interval(Duration::from_secs(1), clock.clone())
        .subscribe_with(move |tick| sink.lock().unwrap().push(tick));

    clock.advance_by(Duration::from_secs(2));
    assert_eq!(*ticks.lock().unwrap(), vec![0, 1]);
    assert!(!disposable.is_disposed());

    disposable.dispose();
    assert!(disposable.is_disposed());

    clock.advance_by(Duration::from_secs(5));
    assert_eq!(*ticks.lock().unwrap(), vec![0, 1]);
    assert_eq!(clock.pending(), 0);
}

#[test]
fn test_subscribe_all_callbacks() {
    let sum = Arc::new(AtomicI64::new(0));
    let completions = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));

    let (total, done, failed) = (sum.clone(), completions.clone(), errors.clone());

    let disposable = Flux::range(1, 4).subscribe_all(
        move |n| {
            total.fetch_add(n, Ordering::SeqCst);
        },
        move |_| {
            failed.fetch_add(1, Ordering::SeqCst);
        },
        move || {
            done.fetch_add(1, Ordering::SeqCst);
        },
    );

    assert_eq!(sum.load(Ordering::SeqCst), 10);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert!(disposable.is_disposed());
}

#[test]
fn test_panicking_callback_cancels_and_reports() {
    let seen = Arc::new(AtomicUsize::new(0));
    let failure = Arc::new(Mutex::new(None));

    let (counter, sink) = (seen.clone(), failure.clone());

    Flux::range(1, 10).subscribe_all(
        move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(n < 3, "callback gave up");
        },
        move |error| *sink.lock().unwrap() = Some(error),
        || {},
    );

    assert_eq!(seen.load(Ordering::SeqCst), 3);
    assert_eq!(
        *failure.lock().unwrap(),
        Some(FluxError::operator("subscribe", "callback gave up"))
    );
}

#[test]
fn test_block_last_times_out() {
    let clock = VirtualClock::new();

    let result = Flux::interval(Duration::from_secs(1), clock.clone())
        .block_last(Duration::from_millis(50));

    assert_eq!(result, Err(FluxError::Timeout(Duration::from_millis(50))));

    clock.advance_by(Duration::from_secs(2));
    assert_eq!(clock.pending(), 0);
}

#[test]
fn test_block_last_returns_last_element() {
    assert_eq!(Flux::range(1, 4).block_last(WAIT), Ok(Some(4)));
    assert_eq!(Flux::<i64>::empty().block_last(WAIT), Ok(None));
}
