use fluvius::scheduler::{
    BOUNDED_PARALLEL, IMMEDIATE, ImmediateScheduler, Scheduler, SchedulerBuilder,
    SchedulerRegistry,
};
use fluvius::testing::TestSubscriber;
use fluvius::{Flux, FluxError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_builder_configuration() {
    let scheduler = SchedulerBuilder::new()
        .worker_threads(3)
        .name("custom")
        .build();

    assert_eq!(scheduler.worker_threads(), 3);
    assert_eq!(scheduler.name(), "custom");
    assert!(!scheduler.is_shutdown());
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_builder_rejects_zero_workers() {
    let _ = SchedulerBuilder::new().worker_threads(0);
}

#[test]
fn test_runs_every_work_item() {
    let scheduler = SchedulerBuilder::new().worker_threads(4).build();
    let (tx, rx) = mpsc::channel();

    for i in 0..100 {
        let tx = tx.clone();
        scheduler
            .schedule(Box::new(move || {
                let _ = tx.send(i);
            }))
            .expect("scheduler is running");
    }

    let mut seen: Vec<i32> = (0..100)
        .map(|_| rx.recv_timeout(WAIT).expect("work item ran"))
        .collect();
    seen.sort();

    assert_eq!(seen, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_worker_survives_panicking_work() {
    let scheduler = SchedulerBuilder::new().worker_threads(1).build();
    let (tx, rx) = mpsc::channel();

    scheduler
        .schedule(Box::new(|| panic!("work item failed")))
        .expect("scheduler is running");

    scheduler
        .schedule(Box::new(move || {
            let _ = tx.send("still alive");
        }))
        .expect("scheduler is running");

    assert_eq!(rx.recv_timeout(WAIT), Ok("still alive"));
}

#[test]
fn test_shutdown_rejects_work() {
    let scheduler = SchedulerBuilder::new()
        .worker_threads(1)
        .name("closing")
        .build();

    scheduler.shutdown();
    scheduler.shutdown();

    assert!(scheduler.is_shutdown());
    assert_eq!(
        scheduler.schedule(Box::new(|| {})),
        Err(FluxError::SchedulerShutdown("closing".to_owned()))
    );
}

#[test]
fn test_nested_scheduling_from_a_worker() {
    let scheduler = SchedulerBuilder::new().worker_threads(2).build();
    let (tx, rx) = mpsc::channel();

    let inner = scheduler.clone();
    scheduler
        .schedule(Box::new(move || {
            let on_worker = inner.is_current();
            let nested = inner.schedule(Box::new(move || {
                let _ = tx.send(on_worker);
            }));
            assert!(nested.is_ok());
        }))
        .expect("scheduler is running");

    assert_eq!(rx.recv_timeout(WAIT), Ok(true));
    assert!(!scheduler.is_current());
}

#[test]
fn test_immediate_runs_inline() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();

    let scheduler = ImmediateScheduler;
    assert!(scheduler.is_current());
    assert_eq!(scheduler.name(), IMMEDIATE);

    scheduler
        .schedule(Box::new(move || flag.store(true, Ordering::SeqCst)))
        .expect("immediate never rejects work");

    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_registry_defaults() {
    let registry = SchedulerRegistry::with_defaults(2);

    assert_eq!(registry.names(), vec![BOUNDED_PARALLEL, IMMEDIATE]);
    assert!(registry.get("missing").is_none());

    let parallel = registry.get(BOUNDED_PARALLEL).expect("registered");
    assert_eq!(parallel.name(), BOUNDED_PARALLEL);
}

#[test]
fn test_registry_register_custom() {
    let registry = SchedulerRegistry::new();
    assert_eq!(registry.names(), vec![IMMEDIATE]);

    let custom = SchedulerBuilder::new().worker_threads(1).name("io").build();
    assert!(registry.register("io", custom).is_none());

    let replaced = registry.register("io", Arc::new(ImmediateScheduler));
    assert!(replaced.is_some_and(|previous| previous.name() == "io"));
    assert_eq!(registry.get("io").map(|found| found.name().to_owned()), Some(IMMEDIATE.to_owned()));
}

#[test]
fn test_subscribe_on_shut_down_scheduler() {
    let scheduler = SchedulerBuilder::new()
        .worker_threads(1)
        .name("gone")
        .build();
    scheduler.shutdown();

    let probe = TestSubscriber::<i64>::new();
    Flux::range(1, 3).subscribe_on(scheduler).subscribe(probe.clone());

    assert_eq!(
        probe.error(),
        Some(FluxError::SchedulerShutdown("gone".to_owned()))
    );
    assert!(probe.values().is_empty());
}

#[test]
fn test_publish_on_immediate_is_synchronous() {
    let probe = TestSubscriber::<i64>::new();

    Flux::range(1, 3)
        .publish_on(Arc::new(ImmediateScheduler))
        .subscribe(probe.clone());

    assert_eq!(probe.values(), vec![1, 2, 3]);
    assert!(probe.is_complete());
}
